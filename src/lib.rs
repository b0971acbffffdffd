//! Precache - Offline cache controller
//!
//! Keeps a versioned snapshot of a site's assets, serves requests
//! network-first with a cache fallback, and moves open pages onto new
//! versions as they are deployed.

pub mod audit;
pub mod cli;
pub mod config;
pub mod controller;
pub mod error;
pub mod http;
pub mod network;
pub mod notifier;
pub mod registration;
pub mod storage;
pub mod ui;

pub use error::{PrecacheError, PrecacheResult};
