//! Offline cache controller
//!
//! Mediates every request for its scope and keeps exactly one live cache
//! generation.
//!
//! # Fetch handling
//!
//! | Request | Network ok | Network down |
//! |---------|------------|--------------|
//! | URL matches exclusion marker | live response, no caching | error |
//! | non-GET | live response, no caching | error |
//! | GET (network-first) | live response, 200 stored in background | cached entry, else offline shell for navigations, else error |
//!
//! # Lifecycle
//!
//! The host calls `install` (open generation, warm manifest), then
//! `activate` (delete every other generation, claim clients). Only an
//! activated controller answers fetches.

mod offline;
pub mod policy;
pub mod push;
pub mod state;
mod writer;

#[cfg(test)]
pub(crate) mod testing;

pub use offline::{
    ActivateReport, ControllerOptions, FetchOutcome, InstallReport, OfflineCacheController,
    ResponseSource,
};
pub use policy::{ExclusionRule, FetchStrategy, MatchMode, Route};
pub use push::Notification;
pub use state::ControllerState;
pub use writer::{CacheWriter, WriterStats};
