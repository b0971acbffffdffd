//! Cache store capability
//!
//! Keyed storage of request -> response snapshots, grouped into named
//! cache generations. The controller only ever uses the operations on
//! [`CacheStorage`]; how entries are laid out is up to the backend.
//!
//! | Backend | Use |
//! |---------|-----|
//! | [`MemoryCacheStorage`] | tests, embedding |
//! | [`DiskCacheStorage`] | CLI, one directory per generation |

pub mod disk;
pub mod memory;

pub use disk::DiskCacheStorage;
pub use memory::MemoryCacheStorage;

use crate::error::{PrecacheError, PrecacheResult};
use crate::http::{RequestKey, Response};
use async_trait::async_trait;

/// Abstract cache store shared by every controller generation
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Open a generation, creating it if absent
    async fn open(&self, generation: &str) -> PrecacheResult<()>;

    /// Names of all existing generations
    async fn keys(&self) -> PrecacheResult<Vec<String>>;

    /// Whether a generation exists
    async fn has(&self, generation: &str) -> PrecacheResult<bool>;

    /// Delete a generation and all its entries. Returns false if it did not exist.
    async fn delete(&self, generation: &str) -> PrecacheResult<bool>;

    /// Look up the exact request in a generation
    async fn match_request(
        &self,
        generation: &str,
        key: &RequestKey,
    ) -> PrecacheResult<Option<Response>>;

    /// Store a response, replacing any previous entry for the key
    async fn put(
        &self,
        generation: &str,
        key: &RequestKey,
        response: &Response,
    ) -> PrecacheResult<()>;

    /// Keys stored in a generation
    async fn entries(&self, generation: &str) -> PrecacheResult<Vec<RequestKey>>;
}

/// Reject generation names that could escape a storage root
pub fn validate_generation(name: &str) -> PrecacheResult<()> {
    if name.is_empty()
        || name == "."
        || name.contains("..")
        || name.contains('/')
        || name.contains('\\')
    {
        return Err(PrecacheError::InvalidGeneration(name.to_string()));
    }
    Ok(())
}
