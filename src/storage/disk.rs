//! On-disk cache store
//!
//! Layout under the root directory:
//!
//! ```text
//! <root>/<generation>/<sha256(key)[..16]>.json
//! ```
//!
//! Each entry file holds the request key and the response snapshot, with
//! the body hex encoded. Writes go to a temporary file first and are
//! renamed into place, so a reader never sees half an entry.

use super::{validate_generation, CacheStorage};
use crate::error::{PrecacheError, PrecacheResult};
use crate::http::{RequestKey, Response};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
struct StoredEntry {
    key: RequestKey,
    response: Response,
}

/// Cache store persisted as JSON files, one directory per generation
#[derive(Debug, Clone)]
pub struct DiskCacheStorage {
    root: PathBuf,
}

impl DiskCacheStorage {
    /// Create a store rooted at `root`. The directory is created lazily.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn generation_dir(&self, generation: &str) -> PrecacheResult<PathBuf> {
        validate_generation(generation)?;
        Ok(self.root.join(generation))
    }

    fn entry_path(&self, generation: &str, key: &RequestKey) -> PrecacheResult<PathBuf> {
        Ok(self
            .generation_dir(generation)?
            .join(format!("{}.json", entry_file_stem(key))))
    }

    async fn read_entry(path: &Path) -> Option<StoredEntry> {
        let content = fs::read_to_string(path).await.ok()?;
        match serde_json::from_str(&content) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping unreadable cache entry {}: {}", path.display(), e);
                None
            }
        }
    }
}

/// File stem for a key: first 16 hex chars of SHA-256 over "METHOD url"
fn entry_file_stem(key: &RequestKey) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.to_string().as_bytes());
    let digest = hasher.finalize();
    hex::encode(&digest[..8])
}

#[async_trait]
impl CacheStorage for DiskCacheStorage {
    async fn open(&self, generation: &str) -> PrecacheResult<()> {
        let dir = self.generation_dir(generation)?;
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| PrecacheError::io(format!("creating cache dir {}", dir.display()), e))?;
        Ok(())
    }

    async fn keys(&self) -> PrecacheResult<Vec<String>> {
        if !self.root.exists() {
            return Ok(vec![]);
        }

        let mut names = vec![];
        let mut entries = fs::read_dir(&self.root)
            .await
            .map_err(|e| PrecacheError::io("reading cache root", e))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| PrecacheError::io("reading cache root entry", e))?
        {
            let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
            if is_dir {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }

        names.sort();
        Ok(names)
    }

    async fn has(&self, generation: &str) -> PrecacheResult<bool> {
        Ok(self.generation_dir(generation)?.is_dir())
    }

    async fn delete(&self, generation: &str) -> PrecacheResult<bool> {
        let dir = self.generation_dir(generation)?;
        if !dir.exists() {
            return Ok(false);
        }
        fs::remove_dir_all(&dir)
            .await
            .map_err(|e| PrecacheError::io(format!("removing cache dir {}", dir.display()), e))?;
        debug!("Removed cache generation {}", generation);
        Ok(true)
    }

    async fn match_request(
        &self,
        generation: &str,
        key: &RequestKey,
    ) -> PrecacheResult<Option<Response>> {
        let path = self.entry_path(generation, key)?;
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path)
            .await
            .map_err(|e| PrecacheError::CacheRead {
                generation: generation.to_string(),
                reason: e.to_string(),
            })?;
        let entry: StoredEntry =
            serde_json::from_str(&content).map_err(|e| PrecacheError::CacheRead {
                generation: generation.to_string(),
                reason: e.to_string(),
            })?;

        // Hash collision guard
        if entry.key != *key {
            return Ok(None);
        }
        Ok(Some(entry.response))
    }

    async fn put(
        &self,
        generation: &str,
        key: &RequestKey,
        response: &Response,
    ) -> PrecacheResult<()> {
        let dir = self.generation_dir(generation)?;
        if !dir.is_dir() {
            return Err(PrecacheError::GenerationNotFound(generation.to_string()));
        }

        let path = self.entry_path(generation, key)?;
        let write_err = |reason: String| PrecacheError::CacheWrite {
            generation: generation.to_string(),
            key: key.to_string(),
            reason,
        };

        let content = serde_json::to_string(&StoredEntry {
            key: key.clone(),
            response: response.clone(),
        })?;

        let tmp = dir.join(format!(".{}.tmp", Uuid::new_v4()));
        fs::write(&tmp, content)
            .await
            .map_err(|e| write_err(e.to_string()))?;
        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(write_err(e.to_string()));
        }

        debug!("Stored {} in {}", key, generation);
        Ok(())
    }

    async fn entries(&self, generation: &str) -> PrecacheResult<Vec<RequestKey>> {
        let dir = self.generation_dir(generation)?;
        if !dir.is_dir() {
            return Err(PrecacheError::GenerationNotFound(generation.to_string()));
        }

        let mut keys = vec![];
        let mut entries = fs::read_dir(&dir)
            .await
            .map_err(|e| PrecacheError::io(format!("reading cache dir {}", dir.display()), e))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| PrecacheError::io("reading cache entry", e))?
        {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(stored) = Self::read_entry(&path).await {
                    keys.push(stored.key);
                }
            }
        }

        keys.sort();
        Ok(keys)
    }
}
