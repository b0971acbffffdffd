//! In-process cache store

use super::{validate_generation, CacheStorage};
use crate::error::{PrecacheError, PrecacheResult};
use crate::http::{RequestKey, Response};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

type Generation = HashMap<RequestKey, Response>;

/// Cache store held in memory. Clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryCacheStorage {
    generations: Arc<RwLock<BTreeMap<String, Generation>>>,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn open(&self, generation: &str) -> PrecacheResult<()> {
        validate_generation(generation)?;
        self.generations
            .write()
            .await
            .entry(generation.to_string())
            .or_default();
        Ok(())
    }

    async fn keys(&self) -> PrecacheResult<Vec<String>> {
        Ok(self.generations.read().await.keys().cloned().collect())
    }

    async fn has(&self, generation: &str) -> PrecacheResult<bool> {
        Ok(self.generations.read().await.contains_key(generation))
    }

    async fn delete(&self, generation: &str) -> PrecacheResult<bool> {
        Ok(self.generations.write().await.remove(generation).is_some())
    }

    async fn match_request(
        &self,
        generation: &str,
        key: &RequestKey,
    ) -> PrecacheResult<Option<Response>> {
        Ok(self
            .generations
            .read()
            .await
            .get(generation)
            .and_then(|entries| entries.get(key))
            .cloned())
    }

    async fn put(
        &self,
        generation: &str,
        key: &RequestKey,
        response: &Response,
    ) -> PrecacheResult<()> {
        let mut generations = self.generations.write().await;
        let entries = generations
            .get_mut(generation)
            .ok_or_else(|| PrecacheError::GenerationNotFound(generation.to_string()))?;
        entries.insert(key.clone(), response.clone());
        Ok(())
    }

    async fn entries(&self, generation: &str) -> PrecacheResult<Vec<RequestKey>> {
        let generations = self.generations.read().await;
        let entries = generations
            .get(generation)
            .ok_or_else(|| PrecacheError::GenerationNotFound(generation.to_string()))?;
        let mut keys: Vec<RequestKey> = entries.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}
