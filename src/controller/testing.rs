//! Test doubles for the network and cache store capabilities

use super::offline::ControllerOptions;
use super::policy::{ExclusionRule, FetchStrategy};
use crate::config::schema::PushConfig;
use crate::error::{PrecacheError, PrecacheResult};
use crate::http::{Request, RequestKey, Response};
use crate::network::Network;
use crate::storage::{CacheStorage, MemoryCacheStorage};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

pub fn test_options(generation: &str, manifest: &[&str]) -> ControllerOptions {
    ControllerOptions {
        generation: generation.to_string(),
        manifest: manifest.iter().map(|s| s.to_string()).collect(),
        exclusion: ExclusionRule::default(),
        strategy: FetchStrategy::NetworkFirst,
        offline_shell: "/index.html".to_string(),
        skip_waiting: true,
        push: PushConfig::default(),
    }
}

/// Scripted origin. Unknown paths answer 404; offline mode fails every request.
#[derive(Clone, Default)]
pub struct FakeNetwork {
    routes: Arc<Mutex<HashMap<String, Response>>>,
    offline: Arc<AtomicBool>,
    calls: Arc<AtomicUsize>,
}

impl FakeNetwork {
    /// Serve each path with status 200 and body "body of <path>"
    pub fn serving(paths: &[&str]) -> Self {
        let net = Self::default();
        for path in paths {
            net.set_body(path, &format!("body of {}", path));
        }
        net
    }

    pub fn with_status(self, path: &str, status: u16) -> Self {
        self.routes
            .lock()
            .unwrap()
            .insert(path.to_string(), Response::new(status, "error"));
        self
    }

    pub fn set_body(&self, path: &str, body: &str) {
        self.routes
            .lock()
            .unwrap()
            .insert(path.to_string(), Response::ok(body.as_bytes().to_vec()));
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Network for FakeNetwork {
    async fn fetch(&self, request: &Request) -> PrecacheResult<Response> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(PrecacheError::network(&request.url, "offline"));
        }
        let routes = self.routes.lock().unwrap();
        Ok(routes
            .get(request.path())
            .cloned()
            .unwrap_or_else(|| Response::new(404, "not found")))
    }
}

/// Memory store that counts lookups and writes
#[derive(Clone, Default)]
pub struct SpyStorage {
    inner: MemoryCacheStorage,
    matches: Arc<AtomicUsize>,
    puts: Arc<AtomicUsize>,
}

impl SpyStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// (lookups, writes) so far
    pub fn counts(&self) -> (usize, usize) {
        (
            self.matches.load(Ordering::SeqCst),
            self.puts.load(Ordering::SeqCst),
        )
    }
}

#[async_trait]
impl CacheStorage for SpyStorage {
    async fn open(&self, generation: &str) -> PrecacheResult<()> {
        self.inner.open(generation).await
    }

    async fn keys(&self) -> PrecacheResult<Vec<String>> {
        self.inner.keys().await
    }

    async fn has(&self, generation: &str) -> PrecacheResult<bool> {
        self.inner.has(generation).await
    }

    async fn delete(&self, generation: &str) -> PrecacheResult<bool> {
        self.inner.delete(generation).await
    }

    async fn match_request(
        &self,
        generation: &str,
        key: &RequestKey,
    ) -> PrecacheResult<Option<Response>> {
        self.matches.fetch_add(1, Ordering::SeqCst);
        self.inner.match_request(generation, key).await
    }

    async fn put(
        &self,
        generation: &str,
        key: &RequestKey,
        response: &Response,
    ) -> PrecacheResult<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.inner.put(generation, key, response).await
    }

    async fn entries(&self, generation: &str) -> PrecacheResult<Vec<RequestKey>> {
        self.inner.entries(generation).await
    }
}

/// Memory store whose writes block until `open_gate` is called
#[derive(Clone)]
pub struct GatedStorage {
    inner: MemoryCacheStorage,
    gate: Arc<Semaphore>,
    completed: Arc<AtomicUsize>,
}

impl GatedStorage {
    pub fn new() -> Self {
        Self {
            inner: MemoryCacheStorage::new(),
            gate: Arc::new(Semaphore::new(0)),
            completed: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn open_gate(&self) {
        self.gate.add_permits(Semaphore::MAX_PERMITS / 2);
    }

    pub fn completed_puts(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CacheStorage for GatedStorage {
    async fn open(&self, generation: &str) -> PrecacheResult<()> {
        self.inner.open(generation).await
    }

    async fn keys(&self) -> PrecacheResult<Vec<String>> {
        self.inner.keys().await
    }

    async fn has(&self, generation: &str) -> PrecacheResult<bool> {
        self.inner.has(generation).await
    }

    async fn delete(&self, generation: &str) -> PrecacheResult<bool> {
        self.inner.delete(generation).await
    }

    async fn match_request(
        &self,
        generation: &str,
        key: &RequestKey,
    ) -> PrecacheResult<Option<Response>> {
        self.inner.match_request(generation, key).await
    }

    async fn put(
        &self,
        generation: &str,
        key: &RequestKey,
        response: &Response,
    ) -> PrecacheResult<()> {
        let _permit = self
            .gate
            .acquire()
            .await
            .map_err(|e| PrecacheError::Internal(e.to_string()))?;
        let result = self.inner.put(generation, key, response).await;
        self.completed.fetch_add(1, Ordering::SeqCst);
        result
    }

    async fn entries(&self, generation: &str) -> PrecacheResult<Vec<RequestKey>> {
        self.inner.entries(generation).await
    }
}

/// Memory store that still lists generations another process already removed
#[derive(Clone, Default)]
pub struct StaleListingStorage {
    inner: MemoryCacheStorage,
    vanished: Vec<String>,
}

impl StaleListingStorage {
    pub fn new(inner: MemoryCacheStorage, vanished: &[&str]) -> Self {
        Self {
            inner,
            vanished: vanished.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[async_trait]
impl CacheStorage for StaleListingStorage {
    async fn open(&self, generation: &str) -> PrecacheResult<()> {
        self.inner.open(generation).await
    }

    async fn keys(&self) -> PrecacheResult<Vec<String>> {
        let mut names = self.inner.keys().await?;
        names.extend(self.vanished.iter().cloned());
        Ok(names)
    }

    async fn has(&self, generation: &str) -> PrecacheResult<bool> {
        self.inner.has(generation).await
    }

    async fn delete(&self, generation: &str) -> PrecacheResult<bool> {
        self.inner.delete(generation).await
    }

    async fn match_request(
        &self,
        generation: &str,
        key: &RequestKey,
    ) -> PrecacheResult<Option<Response>> {
        self.inner.match_request(generation, key).await
    }

    async fn put(
        &self,
        generation: &str,
        key: &RequestKey,
        response: &Response,
    ) -> PrecacheResult<()> {
        self.inner.put(generation, key, response).await
    }

    async fn entries(&self, generation: &str) -> PrecacheResult<Vec<RequestKey>> {
        self.inner.entries(generation).await
    }
}
