//! Offline cache controller
//!
//! Owns one cache generation and mediates every request for its scope.
//! The host drives it through `install`, `activate` and `make_redundant`;
//! once activated it answers `handle_fetch`.

use super::policy::{self, ExclusionRule, FetchStrategy, Route};
use super::push::{self, Notification};
use super::state::ControllerState;
use super::writer::CacheWriter;
use crate::audit::AuditLog;
use crate::config::schema::{Config, PushConfig};
use crate::error::{PrecacheError, PrecacheResult};
use crate::http::{Request, RequestKey, Response};
use crate::network::Network;
use crate::storage::CacheStorage;
use futures_util::future::join_all;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Everything a controller instance needs to know about its generation
#[derive(Debug, Clone)]
pub struct ControllerOptions {
    pub generation: String,
    pub manifest: Vec<String>,
    pub exclusion: ExclusionRule,
    pub strategy: FetchStrategy,
    pub offline_shell: String,
    pub skip_waiting: bool,
    pub push: PushConfig,
}

impl ControllerOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            generation: config.controller.generation.clone(),
            manifest: config.manifest.assets.clone(),
            exclusion: config.controller.exclusion_rule(),
            strategy: config.controller.strategy,
            offline_shell: config.controller.offline_shell.clone(),
            skip_waiting: config.controller.skip_waiting,
            push: config.push.clone(),
        }
    }
}

/// Where a fetch response came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResponseSource {
    /// Live network response
    Network,
    /// Exact match from the current generation
    Cache,
    /// Offline shell document standing in for a failed navigation
    OfflineShell,
    /// Excluded or non-cacheable request sent straight to the network
    Passthrough,
}

impl fmt::Display for ResponseSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Network => "network",
            Self::Cache => "cache",
            Self::OfflineShell => "offline-shell",
            Self::Passthrough => "passthrough",
        };
        write!(f, "{}", name)
    }
}

/// Result of an intercepted fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutcome {
    pub response: Response,
    pub source: ResponseSource,
}

/// Result of the install phase
#[derive(Debug, Clone, Default, Serialize)]
pub struct InstallReport {
    pub generation: String,
    /// Manifest paths now present in the generation
    pub stored: Vec<String>,
    /// Manifest paths that could not be stored, with the reason
    pub failed: Vec<(String, String)>,
    /// Controller asks to activate without waiting
    pub skip_waiting: bool,
}

impl InstallReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Result of the activate phase
#[derive(Debug, Clone, Default, Serialize)]
pub struct ActivateReport {
    pub generation: String,
    /// Stale generations removed
    pub deleted: Vec<String>,
    /// Controller took over already-open clients
    pub claimed: bool,
}

/// Controller for one cache generation
pub struct OfflineCacheController {
    id: Uuid,
    options: ControllerOptions,
    storage: Arc<dyn CacheStorage>,
    network: Arc<dyn Network>,
    writer: CacheWriter,
    audit: AuditLog,
    state: RwLock<ControllerState>,
}

impl OfflineCacheController {
    /// Create a controller in the `installing` state.
    ///
    /// Spawns the background cache writer, so this must run inside a
    /// tokio runtime.
    pub fn new(
        options: ControllerOptions,
        storage: Arc<dyn CacheStorage>,
        network: Arc<dyn Network>,
        audit: AuditLog,
    ) -> Self {
        Self::with_state(options, storage, network, audit, ControllerState::Installing)
    }

    /// Recreate a controller that was already activated in an earlier run
    pub fn restore_activated(
        options: ControllerOptions,
        storage: Arc<dyn CacheStorage>,
        network: Arc<dyn Network>,
        audit: AuditLog,
    ) -> Self {
        Self::with_state(options, storage, network, audit, ControllerState::Activated)
    }

    fn with_state(
        options: ControllerOptions,
        storage: Arc<dyn CacheStorage>,
        network: Arc<dyn Network>,
        audit: AuditLog,
        state: ControllerState,
    ) -> Self {
        let writer = CacheWriter::spawn(Arc::clone(&storage));
        Self {
            id: Uuid::new_v4(),
            options,
            storage,
            network,
            writer,
            audit,
            state: RwLock::new(state),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn generation(&self) -> &str {
        &self.options.generation
    }

    pub fn options(&self) -> &ControllerOptions {
        &self.options
    }

    pub async fn state(&self) -> ControllerState {
        *self.state.read().await
    }

    pub fn writer(&self) -> &CacheWriter {
        &self.writer
    }

    async fn transition(&self, next: ControllerState) -> PrecacheResult<()> {
        let mut state = self.state.write().await;
        if !state.can_transition_to(next) {
            return Err(PrecacheError::InvalidTransition { from: *state, to: next });
        }
        debug!("Controller {} {} -> {}", self.options.generation, *state, next);
        *state = next;
        Ok(())
    }

    /// Install phase: open the generation and warm it with the manifest.
    ///
    /// Individual asset failures (and even a failure to open the
    /// generation) are logged and reported, never returned as errors.
    pub async fn install(&self) -> PrecacheResult<InstallReport> {
        let generation = self.options.generation.clone();
        info!("Installing controller for {}", generation);

        let mut report = InstallReport {
            generation: generation.clone(),
            skip_waiting: self.options.skip_waiting,
            ..Default::default()
        };

        // Guard against a second install before doing any I/O
        let current = self.state().await;
        if current != ControllerState::Installing {
            return Err(PrecacheError::InvalidTransition {
                from: current,
                to: ControllerState::Installed,
            });
        }

        match self.storage.open(&generation).await {
            Ok(()) => {
                for path in &self.options.manifest {
                    match self.precache_asset(path).await {
                        Ok(()) => report.stored.push(path.clone()),
                        Err(reason) => {
                            warn!("Failed to precache {}: {}", path, reason);
                            report.failed.push((path.clone(), reason));
                        }
                    }
                }
            }
            Err(e) => {
                warn!("Failed to open cache {}: {}", generation, e);
                report.failed = self
                    .options
                    .manifest
                    .iter()
                    .map(|path| (path.clone(), e.to_string()))
                    .collect();
            }
        }

        self.transition(ControllerState::Installed).await?;

        info!(
            "Installed {}: {} of {} assets cached",
            generation,
            report.stored.len(),
            self.options.manifest.len()
        );
        self.audit
            .log(
                "controller.installed",
                &serde_json::json!({
                    "id": self.id.to_string(),
                    "generation": generation,
                    "stored": report.stored.len(),
                    "failed": report.failed.len(),
                }),
            )
            .await;

        Ok(report)
    }

    async fn precache_asset(&self, path: &str) -> Result<(), String> {
        let request = Request::get(path);
        let response = self
            .network
            .fetch(&request)
            .await
            .map_err(|e| e.to_string())?;

        if !policy::is_cacheable(&request, &response) {
            return Err(format!("status {}", response.status));
        }

        self.storage
            .put(&self.options.generation, &request.key(), &response)
            .await
            .map_err(|e| e.to_string())
    }

    /// Activate phase: delete every other generation, then claim clients
    pub async fn activate(&self) -> PrecacheResult<ActivateReport> {
        self.transition(ControllerState::Activating).await?;
        let generation = self.options.generation.clone();
        info!("Activating controller for {}", generation);

        let names = match self.storage.keys().await {
            Ok(names) => names,
            Err(e) => {
                warn!("Failed to list cache generations: {}", e);
                vec![]
            }
        };
        let stale = policy::generations_to_delete(&names, &generation);

        let results = join_all(stale.iter().map(|name| async move {
            info!("Deleting old cache: {}", name);
            (name, self.storage.delete(name).await)
        }))
        .await;

        let mut deleted = vec![];
        for (name, result) in results {
            match result {
                Ok(true) => {
                    self.audit
                        .log(
                            "generation.deleted",
                            &serde_json::json!({ "generation": name, "replaced_by": generation }),
                        )
                        .await;
                    deleted.push(name.clone());
                }
                Ok(false) => debug!("Cache {} already gone", name),
                Err(e) => warn!("Failed to delete cache {}: {}", name, e),
            }
        }

        self.transition(ControllerState::Activated).await?;
        self.audit
            .log(
                "controller.activated",
                &serde_json::json!({
                    "id": self.id.to_string(),
                    "generation": generation,
                    "deleted": deleted,
                }),
            )
            .await;

        Ok(ActivateReport {
            generation,
            deleted,
            claimed: true,
        })
    }

    /// Retire this controller. It stops intercepting fetches.
    pub async fn make_redundant(&self) {
        let mut state = self.state.write().await;
        if !state.is_terminal() {
            debug!("Controller {} {} -> redundant", self.options.generation, *state);
            *state = ControllerState::Redundant;
        }
    }

    /// Handle one intercepted request
    pub async fn handle_fetch(&self, request: &Request) -> PrecacheResult<FetchOutcome> {
        let state = self.state().await;
        if !state.can_intercept_fetch() {
            return Err(PrecacheError::NotServing {
                generation: self.options.generation.clone(),
                state,
            });
        }

        match policy::route(request, &self.options.exclusion, self.options.strategy) {
            Route::Bypass => {
                debug!("Bypassing cache for {} {}", request.method, request.url);
                let response = self.network.fetch(request).await?;
                Ok(FetchOutcome {
                    response,
                    source: ResponseSource::Passthrough,
                })
            }
            Route::Strategy(FetchStrategy::NetworkFirst) => self.network_first(request).await,
            Route::Strategy(FetchStrategy::CacheFirst) => self.cache_first(request).await,
        }
    }

    async fn network_first(&self, request: &Request) -> PrecacheResult<FetchOutcome> {
        match self.network.fetch(request).await {
            Ok(response) => {
                self.store_in_background(request, &response);
                Ok(FetchOutcome {
                    response,
                    source: ResponseSource::Network,
                })
            }
            Err(e) => {
                debug!("Network failed for {}, trying cache: {}", request.url, e);
                if let Some(response) = self.lookup(&request.key()).await {
                    return Ok(FetchOutcome {
                        response,
                        source: ResponseSource::Cache,
                    });
                }
                self.offline_fallback(request).await
            }
        }
    }

    async fn cache_first(&self, request: &Request) -> PrecacheResult<FetchOutcome> {
        if let Some(response) = self.lookup(&request.key()).await {
            return Ok(FetchOutcome {
                response,
                source: ResponseSource::Cache,
            });
        }

        match self.network.fetch(request).await {
            Ok(response) => {
                self.store_in_background(request, &response);
                Ok(FetchOutcome {
                    response,
                    source: ResponseSource::Network,
                })
            }
            Err(e) => {
                debug!("Network failed for {}: {}", request.url, e);
                self.offline_fallback(request).await
            }
        }
    }

    /// Navigations fall back to the offline shell; everything else fails
    async fn offline_fallback(&self, request: &Request) -> PrecacheResult<FetchOutcome> {
        if request.is_navigation() {
            let shell = RequestKey::get(&self.options.offline_shell);
            if let Some(response) = self.lookup(&shell).await {
                debug!("Serving offline shell for {}", request.url);
                return Ok(FetchOutcome {
                    response,
                    source: ResponseSource::OfflineShell,
                });
            }
        }

        Err(PrecacheError::Offline {
            method: request.method.to_string(),
            url: request.url.clone(),
        })
    }

    /// Cache read; a store error counts as a miss
    async fn lookup(&self, key: &RequestKey) -> Option<Response> {
        match self
            .storage
            .match_request(&self.options.generation, key)
            .await
        {
            Ok(found) => found,
            Err(e) => {
                warn!("Cache lookup failed for {}: {}", key, e);
                None
            }
        }
    }

    fn store_in_background(&self, request: &Request, response: &Response) {
        if policy::is_cacheable(request, response) {
            self.writer
                .submit(&self.options.generation, request.key(), response.clone());
        }
    }

    /// Wait for queued background writes to land
    pub async fn flush_writes(&self) {
        self.writer.flush().await;
    }

    /// Push hook: build the notification to display
    pub fn on_push(&self, payload: Option<&[u8]>) -> Notification {
        push::notification_for(&self.options.push, payload)
    }
}

impl fmt::Debug for OfflineCacheController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OfflineCacheController")
            .field("id", &self.id)
            .field("generation", &self.options.generation)
            .field("strategy", &self.options.strategy)
            .finish()
    }
}
