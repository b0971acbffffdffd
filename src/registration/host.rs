//! Registration host
//!
//! Plays the runtime's part for one scope: checks the deployed script for
//! a new generation, walks the new controller through install and
//! activate, retires the old one and tells pages about every step.

use super::record::RegistrationRecord;
use super::source::ScriptSource;
use crate::audit::AuditLog;
use crate::controller::{
    ActivateReport, ControllerState, FetchOutcome, InstallReport, OfflineCacheController,
    ResponseSource,
};
use crate::error::{PrecacheError, PrecacheResult};
use crate::http::Request;
use crate::network::Network;
use crate::notifier::WorkerContainer;
use crate::storage::CacheStorage;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{debug, info};

const EVENT_CAPACITY: usize = 64;

/// Lifecycle events observed by pages in scope
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// A new controller started installing
    UpdateFound {
        generation: String,
        /// Whether another controller was already active at that moment
        had_controller: bool,
    },
    /// A controller moved to a new lifecycle state
    StateChanged {
        generation: String,
        state: ControllerState,
    },
    /// A different controller now handles this scope's requests
    ControllerChanged { generation: String },
}

/// Outcome of an update check
#[derive(Debug, Clone)]
pub enum UpdateOutcome {
    /// Deployed generation is already active (or waiting)
    Unchanged { generation: String },
    /// New controller installed and activated
    Activated {
        install: InstallReport,
        activate: ActivateReport,
    },
    /// New controller installed, waiting for the active one to go
    Waiting { install: InstallReport },
}

/// Host runtime for a single scope
pub struct Registration {
    scope: String,
    script_url: String,
    source: Arc<dyn ScriptSource>,
    storage: Arc<dyn CacheStorage>,
    network: Arc<dyn Network>,
    audit: AuditLog,
    active: RwLock<Option<Arc<OfflineCacheController>>>,
    waiting: RwLock<Option<Arc<OfflineCacheController>>>,
    update_lock: Mutex<()>,
    events: broadcast::Sender<LifecycleEvent>,
}

impl Registration {
    pub fn new(
        scope: impl Into<String>,
        script_url: impl Into<String>,
        source: Arc<dyn ScriptSource>,
        storage: Arc<dyn CacheStorage>,
        network: Arc<dyn Network>,
        audit: AuditLog,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            scope: scope.into(),
            script_url: script_url.into(),
            source,
            storage,
            network,
            audit,
            active: RwLock::new(None),
            waiting: RwLock::new(None),
            update_lock: Mutex::new(()),
            events,
        }
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn script_url(&self) -> &str {
        &self.script_url
    }

    /// The controller currently serving the scope
    pub async fn active(&self) -> Option<Arc<OfflineCacheController>> {
        self.active.read().await.clone()
    }

    /// An installed controller held back from activating
    pub async fn waiting(&self) -> Option<Arc<OfflineCacheController>> {
        self.waiting.read().await.clone()
    }

    pub fn events(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: LifecycleEvent) {
        debug!("Lifecycle event: {:?}", event);
        // No receivers is fine: no page is listening
        let _ = self.events.send(event);
    }

    fn emit_state(&self, generation: &str, state: ControllerState) {
        self.emit(LifecycleEvent::StateChanged {
            generation: generation.to_string(),
            state,
        });
    }

    fn validate(&self) -> PrecacheResult<()> {
        let fail = |reason: &str| PrecacheError::RegistrationFailed {
            script_url: self.script_url.clone(),
            reason: reason.to_string(),
        };
        if !self.script_url.starts_with('/') {
            return Err(fail("script URL must be root-relative"));
        }
        if !self.scope.starts_with('/') {
            return Err(fail("scope must be root-relative"));
        }
        Ok(())
    }

    /// Check the deployed script and, if its generation differs from the
    /// active one, install (and normally activate) a new controller
    pub async fn update(&self) -> PrecacheResult<UpdateOutcome> {
        let _guard = self.update_lock.lock().await;
        let options = self.source.fetch_script().await?;
        let generation = options.generation.clone();

        let current = self.active().await;
        let waiting = self.waiting().await;
        let known = current
            .iter()
            .chain(waiting.iter())
            .any(|c| c.generation() == generation);
        if known {
            debug!("Generation {} unchanged", generation);
            return Ok(UpdateOutcome::Unchanged { generation });
        }

        info!("Update found: {}", generation);
        let controller = Arc::new(OfflineCacheController::new(
            options,
            Arc::clone(&self.storage),
            Arc::clone(&self.network),
            self.audit.clone(),
        ));

        self.emit(LifecycleEvent::UpdateFound {
            generation: generation.clone(),
            had_controller: current.is_some(),
        });
        self.emit_state(&generation, ControllerState::Installing);

        let install = match controller.install().await {
            Ok(report) => report,
            Err(e) => {
                controller.make_redundant().await;
                self.emit_state(&generation, ControllerState::Redundant);
                return Err(e);
            }
        };
        self.emit_state(&generation, ControllerState::Installed);

        if install.skip_waiting || current.is_none() {
            let activate = self.promote(controller).await?;
            Ok(UpdateOutcome::Activated { install, activate })
        } else {
            info!("Controller {} waiting", generation);
            let previous = self.waiting.write().await.replace(controller);
            if let Some(previous) = previous {
                previous.make_redundant().await;
                self.emit_state(previous.generation(), ControllerState::Redundant);
            }
            Ok(UpdateOutcome::Waiting { install })
        }
    }

    /// Activate the waiting controller, if any
    pub async fn skip_waiting(&self) -> PrecacheResult<Option<ActivateReport>> {
        let _guard = self.update_lock.lock().await;
        let waiting = self.waiting.write().await.take();
        match waiting {
            Some(controller) => Ok(Some(self.promote(controller).await?)),
            None => Ok(None),
        }
    }

    async fn promote(
        &self,
        controller: Arc<OfflineCacheController>,
    ) -> PrecacheResult<ActivateReport> {
        let generation = controller.generation().to_string();

        self.emit_state(&generation, ControllerState::Activating);
        let report = controller.activate().await?;

        let previous = self.active.write().await.replace(Arc::clone(&controller));
        if let Some(previous) = previous {
            previous.flush_writes().await;
            previous.make_redundant().await;
            self.emit_state(previous.generation(), ControllerState::Redundant);
        }
        self.emit_state(&generation, ControllerState::Activated);

        // Claim open clients
        self.emit(LifecycleEvent::ControllerChanged {
            generation: generation.clone(),
        });
        info!("Controller {} activated for scope {}", generation, self.scope);

        Ok(report)
    }

    /// Route a page request through the active controller. With no
    /// serving controller the request goes straight to the network.
    pub async fn fetch(&self, request: &Request) -> PrecacheResult<FetchOutcome> {
        if let Some(controller) = self.active().await {
            if controller.state().await.can_intercept_fetch() {
                return controller.handle_fetch(request).await;
            }
        }

        let response = self.network.fetch(request).await?;
        Ok(FetchOutcome {
            response,
            source: ResponseSource::Passthrough,
        })
    }

    /// Wait for background cache writes of the active controller
    pub async fn flush(&self) {
        if let Some(controller) = self.active().await {
            controller.flush_writes().await;
        }
    }

    /// Snapshot of the active controller for persistence
    pub async fn record(&self) -> Option<RegistrationRecord> {
        let controller = self.active().await?;
        let state = controller.state().await;
        Some(RegistrationRecord::new(
            &self.scope,
            &self.script_url,
            controller.generation(),
            state,
        ))
    }

    /// Bring back the controller described by a persisted record.
    ///
    /// The record's generation keeps serving until the next `update`,
    /// even if the deployed script has moved on.
    pub async fn restore(&self, record: &RegistrationRecord) -> PrecacheResult<()> {
        if !record.state.can_intercept_fetch() {
            debug!(
                "Not restoring {} in state {}",
                record.generation, record.state
            );
            return Ok(());
        }

        let mut options = self.source.fetch_script().await?;
        options.generation = record.generation.clone();

        let controller = OfflineCacheController::restore_activated(
            options,
            Arc::clone(&self.storage),
            Arc::clone(&self.network),
            self.audit.clone(),
        );
        *self.active.write().await = Some(Arc::new(controller));
        debug!("Restored controller {}", record.generation);
        Ok(())
    }
}

#[async_trait]
impl WorkerContainer for Registration {
    async fn register(&self) -> PrecacheResult<()> {
        self.validate()?;
        self.update().await.map_err(|e| match e {
            PrecacheError::RegistrationFailed { .. } => e,
            other => PrecacheError::RegistrationFailed {
                script_url: self.script_url.clone(),
                reason: other.to_string(),
            },
        })?;
        Ok(())
    }

    async fn update(&self) -> PrecacheResult<()> {
        Registration::update(self).await.map(|_| ())
    }

    fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.events()
    }
}
