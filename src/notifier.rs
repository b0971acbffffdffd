//! Update notifier
//!
//! Runs on the page side. Registers the controller, asks for an update
//! check every interval, and reloads the page once a newer controller
//! has taken over:
//!
//! - a new controller reaches `activated` while an older one was already
//!   in charge: reload after a short delay
//! - the active controller changes (clients claimed): reload immediately
//!
//! The first reload ends the run, since the page is gone after it.

use crate::config::schema::NotifierConfig;
use crate::controller::ControllerState;
use crate::error::PrecacheResult;
use crate::registration::LifecycleEvent;
use async_trait::async_trait;
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time::{Instant, MissedTickBehavior, Sleep};
use tracing::{debug, error, info, warn};

/// The page's view of the controller runtime
#[async_trait]
pub trait WorkerContainer: Send + Sync {
    /// Register the controller script for its scope
    async fn register(&self) -> PrecacheResult<()>;

    /// Check for a newer controller version
    async fn update(&self) -> PrecacheResult<()>;

    /// Lifecycle events for the scope
    fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent>;
}

/// Why the page was reloaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadReason {
    /// A newer controller finished activating
    Updated { generation: String },
    /// The controller in charge of the page changed
    ControllerChanged { generation: String },
}

impl fmt::Display for ReloadReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Updated { generation } => write!(f, "new version {} activated", generation),
            Self::ControllerChanged { generation } => {
                write!(f, "controller changed to {}", generation)
            }
        }
    }
}

/// Performs the actual page reload
pub trait PageReloader: Send + Sync {
    fn reload(&self, reason: &ReloadReason);
}

/// How a notifier run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifierExit {
    /// The page was reloaded
    Reloaded(ReloadReason),
    /// Registration failed; the page carries on without offline support
    Unregistered,
    /// The event stream ended
    Closed,
}

/// Page-side watcher that converges the page onto the newest controller
pub struct UpdateNotifier {
    container: Arc<dyn WorkerContainer>,
    page: Arc<dyn PageReloader>,
    update_interval: Duration,
    reload_delay: Duration,
}

impl UpdateNotifier {
    pub fn new(
        container: Arc<dyn WorkerContainer>,
        page: Arc<dyn PageReloader>,
        config: &NotifierConfig,
    ) -> Self {
        Self {
            container,
            page,
            update_interval: config.update_interval(),
            reload_delay: config.reload_delay(),
        }
    }

    fn reload(&self, reason: ReloadReason) -> NotifierExit {
        info!("Reloading page: {}", reason);
        self.page.reload(&reason);
        NotifierExit::Reloaded(reason)
    }

    /// Register and watch until the page reloads or events stop
    pub async fn run(self) -> NotifierExit {
        // Subscribe first so events fired during registration are seen
        let mut events = self.container.subscribe();

        if let Err(e) = self.container.register().await {
            error!("Controller registration failed: {}", e);
            return NotifierExit::Unregistered;
        }
        info!("Controller registered");

        let mut ticker = tokio::time::interval_at(
            Instant::now() + self.update_interval,
            self.update_interval,
        );
        // A slow check pushes the schedule back instead of firing catch-up checks
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut installing: Option<(String, bool)> = None;
        let mut pending: Option<(Pin<Box<Sleep>>, String)> = None;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    debug!("Checking for controller update");
                    if let Err(e) = self.container.update().await {
                        warn!("Update check failed: {}", e);
                    }
                }
                event = events.recv() => match event {
                    Ok(LifecycleEvent::UpdateFound { generation, had_controller }) => {
                        debug!("Controller {} installing", generation);
                        installing = Some((generation, had_controller));
                    }
                    Ok(LifecycleEvent::StateChanged { generation, state: ControllerState::Activated }) => {
                        let is_update = matches!(
                            installing,
                            Some((ref g, true)) if *g == generation
                        );
                        if is_update && pending.is_none() {
                            info!("New version {} detected", generation);
                            pending = Some((Box::pin(tokio::time::sleep(self.reload_delay)), generation));
                        }
                    }
                    Ok(LifecycleEvent::StateChanged { .. }) => {}
                    Ok(LifecycleEvent::ControllerChanged { generation }) => {
                        return self.reload(ReloadReason::ControllerChanged { generation });
                    }
                    Err(RecvError::Lagged(missed)) => {
                        warn!("Missed {} lifecycle events", missed);
                    }
                    Err(RecvError::Closed) => return NotifierExit::Closed,
                },
                _ = async {
                    if let Some((sleep, _)) = pending.as_mut() {
                        sleep.as_mut().await;
                    }
                }, if pending.is_some() => {
                    if let Some((_, generation)) = pending.take() {
                        return self.reload(ReloadReason::Updated { generation });
                    }
                }
            }
        }
    }
}
