//! CLI command implementations

pub mod cache;
pub mod config;
pub mod fetch;
pub mod push;
pub mod status;
pub mod update;
pub mod watch;

pub use cache::execute as cache;
pub use config::execute as config;
pub use fetch::execute as fetch;
pub use push::execute as push;
pub use status::execute as status;
pub use update::execute as update;
pub use watch::execute as watch;

use crate::audit::AuditLog;
use crate::config::{Config, ConfigManager};
use crate::error::PrecacheResult;
use crate::network::HttpNetwork;
use crate::registration::{ConfigScriptSource, Registration, RegistrationRecord};
use crate::storage::DiskCacheStorage;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Build the local registration host and restore the controller that was
/// active when the last command exited
pub(crate) async fn open_registration(
    config: &Config,
    config_path: &Path,
) -> PrecacheResult<Arc<Registration>> {
    ConfigManager::ensure_state_dirs(config).await?;

    let registration = Registration::new(
        config.controller.scope.clone(),
        config.controller.script_url.clone(),
        Arc::new(ConfigScriptSource::new(config_path.to_path_buf())),
        Arc::new(DiskCacheStorage::new(ConfigManager::caches_dir(config))),
        Arc::new(HttpNetwork::new(
            config.origin.base_url.clone(),
            config.origin.timeout(),
        )),
        AuditLog::new(config),
    );

    let record_path = ConfigManager::registration_path(config);
    if let Some(record) = RegistrationRecord::load(&record_path).await? {
        debug!("Restoring registration from {}", record_path.display());
        registration.restore(&record).await?;
    }

    Ok(Arc::new(registration))
}

/// Finish background cache writes and persist the active controller
pub(crate) async fn save_registration(
    registration: &Registration,
    config: &Config,
) -> PrecacheResult<()> {
    registration.flush().await;

    let record_path = ConfigManager::registration_path(config);
    match registration.record().await {
        Some(record) => record.save(&record_path).await,
        None => RegistrationRecord::delete(&record_path).await,
    }
}
