//! Where the host reads the current controller version from

use crate::config::ConfigManager;
use crate::controller::ControllerOptions;
use crate::error::PrecacheResult;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Mutex;

/// Supplies the controller options of the currently deployed script.
/// A different generation than the active controller means an update.
#[async_trait]
pub trait ScriptSource: Send + Sync {
    async fn fetch_script(&self) -> PrecacheResult<ControllerOptions>;
}

/// Reads the controller options from the config file on every check,
/// so editing `controller.generation` is a deploy
pub struct ConfigScriptSource {
    path: PathBuf,
}

impl ConfigScriptSource {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl ScriptSource for ConfigScriptSource {
    async fn fetch_script(&self) -> PrecacheResult<ControllerOptions> {
        let config = ConfigManager::with_path(self.path.clone()).load().await?;
        Ok(ControllerOptions::from_config(&config))
    }
}

/// Fixed options, replaceable at runtime
pub struct StaticScriptSource {
    options: Mutex<ControllerOptions>,
}

impl StaticScriptSource {
    pub fn new(options: ControllerOptions) -> Self {
        Self {
            options: Mutex::new(options),
        }
    }

    /// Deploy new options; picked up by the next update check
    pub fn set(&self, options: ControllerOptions) {
        let mut current = self.options.lock().unwrap_or_else(|e| e.into_inner());
        *current = options;
    }
}

#[async_trait]
impl ScriptSource for StaticScriptSource {
    async fn fetch_script(&self) -> PrecacheResult<ControllerOptions> {
        let options = self.options.lock().unwrap_or_else(|e| e.into_inner());
        Ok(options.clone())
    }
}
