//! Configuration management for precache

pub mod schema;

pub use schema::Config;

use crate::error::{PrecacheError, PrecacheResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new config manager with default path
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Create a config manager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("precache")
            .join("config.toml")
    }

    /// Get the state directory path, honouring `storage.state_dir`
    pub fn state_dir(config: &Config) -> PathBuf {
        if let Some(ref dir) = config.storage.state_dir {
            return dir.clone();
        }
        dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("precache")
    }

    /// Get the cache generations directory path
    pub fn caches_dir(config: &Config) -> PathBuf {
        Self::state_dir(config).join("caches")
    }

    /// Get the registration record path
    pub fn registration_path(config: &Config) -> PathBuf {
        Self::state_dir(config).join("registration.json")
    }

    /// Get the audit log path
    pub fn audit_log_path(config: &Config) -> PathBuf {
        Self::state_dir(config).join("audit.log")
    }

    /// Load configuration, using defaults if the file does not exist
    pub async fn load(&self) -> PrecacheResult<Config> {
        if !self.config_path.exists() {
            debug!("Config file not found, using defaults");
            return Ok(Config::default());
        }

        self.load_from_file(&self.config_path).await
    }

    /// Load configuration from a specific file
    pub async fn load_from_file(&self, path: &Path) -> PrecacheResult<Config> {
        let content = fs::read_to_string(path).await.map_err(|e| {
            PrecacheError::io(format!("reading config from {}", path.display()), e)
        })?;

        toml::from_str(&content).map_err(|e| PrecacheError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Save configuration to file
    pub async fn save(&self, config: &Config) -> PrecacheResult<()> {
        self.ensure_config_dir().await?;

        let content = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, content).await.map_err(|e| {
            PrecacheError::io(
                format!("writing config to {}", self.config_path.display()),
                e,
            )
        })?;

        info!("Configuration saved to {}", self.config_path.display());
        Ok(())
    }

    /// Ensure the config directory exists
    async fn ensure_config_dir(&self) -> PrecacheResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| PrecacheError::ConfigDirCreate {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }
        Ok(())
    }

    /// Ensure the state directories exist
    pub async fn ensure_state_dirs(config: &Config) -> PrecacheResult<()> {
        let dirs = [Self::state_dir(config), Self::caches_dir(config)];

        for dir in &dirs {
            fs::create_dir_all(dir).await.map_err(|e| {
                PrecacheError::io(format!("creating directory {}", dir.display()), e)
            })?;
        }

        Ok(())
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}
