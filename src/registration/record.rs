//! Registration record persistence
//!
//! Lets a later process restore the activated controller without
//! re-running install and activate.

use crate::controller::ControllerState;
use crate::error::{PrecacheError, PrecacheResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

/// Persisted view of a registration's active controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationRecord {
    /// Scope the controller covers
    pub scope: String,

    /// Controller script path
    pub script_url: String,

    /// Active cache generation
    pub generation: String,

    /// Lifecycle state of the active controller
    pub state: ControllerState,

    /// When the record was last written
    pub updated_at: DateTime<Utc>,
}

impl RegistrationRecord {
    pub fn new(scope: &str, script_url: &str, generation: &str, state: ControllerState) -> Self {
        Self {
            scope: scope.to_string(),
            script_url: script_url.to_string(),
            generation: generation.to_string(),
            state,
            updated_at: Utc::now(),
        }
    }

    /// Load a record, `None` if the file does not exist
    pub async fn load(path: &Path) -> PrecacheResult<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(path).await.map_err(|e| {
            PrecacheError::io(format!("reading registration {}", path.display()), e)
        })?;

        let record: RegistrationRecord = serde_json::from_str(&content)?;
        Ok(Some(record))
    }

    pub async fn save(&self, path: &Path) -> PrecacheResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| PrecacheError::io("creating state directory", e))?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).await.map_err(|e| {
            PrecacheError::io(format!("writing registration {}", path.display()), e)
        })?;

        Ok(())
    }

    pub async fn delete(path: &Path) -> PrecacheResult<()> {
        if path.exists() {
            fs::remove_file(path).await.map_err(|e| {
                PrecacheError::io(format!("deleting registration {}", path.display()), e)
            })?;
        }
        Ok(())
    }
}
