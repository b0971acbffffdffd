//! Error types for precache
//!
//! All modules use `PrecacheResult<T>` as their return type.

use crate::controller::ControllerState;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for precache operations
pub type PrecacheResult<T> = Result<T, PrecacheError>;

/// All errors that can occur in precache
#[derive(Error, Debug)]
pub enum PrecacheError {
    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Configuration file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Network errors
    #[error("Network request failed: {url}: {reason}")]
    Network { url: String, reason: String },

    #[error("Invalid request URL: {0}")]
    InvalidUrl(String),

    // Cache store errors
    #[error("Invalid cache generation name: {0}")]
    InvalidGeneration(String),

    #[error("Cache generation not found: {0}")]
    GenerationNotFound(String),

    #[error("Failed to write cache entry {key} in {generation}: {reason}")]
    CacheWrite {
        generation: String,
        key: String,
        reason: String,
    },

    #[error("Failed to read cache entry in {generation}: {reason}")]
    CacheRead { generation: String, reason: String },

    /// Network failed and no cached entry (or offline shell) could stand in
    #[error("Offline and no cached response for {method} {url}")]
    Offline { method: String, url: String },

    // Lifecycle errors
    #[error("Invalid controller transition: {from} -> {to}")]
    InvalidTransition {
        from: ControllerState,
        to: ControllerState,
    },

    #[error("Controller {generation} is not serving fetches (state: {state})")]
    NotServing {
        generation: String,
        state: ControllerState,
    },

    #[error("Controller registration failed for {script_url}: {reason}")]
    RegistrationFailed { script_url: String, reason: String },

    #[error("No controller registered")]
    NotRegistered,

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl PrecacheError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a network transport error
    pub fn network(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::Network {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::Offline { .. })
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::NotRegistered => Some("Run: precache update"),
            Self::Offline { .. } => Some("Check the origin is reachable or run: precache update"),
            Self::ConfigNotFound(_) => Some("Run: precache config init"),
            Self::InvalidGeneration(_) => Some("Generation names must not contain '/' or '..'"),
            _ => None,
        }
    }
}
