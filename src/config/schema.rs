//! Configuration schema for precache
//!
//! Configuration is stored at `~/.config/precache/config.toml`

use crate::controller::{ExclusionRule, FetchStrategy, MatchMode};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Origin the assets are fetched from
    pub origin: OriginConfig,

    /// Controller script and fetch policy
    pub controller: ControllerConfig,

    /// Assets warmed into a new generation at install time
    pub manifest: ManifestConfig,

    /// Page-side update notifier timing
    pub notifier: NotifierConfig,

    /// Push notification defaults
    pub push: PushConfig,

    /// Storage locations
    pub storage: StorageConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,

    /// Enable audit logging of lifecycle events
    pub audit_log: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
            audit_log: true,
        }
    }
}

/// Origin settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OriginConfig {
    /// Base URL root-relative paths resolve against
    pub base_url: String,

    /// Network timeout in seconds (unset = transport default)
    pub timeout_secs: Option<u64>,
}

impl OriginConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl Default for OriginConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_secs: None,
        }
    }
}

/// Controller settings. The generation identifier is the controller's version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Cache generation identifier
    pub generation: String,

    /// Path the controller script is served at
    pub script_url: String,

    /// Scope the controller is registered for
    pub scope: String,

    /// Requests whose URL matches this marker are never cached
    pub exclusion_marker: String,

    /// How the marker is matched: "substring" or "path-prefix"
    pub exclusion_mode: MatchMode,

    /// Document served for failed navigations with no cache match
    pub offline_shell: String,

    /// "network-first" or "cache-first"
    pub strategy: FetchStrategy,

    /// Activate a freshly installed controller without waiting
    pub skip_waiting: bool,
}

impl ControllerConfig {
    pub fn exclusion_rule(&self) -> ExclusionRule {
        ExclusionRule::new(self.exclusion_marker.clone(), self.exclusion_mode)
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            generation: "csi-calculator-v3".to_string(),
            script_url: "/sw.js".to_string(),
            scope: "/".to_string(),
            exclusion_marker: "/api/".to_string(),
            exclusion_mode: MatchMode::Substring,
            offline_shell: "/index.html".to_string(),
            strategy: FetchStrategy::NetworkFirst,
            skip_waiting: true,
        }
    }
}

/// Static manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManifestConfig {
    /// Root-relative asset paths, in warm-up order
    pub assets: Vec<String>,
}

impl Default for ManifestConfig {
    fn default() -> Self {
        let assets = [
            "/",
            "/index.html",
            "/crew-calculator.html",
            "/ai-planner.html",
            "/privacy.html",
            "/terms.html",
            "/css/theme.css",
            "/css/style.css",
            "/css/crew-calculator.css",
            "/css/landing.css",
            "/css/legal.css",
            "/js/app.js",
            "/js/i18n.js",
            "/assets/csi_logo_v2.png",
            "/assets/engineer_character.png",
            "/assets/csi_hierarchy.png",
            "/assets/benefits_icons.png",
            "/manifest.json",
        ];
        Self {
            assets: assets.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Update notifier settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifierConfig {
    /// Seconds between explicit update checks
    pub update_interval_secs: u64,

    /// Delay before reloading after a new controller activates
    pub reload_delay_ms: u64,
}

impl NotifierConfig {
    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval_secs.max(1))
    }

    pub fn reload_delay(&self) -> Duration {
        Duration::from_millis(self.reload_delay_ms)
    }
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            update_interval_secs: 60,
            reload_delay_ms: 1000,
        }
    }
}

/// Push notification defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PushConfig {
    pub title: String,
    pub default_body: String,
    pub icon: String,
    pub badge: String,
    pub vibrate: Vec<u32>,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            title: "CSI Crew Calculator".to_string(),
            default_body: "New update available!".to_string(),
            icon: "/assets/icon-192.png".to_string(),
            badge: "/assets/icon-72.png".to_string(),
            vibrate: vec![100, 50, 100],
        }
    }
}

/// Storage settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// State directory holding caches, registration record and audit log
    /// (default: platform state dir)
    pub state_dir: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("[general]"));
        assert!(toml.contains("[controller]"));
        assert!(toml.contains("strategy = \"network-first\""));
    }

    #[test]
    fn config_deserializes_empty() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.controller.generation, "csi-calculator-v3");
        assert_eq!(config.controller.offline_shell, "/index.html");
        assert_eq!(config.notifier.update_interval_secs, 60);
        assert_eq!(config.notifier.reload_delay_ms, 1000);
    }

    #[test]
    fn config_deserializes_partial() {
        let toml = r#"
            [controller]
            generation = "csi-calculator-v4"
            strategy = "cache-first"
            exclusion_mode = "path-prefix"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.controller.generation, "csi-calculator-v4");
        assert_eq!(config.controller.strategy, FetchStrategy::CacheFirst);
        assert_eq!(config.controller.exclusion_mode, MatchMode::PathPrefix);
        assert_eq!(config.controller.exclusion_marker, "/api/"); // default preserved
    }

    #[test]
    fn manifest_starts_with_root_document() {
        let manifest = ManifestConfig::default();
        assert_eq!(manifest.assets[0], "/");
        assert!(manifest.assets.contains(&"/index.html".to_string()));
    }

    #[test]
    fn zero_interval_clamped() {
        let notifier = NotifierConfig {
            update_interval_secs: 0,
            reload_delay_ms: 0,
        };
        assert_eq!(notifier.update_interval(), Duration::from_secs(1));
    }
}
