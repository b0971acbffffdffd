//! Audit logging for controller lifecycle events
//!
//! Writes JSON lines to `<state_dir>/audit.log`: installs, activations and
//! every cache generation that gets deleted.

use crate::config::{schema::Config, ConfigManager};
use chrono::Utc;
use std::path::PathBuf;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::warn;

/// File-based audit logger that appends JSON lines
#[derive(Debug, Clone)]
pub struct AuditLog {
    enabled: bool,
    path: PathBuf,
}

impl AuditLog {
    /// Create a new audit logger from config
    pub fn new(config: &Config) -> Self {
        Self {
            enabled: config.general.audit_log,
            path: ConfigManager::audit_log_path(config),
        }
    }

    /// A logger that drops every event
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            path: PathBuf::new(),
        }
    }

    /// Log an audit event as a JSON line
    ///
    /// Drops the event on IO failure; auditing never interrupts a
    /// lifecycle phase.
    pub async fn log(&self, event: &str, data: &serde_json::Value) {
        if !self.enabled {
            return;
        }

        let entry = serde_json::json!({
            "timestamp": Utc::now().to_rfc3339(),
            "event": event,
            "data": data,
        });

        let mut line = match serde_json::to_string(&entry) {
            Ok(s) => s,
            Err(e) => {
                warn!("Failed to serialize audit event: {}", e);
                return;
            }
        };
        line.push('\n');

        if let Err(e) = self.append(&line).await {
            warn!("Failed to write audit log: {}", e);
        }
    }

    async fn append(&self, line: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;

        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_audit_log(dir: &TempDir, enabled: bool) -> AuditLog {
        AuditLog {
            enabled,
            path: dir.path().join("audit.log"),
        }
    }

    #[tokio::test]
    async fn writes_json_line() {
        let dir = TempDir::new().unwrap();
        let audit = test_audit_log(&dir, true);

        audit
            .log(
                "generation.deleted",
                &serde_json::json!({"generation": "csi-calculator-v2"}),
            )
            .await;

        let content = tokio::fs::read_to_string(&audit.path).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_str(content.trim()).unwrap();

        assert_eq!(parsed["event"], "generation.deleted");
        assert_eq!(parsed["data"]["generation"], "csi-calculator-v2");
        assert!(parsed["timestamp"].is_string());
    }

    #[tokio::test]
    async fn appends_multiple_lines() {
        let dir = TempDir::new().unwrap();
        let audit = test_audit_log(&dir, true);

        audit.log("controller.installed", &serde_json::json!({})).await;
        audit.log("controller.activated", &serde_json::json!({})).await;

        let content = tokio::fs::read_to_string(&audit.path).await.unwrap();
        let lines: Vec<&str> = content.trim().lines().collect();
        assert_eq!(lines.len(), 2);
    }

    #[tokio::test]
    async fn skips_when_disabled() {
        let dir = TempDir::new().unwrap();
        let audit = test_audit_log(&dir, false);

        audit.log("should.not.appear", &serde_json::json!({})).await;

        assert!(!audit.path.exists());
    }

    #[test]
    fn path_follows_state_dir() {
        let mut config = Config::default();
        config.storage.state_dir = Some(PathBuf::from("/var/lib/precache"));
        let audit = AuditLog::new(&config);
        assert_eq!(audit.path, PathBuf::from("/var/lib/precache/audit.log"));
    }
}
