//! Status command - registration and cache overview

use crate::config::{Config, ConfigManager};
use crate::controller::policy::generations_to_delete;
use crate::error::PrecacheResult;
use crate::registration::RegistrationRecord;
use crate::storage::{CacheStorage, DiskCacheStorage};
use crate::ui::{self, UiContext};

/// Execute the status command
pub async fn execute(config: &Config, manager: &ConfigManager) -> PrecacheResult<()> {
    let ctx = UiContext::detect();
    ui::intro(&ctx, "Precache Status");

    ui::section(&ctx, "Configuration");
    ui::key_value(&ctx, "Config file", &manager.path().display().to_string());
    ui::key_value(&ctx, "Origin", &config.origin.base_url);
    ui::key_value(&ctx, "Scope", &config.controller.scope);
    ui::key_value(&ctx, "Script", &config.controller.script_url);
    ui::key_value(&ctx, "Strategy", &config.controller.strategy.to_string());
    ui::key_value(&ctx, "Deployed generation", &config.controller.generation);
    ui::key_value(&ctx, "Manifest", &format!("{} assets", config.manifest.assets.len()));

    ui::section(&ctx, "Registration");
    let record = RegistrationRecord::load(&ConfigManager::registration_path(config)).await?;
    match record {
        Some(ref record) => {
            let current = record.generation == config.controller.generation;
            ui::key_value_status(&ctx, "Active generation", &record.generation, current);
            ui::key_value(&ctx, "State", &record.state.to_string());
            ui::key_value(
                &ctx,
                "Updated",
                &record.updated_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            );
            if !current {
                ui::step_warn_hint(
                    &ctx,
                    &format!("{} has been deployed", config.controller.generation),
                    "Run: precache update",
                );
            }
        }
        None => ui::step_warn_hint(&ctx, "No controller registered", "Run: precache update"),
    }

    ui::section(&ctx, "Cache generations");
    let storage = DiskCacheStorage::new(ConfigManager::caches_dir(config));
    let generations = storage.keys().await?;

    if generations.is_empty() {
        ui::step_info(&ctx, "No cache generations");
    }
    for generation in &generations {
        let entries = storage.entries(generation).await?.len();
        let active = record.as_ref().is_some_and(|r| &r.generation == generation);
        let label = if active {
            format!("{} (active)", generation)
        } else {
            generation.clone()
        };
        ui::key_value_status(&ctx, &label, &format!("{} entries", entries), active);
    }

    if let Some(ref record) = record {
        let stale = generations_to_delete(&generations, &record.generation);
        if !stale.is_empty() {
            ui::step_warn_hint(
                &ctx,
                &format!("{} stale generation(s)", stale.len()),
                "Removed on the next activation",
            );
        }
    }

    if config.general.audit_log {
        ui::remark(
            &ctx,
            &format!(
                "Audit log: {}",
                ConfigManager::audit_log_path(config).display()
            ),
        );
    }

    Ok(())
}
