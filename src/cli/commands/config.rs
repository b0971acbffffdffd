//! Config command - show or edit configuration

use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::config::{Config, ConfigManager};
use crate::controller::{FetchStrategy, MatchMode};
use crate::error::{PrecacheError, PrecacheResult};
use crate::storage::validate_generation;
use crate::ui::{self, UiContext};
use std::path::PathBuf;

const VALID_KEYS: &[&str] = &[
    "general.log_format",
    "general.audit_log",
    "origin.base_url",
    "origin.timeout_secs",
    "controller.generation",
    "controller.script_url",
    "controller.scope",
    "controller.exclusion_marker",
    "controller.exclusion_mode",
    "controller.offline_shell",
    "controller.strategy",
    "controller.skip_waiting",
    "manifest.assets",
    "notifier.update_interval_secs",
    "notifier.reload_delay_ms",
    "push.title",
    "push.default_body",
    "push.icon",
    "push.badge",
    "push.vibrate",
    "storage.state_dir",
];

/// Execute the config command
pub async fn execute(args: ConfigArgs, config: &Config, manager: &ConfigManager) -> PrecacheResult<()> {
    match args.action {
        None | Some(ConfigAction::Show) => show_config(config)?,
        Some(ConfigAction::Path) => println!("{}", manager.path().display()),
        Some(ConfigAction::Init { force }) => init_config(manager, force).await?,
        Some(ConfigAction::Set { key, value }) => {
            let mut config = config.clone();
            set_value(&mut config, &key, &value)?;
            manager.save(&config).await?;
            ui::step_ok(&UiContext::detect(), &format!("Set {} = {}", key, value));
        }
    }

    Ok(())
}

fn show_config(config: &Config) -> PrecacheResult<()> {
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

async fn init_config(manager: &ConfigManager, force: bool) -> PrecacheResult<()> {
    let ctx = UiContext::detect();
    let path = manager.path();

    if path.exists() && !force {
        ui::step_warn_hint(
            &ctx,
            &format!("Config already exists at {}", path.display()),
            "Use --force to overwrite",
        );
        return Ok(());
    }

    manager.save(&Config::default()).await?;
    ui::step_ok_detail(&ctx, "Configuration initialized", &path.display().to_string());

    Ok(())
}

/// Apply a dot-separated key to the config
fn set_value(config: &mut Config, key: &str, value: &str) -> PrecacheResult<()> {
    let parts: Vec<&str> = key.split('.').collect();

    match parts.as_slice() {
        ["general", "log_format"] => {
            if value != "text" && value != "json" {
                return Err(PrecacheError::User(format!(
                    "Invalid log format: {}. Use text/json",
                    value
                )));
            }
            config.general.log_format = value.to_string();
        }
        ["general", "audit_log"] => config.general.audit_log = parse_bool(value)?,

        ["origin", "base_url"] => {
            if !value.starts_with("http://") && !value.starts_with("https://") {
                return Err(PrecacheError::InvalidUrl(value.to_string()));
            }
            config.origin.base_url = value.trim_end_matches('/').to_string();
        }
        ["origin", "timeout_secs"] => {
            config.origin.timeout_secs = match value {
                "" | "none" => None,
                v => Some(parse_u64(v)?),
            }
        }

        ["controller", "generation"] => {
            validate_generation(value)?;
            config.controller.generation = value.to_string();
        }
        ["controller", "script_url"] => config.controller.script_url = root_relative(value)?,
        ["controller", "scope"] => config.controller.scope = root_relative(value)?,
        ["controller", "exclusion_marker"] => {
            config.controller.exclusion_marker = value.to_string()
        }
        ["controller", "exclusion_mode"] => {
            config.controller.exclusion_mode = match value {
                "substring" => MatchMode::Substring,
                "path-prefix" => MatchMode::PathPrefix,
                _ => {
                    return Err(PrecacheError::User(format!(
                        "Invalid exclusion mode: {}. Use substring/path-prefix",
                        value
                    )))
                }
            }
        }
        ["controller", "offline_shell"] => {
            config.controller.offline_shell = root_relative(value)?
        }
        ["controller", "strategy"] => {
            config.controller.strategy = match value {
                "network-first" => FetchStrategy::NetworkFirst,
                "cache-first" => FetchStrategy::CacheFirst,
                _ => {
                    return Err(PrecacheError::User(format!(
                        "Invalid strategy: {}. Use network-first/cache-first",
                        value
                    )))
                }
            }
        }
        ["controller", "skip_waiting"] => config.controller.skip_waiting = parse_bool(value)?,

        ["manifest", "assets"] => {
            config.manifest.assets = parse_list(value)
                .into_iter()
                .map(|asset| root_relative(&asset))
                .collect::<PrecacheResult<_>>()?;
        }

        ["notifier", "update_interval_secs"] => {
            config.notifier.update_interval_secs = parse_u64(value)?
        }
        ["notifier", "reload_delay_ms"] => config.notifier.reload_delay_ms = parse_u64(value)?,

        ["push", "title"] => config.push.title = value.to_string(),
        ["push", "default_body"] => config.push.default_body = value.to_string(),
        ["push", "icon"] => config.push.icon = value.to_string(),
        ["push", "badge"] => config.push.badge = value.to_string(),
        ["push", "vibrate"] => {
            config.push.vibrate = parse_list(value)
                .iter()
                .map(|ms| {
                    ms.parse()
                        .map_err(|_| PrecacheError::User(format!("Invalid number: {}", ms)))
                })
                .collect::<PrecacheResult<_>>()?;
        }

        ["storage", "state_dir"] => {
            config.storage.state_dir = match value {
                "" => None,
                dir => Some(PathBuf::from(dir)),
            }
        }

        _ => {
            let ctx = UiContext::detect();
            ui::step_error_detail(&ctx, "Unknown config key", key);
            ui::remark(&ctx, "Valid keys:");
            for key in VALID_KEYS {
                eprintln!("  {}", key);
            }
            return Err(PrecacheError::User(format!("Unknown config key: {}", key)));
        }
    }

    Ok(())
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn root_relative(value: &str) -> PrecacheResult<String> {
    if value.starts_with('/') {
        Ok(value.to_string())
    } else {
        Err(PrecacheError::InvalidUrl(format!(
            "{} (must start with '/')",
            value
        )))
    }
}

fn parse_bool(value: &str) -> PrecacheResult<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(PrecacheError::User(format!(
            "Invalid boolean value: {}. Use true/false",
            value
        ))),
    }
}

fn parse_u64(value: &str) -> PrecacheResult<u64> {
    value
        .parse()
        .map_err(|_| PrecacheError::User(format!("Invalid number: {}", value)))
}
