//! Push command - hand a push message to the active controller

use super::open_registration;
use crate::cli::args::{OutputFormat, PushArgs};
use crate::config::{Config, ConfigManager};
use crate::error::{PrecacheError, PrecacheResult};
use crate::ui::{self, UiContext};

/// Execute the push command
pub async fn execute(args: PushArgs, config: &Config, manager: &ConfigManager) -> PrecacheResult<()> {
    let registration = open_registration(config, manager.path()).await?;
    let controller = registration
        .active()
        .await
        .ok_or(PrecacheError::NotRegistered)?;

    let notification = controller.on_push(args.message.as_deref().map(str::as_bytes));

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&notification)?),
        OutputFormat::Plain => println!("{}", notification.body),
        OutputFormat::Table => {
            let ctx = UiContext::detect();
            ui::note(&ctx, &notification.title, &notification.body);
            ui::key_value(&ctx, "Icon", &notification.icon);
            ui::key_value(&ctx, "Badge", &notification.badge);
            let pattern: Vec<String> =
                notification.vibrate.iter().map(|ms| ms.to_string()).collect();
            ui::key_value(&ctx, "Vibrate", &format!("{} ms", pattern.join("/")));
        }
    }

    Ok(())
}
