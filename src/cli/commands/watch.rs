//! Watch command - keep a page open and follow new versions
//!
//! Each page load runs an update notifier. When it reloads the page a
//! fresh load starts, so one watch session follows any number of deploys.

use super::{open_registration, save_registration};
use crate::config::{Config, ConfigManager};
use crate::error::{PrecacheError, PrecacheResult};
use crate::notifier::{NotifierExit, PageReloader, ReloadReason, UpdateNotifier};
use crate::ui::{self, UiContext};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Page stand-in that reports reloads on the terminal
struct TerminalPage {
    ctx: UiContext,
    loads: AtomicU32,
}

impl PageReloader for TerminalPage {
    fn reload(&self, reason: &ReloadReason) {
        // The initial load is #1
        let load = self.loads.fetch_add(1, Ordering::SeqCst) + 2;
        ui::step_ok_detail(
            &self.ctx,
            &format!("Page reloaded: {}", reason),
            &format!("load #{}", load),
        );
    }
}

/// Execute the watch command
pub async fn execute(config: &Config, manager: &ConfigManager) -> PrecacheResult<()> {
    let ctx = UiContext::detect();
    let registration = open_registration(config, manager.path()).await?;
    let page = Arc::new(TerminalPage {
        ctx: ctx.clone(),
        loads: AtomicU32::new(0),
    });

    ui::intro(&ctx, "Watching for updates");
    ui::remark(
        &ctx,
        &format!(
            "Checking {} every {}s, Ctrl-C to stop",
            registration.script_url(),
            config.notifier.update_interval().as_secs()
        ),
    );

    loop {
        let notifier = UpdateNotifier::new(registration.clone(), page.clone(), &config.notifier);

        let exit = tokio::select! {
            exit = notifier.run() => exit,
            result = tokio::signal::ctrl_c() => {
                result.map_err(|e| PrecacheError::io("waiting for Ctrl-C", e))?;
                debug!("Interrupted");
                break;
            }
        };

        match exit {
            NotifierExit::Reloaded(_) => {
                save_registration(&registration, config).await?;
            }
            NotifierExit::Unregistered => {
                ui::step_warn_hint(
                    &ctx,
                    "Controller registration failed, page runs without offline support",
                    "Check the origin and run with -v for details",
                );
                break;
            }
            NotifierExit::Closed => break,
        }
    }

    save_registration(&registration, config).await?;
    ui::outro_success(&ctx, "Stopped watching");
    Ok(())
}
