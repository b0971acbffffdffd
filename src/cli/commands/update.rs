//! Update command - install and activate the deployed generation

use super::{open_registration, save_registration};
use crate::cli::args::UpdateArgs;
use crate::config::{Config, ConfigManager};
use crate::controller::{ActivateReport, InstallReport};
use crate::error::PrecacheResult;
use crate::registration::UpdateOutcome;
use crate::ui::{self, TaskSpinner, UiContext};

/// Execute the update command
pub async fn execute(
    args: UpdateArgs,
    config: &Config,
    manager: &ConfigManager,
) -> PrecacheResult<()> {
    let ctx = UiContext::detect();
    let registration = open_registration(config, manager.path()).await?;

    let mut spinner = TaskSpinner::new(&ctx);
    spinner.start(&format!(
        "Checking {} for a new version...",
        registration.script_url()
    ));

    let outcome = match registration.update().await {
        Ok(outcome) => outcome,
        Err(e) => {
            spinner.stop_error("Update failed");
            return Err(e);
        }
    };

    match outcome {
        UpdateOutcome::Unchanged { generation } => {
            spinner.stop(&format!("{} is up to date", generation));
        }
        UpdateOutcome::Activated { install, activate } => {
            spinner.stop(&format!("Installed {}", install.generation));
            print_install(&ctx, &install);
            print_activate(&ctx, &activate);
        }
        UpdateOutcome::Waiting { install } => {
            spinner.stop(&format!("Installed {}", install.generation));
            print_install(&ctx, &install);

            if args.skip_waiting {
                if let Some(activate) = registration.skip_waiting().await? {
                    print_activate(&ctx, &activate);
                }
            } else {
                ui::step_warn_hint(
                    &ctx,
                    &format!("{} is waiting to activate", install.generation),
                    "Run: precache update --skip-waiting",
                );
            }
        }
    }

    save_registration(&registration, config).await
}

fn print_install(ctx: &UiContext, install: &InstallReport) {
    let total = install.stored.len() + install.failed.len();
    if install.is_complete() {
        ui::step_ok(ctx, &format!("Precached {}/{} assets", install.stored.len(), total));
        return;
    }

    ui::step_warn(
        ctx,
        &format!(
            "Precached {}/{} assets ({} failed)",
            install.stored.len(),
            total,
            install.failed.len()
        ),
    );
    for (path, reason) in &install.failed {
        ui::remark(ctx, &format!("{}: {}", path, reason));
    }
}

fn print_activate(ctx: &UiContext, activate: &ActivateReport) {
    for generation in &activate.deleted {
        ui::step_info(ctx, &format!("Deleted stale generation {}", generation));
    }
    ui::step_ok_detail(ctx, "Activated", &activate.generation);
}
