//! Confirmation prompt with CI/non-interactive fallback

use super::context::UiContext;
use crate::error::{PrecacheError, PrecacheResult};

/// Ask for confirmation. `--yes` approves; without a terminal the default
/// answer is used.
pub async fn confirm(ctx: &UiContext, message: &str, default: bool) -> PrecacheResult<bool> {
    if ctx.auto_yes() {
        eprintln!("  {} (auto-approved)", message);
        return Ok(true);
    }

    if !ctx.is_interactive() {
        return Ok(default);
    }

    // cliclack blocks on stdin
    let message = message.to_string();
    let answer = tokio::task::spawn_blocking(move || {
        cliclack::confirm(&message).initial_value(default).interact()
    })
    .await
    .map_err(|e| PrecacheError::Internal(format!("prompt task failed: {}", e)))?;

    answer.map_err(|e| PrecacheError::io("reading confirmation", e))
}
