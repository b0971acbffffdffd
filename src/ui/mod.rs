//! Terminal output for the CLI
//!
//! Uses `cliclack` for styled output in a terminal, with plain tagged
//! lines (`[OK]`, `[WARN]`, ...) in CI and when piped.
//!
//! ```rust,ignore
//! use precache::ui::{self, TaskSpinner, UiContext};
//!
//! let ctx = UiContext::detect();
//! let mut spinner = TaskSpinner::new(&ctx);
//! spinner.start("Checking /sw.js for a new version...");
//! spinner.stop("Installed csi-calculator-v4");
//! ui::step_warn_hint(&ctx, "2 assets failed", "Run with -v for details");
//! ```

mod context;
mod output;
mod progress;
mod prompts;

pub use context::UiContext;
pub use output::{
    intro, key_value, key_value_status, note, outro_success, remark, section, step_error_detail,
    step_info, step_ok, step_ok_detail, step_warn, step_warn_hint,
};
pub use progress::{StepProgress, TaskSpinner};
pub use prompts::confirm;
