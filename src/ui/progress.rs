//! Progress indicators with CI fallback

use super::context::UiContext;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// A task spinner with CI fallback
pub struct TaskSpinner {
    spinner: Option<cliclack::ProgressBar>,
    interactive: bool,
}

impl TaskSpinner {
    /// Create a new spinner (shown once started, interactive mode only)
    pub fn new(ctx: &UiContext) -> Self {
        Self {
            spinner: None,
            interactive: ctx.use_fancy_output(),
        }
    }

    /// Start the spinner with a message
    pub fn start(&mut self, message: &str) {
        if self.interactive {
            let spinner = cliclack::spinner();
            spinner.start(message);
            self.spinner = Some(spinner);
        } else {
            eprintln!("{} {}", style("...").dim(), message);
        }
    }

    /// Stop with success message
    pub fn stop(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.stop(message);
        } else if self.interactive {
            eprintln!("{} {}", style("✓").green(), message);
        } else {
            eprintln!("{} {}", style("[OK]").green(), message);
        }
    }

    /// Stop with error message
    pub fn stop_error(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.error(message);
        } else if self.interactive {
            eprintln!("{} {}", style("✗").red(), message);
        } else {
            eprintln!("{} {}", style("[FAIL]").red(), message);
        }
    }
}

/// Counted progress over a known number of steps, e.g. generations being
/// deleted. An indicatif bar when interactive, one line per step otherwise.
pub struct StepProgress {
    bar: Option<ProgressBar>,
    label: String,
    total: u64,
}

impl StepProgress {
    pub fn new(ctx: &UiContext, label: &str, total: u64) -> Self {
        let bar = if ctx.use_fancy_output() {
            let bar = ProgressBar::new(total);
            let template = ProgressStyle::default_bar()
                .template("  {spinner:.cyan} {prefix}  {bar:20.cyan/dim} {pos}/{len} {msg:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
                .progress_chars("━╸─");
            bar.set_style(template);
            bar.set_prefix(label.to_string());
            bar.enable_steady_tick(Duration::from_millis(120));
            Some(bar)
        } else {
            None
        };

        Self {
            bar,
            label: label.to_string(),
            total,
        }
    }

    /// Move to the next step, naming the item being worked on
    pub fn advance(&self, item: &str) {
        match self.bar {
            Some(ref bar) => {
                bar.set_message(item.to_string());
                bar.inc(1);
            }
            None => eprintln!("  {} {} ({} total)", self.label, item, self.total),
        }
    }

    /// Finish and clear the bar
    pub fn finish(&self) {
        if let Some(ref bar) = self.bar {
            bar.disable_steady_tick();
            bar.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spinner_non_interactive() {
        let ctx = UiContext::non_interactive();
        let mut spinner = TaskSpinner::new(&ctx);
        spinner.start("Checking /sw.js for a new version...");
        spinner.stop("csi-calculator-v3 is up to date");
        // Should not panic
    }

    #[test]
    fn step_progress_non_interactive() {
        let ctx = UiContext::non_interactive();
        let progress = StepProgress::new(&ctx, "Deleting", 2);
        assert!(progress.bar.is_none());
        progress.advance("csi-calculator-v2");
        progress.advance("csi-calculator-v3");
        progress.finish();
    }
}
