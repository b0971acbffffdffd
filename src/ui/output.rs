//! Output functions for consistent CLI formatting
//!
//! In plain mode status lines go to stderr, so stdout only carries what a
//! command produces (response bodies, JSON listings).

use super::context::UiContext;
use console::{style, Style};

/// Display intro banner
pub fn intro(ctx: &UiContext, title: &str) {
    if ctx.use_fancy_output() {
        cliclack::intro(style(title).cyan().bold()).ok();
    } else {
        eprintln!("{}", style(title).cyan().bold());
        eprintln!();
    }
}

/// Display success outro
pub fn outro_success(ctx: &UiContext, message: &str) {
    if ctx.use_fancy_output() {
        cliclack::outro(style(message).green().bold()).ok();
    } else {
        eprintln!();
        eprintln!("{} {}", style("[OK]").green(), message);
    }
}

/// Display a note box, e.g. a notification
pub fn note(ctx: &UiContext, title: &str, message: &str) {
    if ctx.use_fancy_output() {
        cliclack::note(title, message).ok();
    } else {
        println!("{}: {}", style(title).bold(), message);
    }
}

/// Display a section header
pub fn section(ctx: &UiContext, title: &str) {
    if ctx.use_fancy_output() {
        println!();
        cliclack::log::info(style(title).bold()).ok();
    } else {
        println!();
        println!("{}", style(title).bold());
    }
}

/// Status line in plain mode
fn plain_step(tag: console::StyledObject<&str>, message: &str) {
    eprintln!("  {} {}", tag, message);
}

/// Display a success step
pub fn step_ok(ctx: &UiContext, message: &str) {
    if ctx.use_fancy_output() {
        cliclack::log::success(message).ok();
    } else {
        plain_step(style("[OK]").green(), message);
    }
}

/// Display a success step with detail
pub fn step_ok_detail(ctx: &UiContext, message: &str, detail: &str) {
    if ctx.use_fancy_output() {
        cliclack::log::success(format!("{} ({})", message, style(detail).dim())).ok();
    } else {
        plain_step(style("[OK]").green(), &format!("{} ({})", message, detail));
    }
}

/// Display a warning step
pub fn step_warn(ctx: &UiContext, message: &str) {
    if ctx.use_fancy_output() {
        cliclack::log::warning(message).ok();
    } else {
        plain_step(style("[WARN]").yellow(), message);
    }
}

/// Display a warning step with hint
pub fn step_warn_hint(ctx: &UiContext, message: &str, hint: &str) {
    if ctx.use_fancy_output() {
        cliclack::log::warning(format!("{} - {}", message, style(hint).dim())).ok();
    } else {
        plain_step(style("[WARN]").yellow(), &format!("{} - {}", message, hint));
    }
}

/// Display an error step with detail
pub fn step_error_detail(ctx: &UiContext, message: &str, detail: &str) {
    if ctx.use_fancy_output() {
        cliclack::log::error(format!("{}: {}", message, style(detail).red())).ok();
    } else {
        plain_step(style("[FAIL]").red(), &format!("{}: {}", message, detail));
    }
}

/// Display an info step
pub fn step_info(ctx: &UiContext, message: &str) {
    if ctx.use_fancy_output() {
        cliclack::log::info(message).ok();
    } else {
        plain_step(style("[INFO]").cyan(), message);
    }
}

/// Display a remark/hint
pub fn remark(ctx: &UiContext, message: &str) {
    if ctx.use_fancy_output() {
        cliclack::log::remark(message).ok();
    } else {
        eprintln!("  {}", style(message).dim());
    }
}

/// Print styled key-value pair
pub fn key_value(ctx: &UiContext, key: &str, value: &str) {
    if ctx.use_fancy_output() {
        println!("  {}: {}", style(key).dim(), value);
    } else {
        println!("  {}: {}", key, value);
    }
}

/// Print key-value, green when `ok`, yellow otherwise
pub fn key_value_status(ctx: &UiContext, key: &str, value: &str, ok: bool) {
    if ctx.use_fancy_output() {
        let value_style = if ok {
            Style::new().green()
        } else {
            Style::new().yellow()
        };
        println!("  {}: {}", style(key).dim(), value_style.apply_to(value));
    } else {
        let prefix = if ok { "[OK]" } else { "[WARN]" };
        println!("  {} {}: {}", prefix, key, value);
    }
}
