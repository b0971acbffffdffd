//! Interactive vs plain output detection

use std::io::IsTerminal;

/// Environment variables set by common CI systems
const CI_VARS: &[&str] = &[
    "CI",
    "GITHUB_ACTIONS",
    "GITLAB_CI",
    "CIRCLECI",
    "BUILDKITE",
    "JENKINS_URL",
    "TF_BUILD",
];

/// Decides how the CLI talks to the user
#[derive(Debug, Clone)]
pub struct UiContext {
    interactive: bool,
    auto_yes: bool,
}

impl UiContext {
    /// Detect from the current terminal and environment
    pub fn detect() -> Self {
        Self {
            interactive: Self::detect_interactive(),
            auto_yes: false,
        }
    }

    /// Plain output, no prompts
    pub fn non_interactive() -> Self {
        Self {
            interactive: false,
            auto_yes: false,
        }
    }

    /// Approve prompts without asking (`--yes`)
    pub fn with_auto_yes(mut self, yes: bool) -> Self {
        self.auto_yes = yes;
        self
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    pub fn auto_yes(&self) -> bool {
        self.auto_yes
    }

    /// Spinners, progress bars and cliclack boxes
    pub fn use_fancy_output(&self) -> bool {
        self.interactive
    }

    fn detect_interactive() -> bool {
        // Piping `fetch` output keeps status lines plain
        let terminals = std::io::stdout().is_terminal()
            && std::io::stderr().is_terminal()
            && std::io::stdin().is_terminal();

        terminals && !CI_VARS.iter().any(|var| std::env::var_os(var).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_interactive_context() {
        let ctx = UiContext::non_interactive();
        assert!(!ctx.is_interactive());
        assert!(!ctx.use_fancy_output());
        assert!(!ctx.auto_yes());
    }

    #[test]
    fn with_auto_yes() {
        let ctx = UiContext::non_interactive().with_auto_yes(true);
        assert!(ctx.auto_yes());
    }
}
