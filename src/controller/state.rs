//! Controller lifecycle state

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of one controller instance.
///
/// ```text
/// installing -> installed -> activating -> activated
///      \            \             \            \
///       +------------+-------------+------------+--> redundant
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControllerState {
    Installing,
    /// Installed and waiting for the previous controller to let go
    Installed,
    Activating,
    /// Serving fetches for its scope
    Activated,
    /// Replaced or failed; terminal
    Redundant,
}

impl ControllerState {
    /// Only an activated controller intercepts fetches
    pub fn can_intercept_fetch(&self) -> bool {
        matches!(self, Self::Activated)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Redundant)
    }

    /// Whether the host may move a controller from `self` to `next`
    pub fn can_transition_to(&self, next: ControllerState) -> bool {
        use ControllerState::*;
        matches!(
            (self, next),
            (Installing, Installed)
                | (Installed, Activating)
                | (Activating, Activated)
                | (Installing | Installed | Activating | Activated, Redundant)
        )
    }
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Installing => "installing",
            Self::Installed => "installed",
            Self::Activating => "activating",
            Self::Activated => "activated",
            Self::Redundant => "redundant",
        };
        write!(f, "{}", name)
    }
}
