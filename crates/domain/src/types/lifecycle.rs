//! Client lifecycle state machine.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle of one client instance. Transitions only move forward:
/// `Active → Destroying → Destroyed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientLifecycleState {
    Active,
    Destroying,
    Destroyed,
}

impl ClientLifecycleState {
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Active, Self::Destroying) | (Self::Destroying, Self::Destroyed)
        )
    }

    pub fn is_active(self) -> bool {
        self == Self::Active
    }
}

impl fmt::Display for ClientLifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Active => "active",
            Self::Destroying => "destroying",
            Self::Destroyed => "destroyed",
        };
        f.write_str(label)
    }
}
