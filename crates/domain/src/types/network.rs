//! Connectivity state snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Best-known connectivity plus the time it last changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkState {
    pub available: bool,
    pub changed_at: DateTime<Utc>,
}

impl NetworkState {
    pub fn new(available: bool) -> Self {
        Self { available, changed_at: Utc::now() }
    }
}
