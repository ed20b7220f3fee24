use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status shared by every background worker
///
/// `Stopped` is the initial status. A worker moves to `Started` when it accepts a unit
/// of work and back to `Stopped` once the unit finishes. `Destroyed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerStatus {
    Stopped = 0,
    Started = 1,
    Destroyed = 2,
}

impl WorkerStatus {
    /// Check if this is a terminal status (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Destroyed)
    }
}

impl From<u8> for WorkerStatus {
    fn from(value: u8) -> Self {
        match value {
            0 => WorkerStatus::Stopped,
            1 => WorkerStatus::Started,
            _ => WorkerStatus::Destroyed,
        }
    }
}

impl fmt::Display for WorkerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stopped => write!(f, "STOPPED"),
            Self::Started => write!(f, "STARTED"),
            Self::Destroyed => write!(f, "DESTROYED"),
        }
    }
}

impl Default for WorkerStatus {
    fn default() -> Self {
        Self::Stopped
    }
}
