//! # System Constants
//!
//! Core constants and status enums that define the operational boundaries of the
//! task assigning planner.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Entity id of the planning reservoir user.
///
/// The reservoir holds the tasks the optimizer has not (yet) handed to a real user,
/// and its tasks are always published in full.
pub const PLANNING_USER_ID: &str = "planninguser";

/// Human task status as reported by the workflow runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Created,
    Ready,
    Reserved,
    InProgress,
    Suspended,
    Completed,
    Failed,
    Error,
    Exited,
    Obsolete,
}

impl TaskStatus {
    /// Statuses a task can be in while it still takes part in the plan
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            Self::Ready | Self::Reserved | Self::InProgress | Self::Suspended
        )
    }

    /// Statuses that carry an actual owner which the plan must respect
    pub fn is_owned(&self) -> bool {
        matches!(self, Self::Reserved | Self::InProgress | Self::Suspended)
    }

    /// Check if this is a terminal status (the task leaves the plan)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::Error | Self::Exited | Self::Obsolete
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "Created"),
            Self::Ready => write!(f, "Ready"),
            Self::Reserved => write!(f, "Reserved"),
            Self::InProgress => write!(f, "InProgress"),
            Self::Suspended => write!(f, "Suspended"),
            Self::Completed => write!(f, "Completed"),
            Self::Failed => write!(f, "Failed"),
            Self::Error => write!(f, "Error"),
            Self::Exited => write!(f, "Exited"),
            Self::Obsolete => write!(f, "Obsolete"),
        }
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Created" => Ok(Self::Created),
            "Ready" => Ok(Self::Ready),
            "Reserved" => Ok(Self::Reserved),
            "InProgress" => Ok(Self::InProgress),
            "Suspended" => Ok(Self::Suspended),
            "Completed" => Ok(Self::Completed),
            "Failed" => Ok(Self::Failed),
            "Error" => Ok(Self::Error),
            "Exited" => Ok(Self::Exited),
            "Obsolete" => Ok(Self::Obsolete),
            _ => Err(format!("Invalid task status: {s}")),
        }
    }
}

/// Status groups used when querying the runtime
pub mod status_groups {
    use super::TaskStatus;

    /// Statuses loaded when a solution is recovered from scratch
    pub const RECOVERY_STATUSES: &[TaskStatus] = &[
        TaskStatus::Ready,
        TaskStatus::Reserved,
        TaskStatus::InProgress,
        TaskStatus::Suspended,
    ];
}

/// How task input variables are read by the runtime when answering a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskInputVariablesReadMode {
    DontRead,
    ReadForAll,
    ReadWhenPlanningTaskIsNull,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_status_groups() {
        assert!(TaskStatus::Ready.is_active());
        assert!(!TaskStatus::Ready.is_owned());
        assert!(TaskStatus::Suspended.is_owned());
        assert!(TaskStatus::Obsolete.is_terminal());
        assert!(!TaskStatus::Created.is_active());
        assert!(status_groups::RECOVERY_STATUSES
            .iter()
            .all(|status| status.is_active()));
    }

    #[test]
    fn test_status_round_trip_through_strings() {
        for status in [
            TaskStatus::Ready,
            TaskStatus::InProgress,
            TaskStatus::Exited,
        ] {
            assert_eq!(TaskStatus::from_str(&status.to_string()).unwrap(), status);
        }
        assert!(TaskStatus::from_str("Unknown").is_err());
    }
}
