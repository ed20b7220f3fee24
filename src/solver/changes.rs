//! # Problem Fact Changes
//!
//! Incremental mutations applied by the engine to its working solution. The
//! orchestration layer never edits a solution directly; it only sends these.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::TaskStatus;
use crate::models::{Solution, Task, User};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemFactChange {
    /// Stamps the change-set id onto the working solution
    ChangeSet(u64),
    /// New task for the optimizer to place
    AddTask(Task),
    /// Move a task into a user's list, optionally pinning it there
    AssignTask {
        task: Task,
        user_id: String,
        pinned: bool,
    },
    /// Task went back to Ready: unpin it and let the optimizer place it again
    ReleaseTask(Task),
    RemoveTask { task_id: i64 },
    TaskPropertyChange {
        task_id: i64,
        priority: Option<i32>,
        status: Option<TaskStatus>,
    },
    AddUser(User),
    DisableUser { user_id: String },
    EnableUser { user_id: String },
}

impl ProblemFactChange {
    /// Short name used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ChangeSet(_) => "change_set",
            Self::AddTask(_) => "add_task",
            Self::AssignTask { .. } => "assign_task",
            Self::ReleaseTask(_) => "release_task",
            Self::RemoveTask { .. } => "remove_task",
            Self::TaskPropertyChange { .. } => "task_property_change",
            Self::AddUser(_) => "add_user",
            Self::DisableUser { .. } => "disable_user",
            Self::EnableUser { .. } => "enable_user",
        }
    }

    pub fn is_change_set_marker(&self) -> bool {
        matches!(self, Self::ChangeSet(_))
    }

    /// Apply this change to the engine's working solution
    pub fn apply(&self, solution: &mut Solution) {
        match self {
            Self::ChangeSet(change_set_id) => {
                solution.change_set_id = *change_set_id;
            }
            Self::AddTask(task) => {
                if solution.find_task(task.id).is_some() {
                    debug!(task_id = task.id, "Task already present, add ignored");
                    return;
                }
                solution.add_unassigned(task.clone());
            }
            Self::AssignTask {
                task,
                user_id,
                pinned,
            } => {
                solution.assign_task(task.clone(), user_id, *pinned);
            }
            Self::ReleaseTask(task) => {
                solution.add_unassigned(task.clone());
            }
            Self::RemoveTask { task_id } => {
                solution.remove_task(*task_id);
                solution.refresh_init_score();
            }
            Self::TaskPropertyChange {
                task_id,
                priority,
                status,
            } => {
                if let Some(task) = solution.find_task_mut(*task_id) {
                    if let Some(priority) = priority {
                        task.priority = *priority;
                    }
                    if let Some(status) = status {
                        task.status = *status;
                    }
                }
            }
            Self::AddUser(user) => match solution.user_mut(&user.entity_id) {
                Some(existing) => {
                    existing.groups = user.groups.clone();
                    existing.enabled = true;
                }
                None => solution.users.push(User {
                    tasks: Vec::new(),
                    ..user.clone()
                }),
            },
            Self::DisableUser { user_id } => {
                if let Some(user) = solution.user_mut(user_id) {
                    user.enabled = false;
                }
            }
            Self::EnableUser { user_id } => {
                if let Some(user) = solution.user_mut(user_id) {
                    user.enabled = true;
                }
            }
        }
    }
}
