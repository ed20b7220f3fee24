use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::constants::TaskStatus;

/// Planning information the runtime keeps for a task once a plan touched it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanningTask {
    pub task_id: i64,
    pub assigned_user: String,
    /// Position of the task within the published list of its user
    pub index: i32,
    pub published: bool,
}

/// Runtime view of a human task, as returned by a task query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskData {
    pub task_id: i64,
    pub name: String,
    pub status: TaskStatus,
    pub priority: i32,
    pub container_id: String,
    pub process_id: String,
    pub process_instance_id: i64,
    pub actual_owner: Option<String>,
    #[serde(default)]
    pub potential_owners: BTreeSet<String>,
    pub last_modification_date: DateTime<Utc>,
    pub planning_task: Option<PlanningTask>,
}

impl TaskData {
    /// Whether the runtime already exposed this task's assignment to its audience
    pub fn is_published(&self) -> bool {
        self.planning_task
            .as_ref()
            .map_or(true, |planning_task| planning_task.published)
    }

    /// Planning index reported by the runtime, if the task was ever planned
    pub fn planning_index(&self) -> Option<i32> {
        self.planning_task
            .as_ref()
            .map(|planning_task| planning_task.index)
            .filter(|index| *index >= 0)
    }
}

/// A task inside the working solution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub name: String,
    pub status: TaskStatus,
    pub priority: i32,
    pub container_id: String,
    pub process_id: String,
    pub process_instance_id: i64,
    #[serde(default)]
    pub potential_owners: BTreeSet<String>,
    /// Entity id of the user whose list currently holds the task
    pub user: Option<String>,
    /// Pinned tasks keep their assignment and are never withheld from a plan
    pub pinned: bool,
    pub last_modification_date: DateTime<Utc>,
}

impl Task {
    pub fn from_task_data(data: &TaskData) -> Self {
        Self {
            id: data.task_id,
            name: data.name.clone(),
            status: data.status,
            priority: data.priority,
            container_id: data.container_id.clone(),
            process_id: data.process_id.clone(),
            process_instance_id: data.process_instance_id,
            potential_owners: data.potential_owners.clone(),
            user: None,
            pinned: false,
            last_modification_date: data.last_modification_date,
        }
    }

    /// Whether `user_id` or one of `groups` is allowed to work on this task.
    /// A task without potential owners can go to anybody.
    pub fn accepts(&self, user_id: &str, groups: &BTreeSet<String>) -> bool {
        self.potential_owners.is_empty()
            || self.potential_owners.contains(user_id)
            || !self.potential_owners.is_disjoint(groups)
    }
}
