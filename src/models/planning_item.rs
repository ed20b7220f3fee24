use serde::{Deserialize, Serialize};

use super::task::{PlanningTask, Task};
use super::user::User;

/// Unit of a published plan: one task and the user it is handed to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlanningItem {
    pub container_id: String,
    pub task_id: i64,
    pub process_instance_id: i64,
    pub assigned_user: String,
    pub index: i32,
    pub published: bool,
}

impl PlanningItem {
    pub fn new(task: &Task, user: &User, index: i32) -> Self {
        Self {
            container_id: task.container_id.clone(),
            task_id: task.id,
            process_instance_id: task.process_instance_id,
            assigned_user: user.entity_id.clone(),
            index,
            published: true,
        }
    }

    pub fn planning_task(&self) -> PlanningTask {
        PlanningTask {
            task_id: self.task_id,
            assigned_user: self.assigned_user.clone(),
            index: self.index,
            published: self.published,
        }
    }
}
