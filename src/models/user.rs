use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::task::Task;
use crate::constants::PLANNING_USER_ID;

/// A user as known by the external user directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalUser {
    pub id: String,
    #[serde(default)]
    pub groups: BTreeSet<String>,
}

impl ExternalUser {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            groups: BTreeSet::new(),
        }
    }
}

/// A user inside the working solution, owning an ordered list of tasks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub entity_id: String,
    pub enabled: bool,
    #[serde(default)]
    pub groups: BTreeSet<String>,
    pub tasks: Vec<Task>,
}

impl User {
    pub fn new(entity_id: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            enabled: true,
            groups: BTreeSet::new(),
            tasks: Vec::new(),
        }
    }

    pub fn planning_user() -> Self {
        Self::new(PLANNING_USER_ID)
    }

    pub fn from_external(external: &ExternalUser) -> Self {
        Self {
            entity_id: external.id.clone(),
            enabled: true,
            groups: external.groups.clone(),
            tasks: Vec::new(),
        }
    }

    pub fn is_planning_user(&self) -> bool {
        self.entity_id == PLANNING_USER_ID
    }

    pub fn pinned_count(&self) -> usize {
        self.tasks.iter().filter(|task| task.pinned).count()
    }

    /// Insert a task keeping every pinned task ahead of the non pinned ones.
    /// Pinned tasks go after the last pinned task, the rest are appended.
    pub fn insert_task(&mut self, mut task: Task) {
        task.user = Some(self.entity_id.clone());
        if task.pinned {
            let position = self.pinned_count();
            self.tasks.insert(position, task);
        } else {
            self.tasks.push(task);
        }
    }

    pub fn remove_task(&mut self, task_id: i64) -> Option<Task> {
        let position = self.tasks.iter().position(|task| task.id == task_id)?;
        Some(self.tasks.remove(position))
    }
}
