//! # Solution Builder
//!
//! Builds the initial solution from a full runtime snapshot and the user directory.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::debug;

use crate::constants::{TaskStatus, PLANNING_USER_ID};
use crate::models::{ExternalUser, Solution, Task, TaskData, User};

#[derive(Debug, Default)]
pub struct SolutionBuilder {
    tasks: Vec<TaskData>,
    users: Vec<ExternalUser>,
}

struct Placement {
    task: Task,
    index: Option<i32>,
}

impl SolutionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tasks(mut self, tasks: Vec<TaskData>) -> Self {
        self.tasks = tasks;
        self
    }

    pub fn with_users(mut self, users: Vec<ExternalUser>) -> Self {
        self.users = users;
        self
    }

    pub fn build(self) -> Solution {
        let mut users = vec![User::planning_user()];
        users.extend(
            self.users
                .iter()
                .filter(|external| external.id != PLANNING_USER_ID)
                .map(User::from_external),
        );

        let mut unassigned = Vec::new();
        let mut placements: BTreeMap<String, Vec<Placement>> = BTreeMap::new();

        for data in &self.tasks {
            match data.status {
                TaskStatus::Ready => unassigned.push(Task::from_task_data(data)),
                TaskStatus::Reserved | TaskStatus::InProgress | TaskStatus::Suspended => {
                    let Some(owner) = data.actual_owner.as_deref() else {
                        debug!(task_id = data.task_id, status = %data.status, "Owned task without actual owner ignored");
                        continue;
                    };
                    let mut task = Task::from_task_data(data);
                    task.pinned = data.status != TaskStatus::Reserved || data.is_published();
                    placements
                        .entry(owner.to_string())
                        .or_default()
                        .push(Placement {
                            task,
                            index: data.planning_index(),
                        });
                }
                _ => {}
            }
        }

        for (owner, mut owned) in placements {
            owned.sort_by(compare_placements);
            if !users.iter().any(|user| user.entity_id == owner) {
                // Owners unknown to the directory are added by convention
                users.push(User::new(owner.clone()));
            }
            if let Some(user) = users.iter_mut().find(|user| user.entity_id == owner) {
                for placement in owned {
                    let mut task = placement.task;
                    task.user = Some(owner.clone());
                    user.tasks.push(task);
                }
            }
        }

        let mut solution = Solution::new(users);
        solution.unassigned = unassigned;
        solution.refresh_init_score();
        solution.change_set_id = 0;
        solution
    }
}

/// Pinned first, then planning index (unknown last), then task id
fn compare_placements(a: &Placement, b: &Placement) -> Ordering {
    b.task
        .pinned
        .cmp(&a.task.pinned)
        .then_with(|| match (a.index, b.index) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.task.id.cmp(&b.task.id))
}
