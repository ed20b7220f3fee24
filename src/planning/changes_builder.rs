//! # Solution Changes Builder
//!
//! Computes the fact changes that bring the working solution in line with a batch
//! of updated runtime task data and, optionally, a fresh copy of the user directory.

use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::constants::{TaskStatus, PLANNING_USER_ID};
use crate::models::{ExternalUser, Solution, Task, TaskData, User};
use crate::solver::ProblemFactChange;

#[derive(Debug)]
pub struct SolutionChangesBuilder<'a> {
    solution: &'a Solution,
    tasks: &'a [TaskData],
    users_update: Option<&'a [ExternalUser]>,
    directory: &'a [ExternalUser],
}

/// Pending assignment, ordered per user by planning index
struct Assignment {
    index: Option<i32>,
    change: ProblemFactChange,
    task_id: i64,
}

impl<'a> SolutionChangesBuilder<'a> {
    pub fn new(solution: &'a Solution) -> Self {
        Self {
            solution,
            tasks: &[],
            users_update: None,
            directory: &[],
        }
    }

    pub fn with_tasks(mut self, tasks: &'a [TaskData]) -> Self {
        self.tasks = tasks;
        self
    }

    /// Full directory listing; users missing from it get disabled
    pub fn with_users_update(mut self, users: &'a [ExternalUser]) -> Self {
        self.users_update = Some(users);
        self
    }

    /// Last known directory, used to resolve owners the solution does not know yet
    pub fn with_directory(mut self, users: &'a [ExternalUser]) -> Self {
        self.directory = users;
        self
    }

    pub fn build(self) -> Vec<ProblemFactChange> {
        let mut removals = Vec::new();
        let mut releases = Vec::new();
        let mut assignments: BTreeMap<String, Vec<Assignment>> = BTreeMap::new();
        let mut property_changes = Vec::new();
        let mut additions = Vec::new();
        let mut new_owners = BTreeSet::new();

        for data in self.tasks {
            let Some(existing) = self.solution.find_task(data.task_id) else {
                match data.status {
                    TaskStatus::Ready => additions.push(ProblemFactChange::AddTask(
                        Task::from_task_data(data),
                    )),
                    status if status.is_owned() => {
                        if let Some(owner) = data.actual_owner.as_deref() {
                            self.push_assignment(&mut assignments, data, owner);
                            new_owners.insert(owner.to_string());
                        }
                    }
                    _ => {}
                }
                continue;
            };

            match data.status {
                TaskStatus::Ready if existing.status != TaskStatus::Ready => {
                    releases.push(ProblemFactChange::ReleaseTask(Task::from_task_data(data)));
                    continue;
                }
                status if status.is_owned() => match data.actual_owner.as_deref() {
                    None => {
                        removals.push(ProblemFactChange::RemoveTask {
                            task_id: data.task_id,
                        });
                        continue;
                    }
                    Some(owner) if existing.user.as_deref() != Some(owner) => {
                        self.push_assignment(&mut assignments, data, owner);
                        new_owners.insert(owner.to_string());
                        continue;
                    }
                    Some(owner) if data.is_published() && !existing.pinned => {
                        self.push_assignment(&mut assignments, data, owner);
                        continue;
                    }
                    Some(_) => {}
                },
                status if status.is_terminal() => {
                    removals.push(ProblemFactChange::RemoveTask {
                        task_id: data.task_id,
                    });
                    continue;
                }
                _ => {}
            }

            let priority = (existing.priority != data.priority).then_some(data.priority);
            let status = (existing.status != data.status).then_some(data.status);
            if priority.is_some() || status.is_some() {
                property_changes.push(ProblemFactChange::TaskPropertyChange {
                    task_id: data.task_id,
                    priority,
                    status,
                });
            }
        }

        let user_changes = self.user_changes(&new_owners);

        let mut changes = removals;
        changes.extend(releases);
        for (_, mut user_assignments) in assignments {
            user_assignments.sort_by(|a, b| {
                a.index
                    .unwrap_or(i32::MAX)
                    .cmp(&b.index.unwrap_or(i32::MAX))
                    .then_with(|| a.task_id.cmp(&b.task_id))
            });
            changes.extend(user_assignments.into_iter().map(|assignment| assignment.change));
        }
        changes.extend(property_changes);
        changes.extend(additions);
        changes.extend(user_changes);

        debug!(
            tasks = self.tasks.len(),
            changes = changes.len(),
            "Solution changes calculated"
        );
        changes
    }

    fn push_assignment(
        &self,
        assignments: &mut BTreeMap<String, Vec<Assignment>>,
        data: &TaskData,
        owner: &str,
    ) {
        assignments
            .entry(owner.to_string())
            .or_default()
            .push(Assignment {
                index: data.planning_index(),
                task_id: data.task_id,
                change: ProblemFactChange::AssignTask {
                    task: Task::from_task_data(data),
                    user_id: owner.to_string(),
                    pinned: true,
                },
            });
    }

    fn lookup_external(&self, user_id: &str) -> Option<&ExternalUser> {
        self.users_update
            .unwrap_or(self.directory)
            .iter()
            .find(|user| user.id == user_id)
    }

    fn user_changes(&self, new_owners: &BTreeSet<String>) -> Vec<ProblemFactChange> {
        let mut changes = Vec::new();
        let mut added = BTreeSet::new();

        for owner in new_owners {
            if self.solution.user(owner).is_some() {
                continue;
            }
            let user = self
                .lookup_external(owner)
                .map(User::from_external)
                .unwrap_or_else(|| User::new(owner.clone()));
            added.insert(owner.clone());
            changes.push(ProblemFactChange::AddUser(user));
        }

        let Some(update) = self.users_update else {
            return changes;
        };

        for external in update {
            if external.id == PLANNING_USER_ID || added.contains(&external.id) {
                continue;
            }
            match self.solution.user(&external.id) {
                None => changes.push(ProblemFactChange::AddUser(User::from_external(external))),
                Some(user) if user.groups != external.groups => {
                    changes.push(ProblemFactChange::AddUser(User::from_external(external)))
                }
                Some(user) if !user.enabled => changes.push(ProblemFactChange::EnableUser {
                    user_id: user.entity_id.clone(),
                }),
                Some(_) => {}
            }
        }

        let listed: BTreeSet<&str> = update.iter().map(|user| user.id.as_str()).collect();
        for user in &self.solution.users {
            if user.enabled && !user.is_planning_user() && !listed.contains(user.entity_id.as_str())
            {
                changes.push(ProblemFactChange::DisableUser {
                    user_id: user.entity_id.clone(),
                });
            }
        }
        changes
    }
}
