//! # Working Solution
//!
//! The assignment state the optimizer works on. The orchestration layer never mutates a
//! solution it received from the optimizer; every mutation goes through a
//! [`ProblemFactChange`](crate::solver::ProblemFactChange) applied by the engine.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::task::Task;
use super::user::User;
use crate::constants::PLANNING_USER_ID;

/// Solution score. `init_score` counts (negatively) the tasks not yet placed.
/// Ordered level by level; higher is better.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Score {
    pub init_score: i32,
    pub hard: i64,
    pub soft: i64,
}

impl Score {
    pub fn is_solution_initialized(&self) -> bool {
        self.init_score == 0
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_solution_initialized() {
            write!(f, "{}hard/{}soft", self.hard, self.soft)
        } else {
            write!(f, "{}init/{}hard/{}soft", self.init_score, self.hard, self.soft)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    pub users: Vec<User>,
    /// Tasks added to the problem and not yet placed by the optimizer
    pub unassigned: Vec<Task>,
    pub score: Score,
    /// Last change set applied to this solution
    pub change_set_id: u64,
}

impl Solution {
    pub fn new(users: Vec<User>) -> Self {
        let mut solution = Self {
            users,
            ..Default::default()
        };
        solution.refresh_init_score();
        solution
    }

    pub fn is_initialized(&self) -> bool {
        self.score.is_solution_initialized()
    }

    pub fn planning_user(&self) -> Option<&User> {
        self.user(PLANNING_USER_ID)
    }

    pub fn user(&self, entity_id: &str) -> Option<&User> {
        self.users.iter().find(|user| user.entity_id == entity_id)
    }

    pub fn user_mut(&mut self, entity_id: &str) -> Option<&mut User> {
        self.users.iter_mut().find(|user| user.entity_id == entity_id)
    }

    /// Returns the user with the given id, adding an enabled one when absent
    pub fn ensure_user(&mut self, entity_id: &str) -> &mut User {
        let position = match self
            .users
            .iter()
            .position(|user| user.entity_id == entity_id)
        {
            Some(position) => position,
            None => {
                self.users.push(User::new(entity_id));
                self.users.len() - 1
            }
        };
        &mut self.users[position]
    }

    /// Every task of the solution, placed or not
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.users
            .iter()
            .flat_map(|user| user.tasks.iter())
            .chain(self.unassigned.iter())
    }

    pub fn task_count(&self) -> usize {
        self.tasks().count()
    }

    pub fn is_empty(&self) -> bool {
        self.task_count() == 0
    }

    pub fn find_task(&self, task_id: i64) -> Option<&Task> {
        self.tasks().find(|task| task.id == task_id)
    }

    pub fn find_task_mut(&mut self, task_id: i64) -> Option<&mut Task> {
        self.users
            .iter_mut()
            .flat_map(|user| user.tasks.iter_mut())
            .chain(self.unassigned.iter_mut())
            .find(|task| task.id == task_id)
    }

    /// Detach a task from wherever it currently lives
    pub fn remove_task(&mut self, task_id: i64) -> Option<Task> {
        if let Some(position) = self.unassigned.iter().position(|task| task.id == task_id) {
            return Some(self.unassigned.remove(position));
        }
        self.users
            .iter_mut()
            .find_map(|user| user.remove_task(task_id))
            .map(|mut task| {
                task.user = None;
                task
            })
    }

    /// Move (or add) `task` into the list of `user_id`, creating the user if needed
    pub fn assign_task(&mut self, mut task: Task, user_id: &str, pinned: bool) {
        self.remove_task(task.id);
        task.pinned = pinned;
        self.ensure_user(user_id).insert_task(task);
        self.refresh_init_score();
    }

    /// Queue a task for placement by the optimizer
    pub fn add_unassigned(&mut self, mut task: Task) {
        self.remove_task(task.id);
        task.user = None;
        task.pinned = false;
        self.unassigned.push(task);
        self.refresh_init_score();
    }

    pub fn refresh_init_score(&mut self) {
        self.score.init_score = -(self.unassigned.len() as i32);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::TaskStatus;
    use chrono::Utc;
    use std::collections::BTreeSet;

    fn task(id: i64) -> Task {
        Task {
            id,
            name: format!("task-{id}"),
            status: TaskStatus::Ready,
            priority: 0,
            container_id: "container".to_string(),
            process_id: "process".to_string(),
            process_instance_id: id,
            potential_owners: BTreeSet::new(),
            user: None,
            pinned: false,
            last_modification_date: Utc::now(),
        }
    }

    #[test]
    fn test_unassigned_tasks_make_the_solution_uninitialized() {
        let mut solution = Solution::new(vec![User::planning_user()]);
        assert!(solution.is_initialized());

        solution.add_unassigned(task(1));
        assert!(!solution.is_initialized());
        assert_eq!(solution.score.init_score, -1);

        solution.assign_task(task(1), PLANNING_USER_ID, false);
        assert!(solution.is_initialized());
        assert_eq!(solution.task_count(), 1);
        assert_eq!(
            solution.find_task(1).and_then(|task| task.user.clone()),
            Some(PLANNING_USER_ID.to_string())
        );
    }

    #[test]
    fn test_assign_task_moves_between_users_and_creates_missing_users() {
        let mut solution = Solution::new(vec![User::planning_user()]);
        solution.assign_task(task(1), PLANNING_USER_ID, false);
        solution.assign_task(task(1), "katy", true);

        assert!(solution.planning_user().unwrap().tasks.is_empty());
        let katy = solution.user("katy").unwrap();
        assert_eq!(katy.tasks.len(), 1);
        assert!(katy.tasks[0].pinned);
        assert_eq!(solution.task_count(), 1);
    }

    #[test]
    fn test_remove_task_detaches_owner() {
        let mut solution = Solution::new(vec![User::new("katy")]);
        solution.assign_task(task(7), "katy", false);
        let removed = solution.remove_task(7).unwrap();
        assert!(removed.user.is_none());
        assert!(solution.is_empty());
    }

    #[test]
    fn test_score_display() {
        let score = Score {
            init_score: -2,
            hard: 0,
            soft: -5,
        };
        assert_eq!(score.to_string(), "-2init/0hard/-5soft");
        assert_eq!(Score::default().to_string(), "0hard/0soft");
    }

    #[test]
    fn test_score_ordering() {
        let uninitialized = Score {
            init_score: -1,
            hard: 0,
            soft: 0,
        };
        let broken = Score {
            init_score: 0,
            hard: -1,
            soft: 0,
        };
        let worse = Score {
            init_score: 0,
            hard: 0,
            soft: -3,
        };
        let better = Score { soft: -1, ..worse };
        assert!(uninitialized < broken);
        assert!(broken < worse);
        assert!(worse < better);
    }
}
