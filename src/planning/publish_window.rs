//! # Publish Window Planner
//!
//! Extracts the bounded plan handed to the runtime from a solution. For every regular
//! user the plan holds all pinned tasks plus up to `window_size - pinned` non pinned
//! tasks. The planning user's tasks are always published in full.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::models::{PlanningItem, Solution, Task, User};

/// Decides which non pinned tasks fill the remaining capacity of a user's window
pub trait TaskSelectionStrategy: Send + Sync + fmt::Debug {
    /// Reorder `candidates` (given in list order); the first ones win the window
    fn order(&self, user: &User, candidates: &mut [&Task]);
}

/// Keeps the user's list order
#[derive(Debug, Default, Clone, Copy)]
pub struct ListOrderSelection;

impl TaskSelectionStrategy for ListOrderSelection {
    fn order(&self, _user: &User, _candidates: &mut [&Task]) {}
}

/// Highest priority first, list order among equal priorities
#[derive(Debug, Default, Clone, Copy)]
pub struct PrioritySelection;

impl TaskSelectionStrategy for PrioritySelection {
    fn order(&self, _user: &User, candidates: &mut [&Task]) {
        candidates.sort_by(|a, b| b.priority.cmp(&a.priority));
    }
}

#[derive(Debug, Clone)]
pub struct PublishWindowPlanner {
    window_size: usize,
    strategy: Arc<dyn TaskSelectionStrategy>,
}

impl PublishWindowPlanner {
    pub fn new(window_size: usize) -> Self {
        Self {
            window_size,
            strategy: Arc::new(ListOrderSelection),
        }
    }

    pub fn with_strategy(mut self, strategy: Arc<dyn TaskSelectionStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn plan(&self, solution: &Solution) -> Vec<PlanningItem> {
        let mut items = Vec::new();
        for user in &solution.users {
            let published = self.published_tasks(user);
            items.extend(
                published
                    .into_iter()
                    .enumerate()
                    .map(|(index, task)| PlanningItem::new(task, user, index as i32)),
            );
        }
        items
    }

    /// Published tasks of one user, in list order
    fn published_tasks<'a>(&self, user: &'a User) -> Vec<&'a Task> {
        if user.is_planning_user() {
            return user.tasks.iter().collect();
        }

        let capacity = self.window_size.saturating_sub(user.pinned_count());
        let mut candidates: Vec<&Task> = user.tasks.iter().filter(|task| !task.pinned).collect();
        self.strategy.order(user, &mut candidates);
        let selected: HashSet<i64> = candidates
            .into_iter()
            .take(capacity)
            .map(|task| task.id)
            .collect();

        user.tasks
            .iter()
            .filter(|task| task.pinned || selected.contains(&task.id))
            .collect()
    }
}

/// Plan with the default list-order selection
pub fn build_planning_items(solution: &Solution, window_size: usize) -> Vec<PlanningItem> {
    PublishWindowPlanner::new(window_size).plan(solution)
}
