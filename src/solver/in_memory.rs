//! # In-Memory Engine
//!
//! Deterministic reference implementation of the engine seam. It applies fact
//! changes as they arrive and runs a least-loaded construction step for tasks
//! that still need a user. There is no search phase.

use crossbeam::channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::changes::ProblemFactChange;
use super::engine::{BestSolutionChangedEvent, BestSolutionListener, Solver, SolverFactory};
use crate::constants::PLANNING_USER_ID;
use crate::error::{PlanningError, PlanningResult};
use crate::models::{Solution, Task};

pub struct InMemorySolver {
    changes_tx: Sender<Vec<ProblemFactChange>>,
    changes_rx: Receiver<Vec<ProblemFactChange>>,
    terminate_tx: Sender<()>,
    terminate_rx: Receiver<()>,
    terminated: AtomicBool,
    listeners: Mutex<Vec<BestSolutionListener>>,
}

impl std::fmt::Debug for InMemorySolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemorySolver")
            .field("pending_batches", &self.changes_rx.len())
            .field("terminated", &self.terminated.load(Ordering::Acquire))
            .field("listeners", &self.listeners.lock().len())
            .finish()
    }
}

impl Default for InMemorySolver {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemorySolver {
    pub fn new() -> Self {
        let (changes_tx, changes_rx) = unbounded();
        let (terminate_tx, terminate_rx) = unbounded();
        Self {
            changes_tx,
            changes_rx,
            terminate_tx,
            terminate_rx,
            terminated: AtomicBool::new(false),
            listeners: Mutex::new(Vec::new()),
        }
    }

    fn emit(&self, solution: &Solution) {
        let event =
            BestSolutionChangedEvent::new(solution.clone(), self.changes_rx.is_empty());
        let listeners = self.listeners.lock().clone();
        for listener in listeners {
            listener(event.clone());
        }
    }

    fn apply_batch(solution: &mut Solution, batch: &[ProblemFactChange]) {
        for change in batch {
            change.apply(solution);
        }
        debug!(
            changes = batch.len(),
            change_set_id = solution.change_set_id,
            "Applied problem fact changes"
        );
    }
}

/// Place every unassigned task with the least loaded enabled user allowed to take it.
/// Tasks nobody can take go to the planning user.
fn construct(solution: &mut Solution) {
    let pending: Vec<Task> = std::mem::take(&mut solution.unassigned);
    for task in pending {
        let target = solution
            .users
            .iter()
            .filter(|user| user.enabled && !user.is_planning_user())
            .filter(|user| task.accepts(&user.entity_id, &user.groups))
            .min_by_key(|user| user.tasks.len())
            .map(|user| user.entity_id.clone())
            .unwrap_or_else(|| PLANNING_USER_ID.to_string());
        solution.assign_task(task, &target, false);
    }
    solution.refresh_init_score();
    rescore(solution);
}

/// hard: non pinned tasks held by users that cannot take them, soft: tasks left in the reservoir
fn rescore(solution: &mut Solution) {
    let mut hard = 0i64;
    let mut soft = 0i64;
    for user in &solution.users {
        if user.is_planning_user() {
            soft -= user.tasks.len() as i64;
            continue;
        }
        hard -= user
            .tasks
            .iter()
            .filter(|task| !task.pinned)
            .filter(|task| !user.enabled || !task.accepts(&user.entity_id, &user.groups))
            .count() as i64;
    }
    solution.score.hard = hard;
    solution.score.soft = soft;
}

impl Solver for InMemorySolver {
    fn solve(&self, problem: Solution) -> PlanningResult<Solution> {
        let mut working = problem;
        if working.planning_user().is_none() {
            return Err(PlanningError::SolverError(
                "Solution has no planning user".to_string(),
            ));
        }

        construct(&mut working);
        info!(
            tasks = working.task_count(),
            users = working.users.len(),
            score = %working.score,
            "In-memory solver started"
        );
        self.emit(&working);

        loop {
            crossbeam::select! {
                recv(self.changes_rx) -> batch => match batch {
                    Ok(batch) => {
                        Self::apply_batch(&mut working, &batch);
                        construct(&mut working);
                        self.emit(&working);
                    }
                    Err(_) => break,
                },
                recv(self.terminate_rx) -> _ => break,
            }
        }

        info!(score = %working.score, "In-memory solver terminated");
        Ok(working)
    }

    fn terminate_early(&self) -> bool {
        if self.terminated.swap(true, Ordering::AcqRel) {
            return false;
        }
        if self.terminate_tx.send(()).is_err() {
            warn!("Terminate signal could not be delivered");
        }
        true
    }

    fn add_problem_fact_changes(&self, changes: Vec<ProblemFactChange>) -> PlanningResult<()> {
        self.changes_tx
            .send(changes)
            .map_err(|error| PlanningError::SolverError(format!("Change queue closed: {error}")))
    }

    fn add_event_listener(&self, listener: BestSolutionListener) {
        self.listeners.lock().push(listener);
    }
}

#[derive(Debug, Default, Clone)]
pub struct InMemorySolverFactory;

impl SolverFactory for InMemorySolverFactory {
    fn build_solver(&self) -> PlanningResult<Arc<dyn Solver>> {
        Ok(Arc::new(InMemorySolver::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::TaskStatus;
    use crate::models::User;
    use chrono::Utc;
    use std::collections::BTreeSet;
    use std::time::Duration;

    fn ready_task(id: i64, owners: &[&str]) -> Task {
        Task {
            id,
            name: format!("task-{id}"),
            status: TaskStatus::Ready,
            priority: 0,
            container_id: "container".to_string(),
            process_id: "process".to_string(),
            process_instance_id: id,
            potential_owners: owners.iter().map(|owner| owner.to_string()).collect(),
            user: None,
            pinned: false,
            last_modification_date: Utc::now(),
        }
    }

    #[test]
    fn test_construct_uses_least_loaded_potential_owner() {
        let mut solution = Solution::new(vec![
            User::planning_user(),
            User::new("katy"),
            User::new("john"),
        ]);
        solution.add_unassigned(ready_task(1, &["katy", "john"]));
        solution.add_unassigned(ready_task(2, &["katy", "john"]));
        solution.add_unassigned(ready_task(3, &["mary"]));

        construct(&mut solution);

        assert!(solution.is_initialized());
        assert_eq!(solution.user("katy").unwrap().tasks.len(), 1);
        assert_eq!(solution.user("john").unwrap().tasks.len(), 1);
        assert_eq!(solution.planning_user().unwrap().tasks[0].id, 3);
        assert_eq!(solution.score.soft, -1);
    }

    #[test]
    fn test_disabled_users_receive_no_new_work() {
        let mut disabled = User::new("katy");
        disabled.enabled = false;
        let mut solution = Solution::new(vec![User::planning_user(), disabled]);
        solution.add_unassigned(ready_task(1, &[]));

        construct(&mut solution);
        assert_eq!(solution.planning_user().unwrap().tasks.len(), 1);
    }

    #[test]
    fn test_solve_emits_events_and_stops_on_terminate() {
        let solver = Arc::new(InMemorySolver::new());
        let (events_tx, events_rx) = std::sync::mpsc::channel();
        solver.add_event_listener(Arc::new(move |event: BestSolutionChangedEvent| {
            let _ = events_tx.send(event);
        }));

        let runner = solver.clone();
        let handle = std::thread::spawn(move || {
            runner.solve(Solution::new(vec![User::planning_user(), User::new("katy")]))
        });

        let first = events_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(first.new_best_solution.is_initialized());
        assert_eq!(first.new_best_solution.change_set_id, 0);

        solver
            .add_problem_fact_changes(vec![
                ProblemFactChange::ChangeSet(1),
                ProblemFactChange::AddTask(ready_task(10, &[])),
            ])
            .unwrap();
        let second = events_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(second.every_problem_fact_change_processed);
        assert_eq!(second.new_best_solution.change_set_id, 1);
        assert_eq!(
            second.new_best_solution.user("katy").unwrap().tasks[0].id,
            10
        );

        assert!(solver.terminate_early());
        assert!(!solver.terminate_early());
        let final_solution = handle.join().unwrap().unwrap();
        assert_eq!(final_solution.task_count(), 1);
    }

    #[test]
    fn test_solve_requires_planning_user() {
        let solver = InMemorySolver::new();
        let result = solver.solve(Solution::new(vec![User::new("katy")]));
        assert!(matches!(result, Err(PlanningError::SolverError(_))));
    }
}
