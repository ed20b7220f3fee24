//! # Solver Executor
//!
//! Owns and drives the optimization engine. `start` builds a fresh engine and hands
//! the initial solution to the worker loop, which runs the blocking solve on the
//! blocking pool until `stop` requests early termination.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::changes::ProblemFactChange;
use super::engine::{BestSolutionChangedEvent, BestSolutionListener, Solver, SolverFactory};
use crate::error::{PlanningError, PlanningResult};
use crate::lifecycle::{Worker, WorkerLifecycle};
use crate::models::Solution;

pub struct SolverExecutor {
    lifecycle: WorkerLifecycle,
    solver_factory: Arc<dyn SolverFactory>,
    listener: BestSolutionListener,
    /// Engine of the current run, kept so stop/destroy can terminate it
    solver: Mutex<Option<Arc<dyn Solver>>>,
    /// Problem handed over by `start`, taken by the worker loop
    pending_problem: Mutex<Option<Solution>>,
    /// Number of successful starts; identifies the events of each engine
    runs: AtomicU64,
}

impl std::fmt::Debug for SolverExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolverExecutor")
            .field("lifecycle", &self.lifecycle)
            .field("solver_factory", &self.solver_factory)
            .finish()
    }
}

impl SolverExecutor {
    pub fn new(solver_factory: Arc<dyn SolverFactory>, listener: BestSolutionListener) -> Self {
        Self {
            lifecycle: WorkerLifecycle::new("SolverExecutor"),
            solver_factory,
            listener,
            solver: Mutex::new(None),
            pending_problem: Mutex::new(None),
            runs: AtomicU64::new(0),
        }
    }

    /// Build a new engine and start solving `solution`. Returns the run number the
    /// engine's events are stamped with.
    ///
    /// Fails when not STOPPED. A build failure leaves the executor STOPPED and is
    /// returned to the caller.
    pub fn start(&self, solution: Solution) -> PlanningResult<u64> {
        self.lifecycle.begin("start")?;

        let solver = match self.solver_factory.build_solver() {
            Ok(solver) => solver,
            Err(error) => {
                self.lifecycle.abort_start();
                error!(error = %error, "Solver could not be built, executor stays stopped");
                return Err(error);
            }
        };
        let solver_run = self.runs.fetch_add(1, Ordering::AcqRel) + 1;
        let listener = self.listener.clone();
        solver.add_event_listener(Arc::new(move |event: BestSolutionChangedEvent| {
            listener(event.with_solver_run(solver_run))
        }));

        info!(
            executor_id = %self.lifecycle.id(),
            solver_run = solver_run,
            tasks = solution.task_count(),
            users = solution.users.len(),
            "🚀 Starting solver"
        );
        *self.solver.lock() = Some(solver);
        *self.pending_problem.lock() = Some(solution);
        self.lifecycle.release_permit();
        Ok(solver_run)
    }

    /// Request early termination; the executor becomes STOPPED once the solve returns
    pub fn stop(&self) {
        if !self.lifecycle.is_started() {
            info!(status = %self.lifecycle.status(), "Solver executor not started, stop ignored");
            return;
        }
        self.terminate_solver();
    }

    pub fn add_problem_fact_changes(&self, changes: Vec<ProblemFactChange>) -> PlanningResult<()> {
        self.lifecycle.require_started("addProblemFactChanges")?;
        let solver = self.solver.lock().clone().ok_or_else(|| {
            PlanningError::InvalidState("SolverExecutor has no running solver".to_string())
        })?;
        debug!(changes = changes.len(), "Forwarding problem fact changes to solver");
        solver.add_problem_fact_changes(changes)
    }

    pub fn destroy(&self) {
        self.lifecycle.destroy();
        self.terminate_solver();
    }

    pub fn is_started(&self) -> bool {
        self.lifecycle.is_started()
    }

    pub fn is_stopped(&self) -> bool {
        self.lifecycle.is_stopped()
    }

    pub fn is_destroyed(&self) -> bool {
        self.lifecycle.is_destroyed()
    }

    fn terminate_solver(&self) {
        if let Some(solver) = self.solver.lock().clone() {
            if solver.terminate_early() {
                info!("Solver early termination requested");
            }
        }
    }
}

#[async_trait]
impl Worker for SolverExecutor {
    fn lifecycle(&self) -> &WorkerLifecycle {
        &self.lifecycle
    }

    async fn run_once(&self) {
        let solver = self.solver.lock().clone();
        let problem = self.pending_problem.lock().take();
        let (Some(solver), Some(problem)) = (solver, problem) else {
            warn!("Solver executor started without a problem");
            self.lifecycle.finish();
            return;
        };

        if self.lifecycle.is_alive() {
            match tokio::task::spawn_blocking(move || solver.solve(problem)).await {
                Ok(Ok(solution)) => {
                    info!(score = %solution.score, "Solver finished");
                }
                Ok(Err(error)) => {
                    error!(error = %error, "Solver failed");
                }
                Err(join_error) => {
                    error!(error = %PlanningError::from(join_error), "Solver thread failed");
                }
            }
        }

        *self.solver.lock() = None;
        self.lifecycle.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::run_worker;
    use crate::models::User;
    use crate::solver::in_memory::InMemorySolverFactory;
    use std::time::Duration;

    #[derive(Debug)]
    struct FailingFactory;

    impl SolverFactory for FailingFactory {
        fn build_solver(&self) -> PlanningResult<Arc<dyn Solver>> {
            Err(PlanningError::SolverError("no solver config".to_string()))
        }
    }

    fn noop_listener() -> BestSolutionListener {
        Arc::new(|_event: BestSolutionChangedEvent| {})
    }

    fn initial_solution() -> Solution {
        Solution::new(vec![User::planning_user()])
    }

    async fn wait_until_stopped(executor: &SolverExecutor) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !executor.is_stopped() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("executor should stop");
    }

    #[test]
    fn test_build_failure_leaves_executor_stopped() {
        let executor = SolverExecutor::new(Arc::new(FailingFactory), noop_listener());
        let error = executor.start(initial_solution()).unwrap_err();
        assert_eq!(
            error,
            PlanningError::SolverError("no solver config".to_string())
        );
        assert!(executor.is_stopped());
    }

    #[test]
    fn test_add_problem_fact_changes_requires_started() {
        let executor = SolverExecutor::new(Arc::new(InMemorySolverFactory), noop_listener());
        let error = executor.add_problem_fact_changes(vec![]).unwrap_err();
        assert!(error.is_invalid_state());
        assert!(error
            .to_string()
            .contains("addProblemFactChanges method can only be invoked when the status is STARTED"));
    }

    #[tokio::test]
    async fn test_start_twice_fails_and_stop_returns_to_stopped() {
        let executor = Arc::new(SolverExecutor::new(
            Arc::new(InMemorySolverFactory),
            noop_listener(),
        ));
        let handle = tokio::spawn(run_worker(executor.clone()));

        assert_eq!(executor.start(initial_solution()).unwrap(), 1);
        let error = executor.start(initial_solution()).unwrap_err();
        assert_eq!(
            error.to_string(),
            "Invalid state: SolverExecutor start method can only be invoked when the status is STOPPED"
        );

        executor.stop();
        wait_until_stopped(&executor).await;

        // A stopped executor can be started again with a new engine
        assert_eq!(executor.start(initial_solution()).unwrap(), 2);
        executor.destroy();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("worker loop should exit")
            .unwrap();
        assert!(executor.is_destroyed());
    }

    #[tokio::test]
    async fn test_events_are_stamped_with_the_solver_run() {
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = received.clone();
        let executor = Arc::new(SolverExecutor::new(
            Arc::new(InMemorySolverFactory),
            Arc::new(move |event: BestSolutionChangedEvent| sink.lock().push(event.solver_run)),
        ));
        let handle = tokio::spawn(run_worker(executor.clone()));

        let solver_run = executor.start(initial_solution()).unwrap();
        tokio::time::timeout(Duration::from_secs(5), async {
            while received.lock().is_empty() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("initial solution event");
        assert_eq!(received.lock()[0], solver_run);

        executor.destroy();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("worker loop should exit")
            .unwrap();
    }

    #[test]
    fn test_stop_when_not_started_is_a_no_op() {
        let executor = SolverExecutor::new(Arc::new(InMemorySolverFactory), noop_listener());
        executor.stop();
        assert!(executor.is_stopped());
    }
}
