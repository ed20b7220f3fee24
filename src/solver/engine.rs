//! # Optimization Engine Seam
//!
//! The optimizer is opaque to the orchestration layer. It accepts an initial
//! problem, incremental fact changes, and reports improved solutions through
//! registered listeners.

use std::fmt;
use std::sync::Arc;

use super::changes::ProblemFactChange;
use crate::error::PlanningResult;
use crate::models::Solution;

/// Raised by the engine each time it finds a better solution
#[derive(Debug, Clone, PartialEq)]
pub struct BestSolutionChangedEvent {
    pub new_best_solution: Solution,
    /// False while fact changes are still queued inside the engine
    pub every_problem_fact_change_processed: bool,
    /// Executor run of the engine that raised the event. Engines leave it at 0, the
    /// [`SolverExecutor`](super::SolverExecutor) stamps it before delivery.
    pub solver_run: u64,
}

impl BestSolutionChangedEvent {
    pub fn new(new_best_solution: Solution, every_problem_fact_change_processed: bool) -> Self {
        Self {
            new_best_solution,
            every_problem_fact_change_processed,
            solver_run: 0,
        }
    }

    pub fn with_solver_run(mut self, solver_run: u64) -> Self {
        self.solver_run = solver_run;
        self
    }
}

/// Callback invoked from the engine thread for every improved solution
pub type BestSolutionListener = Arc<dyn Fn(BestSolutionChangedEvent) + Send + Sync>;

/// A running optimization engine.
///
/// `solve` blocks the calling thread until `terminate_early` is requested; every other
/// method must be callable concurrently from other threads while `solve` runs.
pub trait Solver: Send + Sync {
    fn solve(&self, problem: Solution) -> PlanningResult<Solution>;

    /// Request the solve loop to return. Returns false if termination was already requested.
    fn terminate_early(&self) -> bool;

    /// Queue fact changes; never blocks on the solve loop
    fn add_problem_fact_changes(&self, changes: Vec<ProblemFactChange>) -> PlanningResult<()>;

    fn add_event_listener(&self, listener: BestSolutionListener);
}

/// Builds a fresh engine for every start of the executor
pub trait SolverFactory: Send + Sync + fmt::Debug {
    fn build_solver(&self) -> PlanningResult<Arc<dyn Solver>>;
}
