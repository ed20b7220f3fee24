#![allow(clippy::doc_markdown)] // Allow technical terms in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Tasker Planning
//!
//! Continuous re-planning orchestrator for a task assignment optimizer.
//!
//! ## Overview
//!
//! A set of cooperating background workers keeps a constraint-based assignment engine
//! fed with live task and user data from a workflow runtime, extracts bounded
//! execution plans from its continuously improving solutions, and pushes those plans
//! back to the runtime. Transient data-source failures are retried, and at most one
//! plan publication is in flight at a time.
//!
//! ## Architecture
//!
//! - **Solver executor**: owns the optimization engine and runs its blocking solve
//! - **Solution synchronizer**: recovers solutions and polls the runtime for deltas
//! - **Solution processor**: publishes the plan of a solution to the runtime
//! - **Orchestrator**: serial event actor deduplicating solutions by change-set id
//!
//! ## Module Organization
//!
//! - [`lifecycle`] - Worker state machine and worker loop
//! - [`models`] - Tasks, users, solutions and planning items
//! - [`solver`] - Engine seam, fact changes, executor and in-memory engine
//! - [`runtime`] - Workflow runtime and user directory seams
//! - [`planning`] - Builders, publish window, synchronizer and processor
//! - [`orchestrator`] - Wiring and event handling
//! - [`config`] - Configuration management
//! - [`error`] - Structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tasker_planning::config::PlanningConfig;
//! use tasker_planning::orchestrator::PlanningOrchestrator;
//! use tasker_planning::runtime::{RuntimeClient, StaticUserSystemService};
//! use tasker_planning::solver::InMemorySolverFactory;
//!
//! # async fn example(runtime: Arc<dyn RuntimeClient>) -> Result<(), Box<dyn std::error::Error>> {
//! tasker_planning::logging::init_structured_logging();
//!
//! let orchestrator = PlanningOrchestrator::new(
//!     PlanningConfig::load()?,
//!     Arc::new(InMemorySolverFactory),
//!     runtime,
//!     Arc::new(StaticUserSystemService::default()),
//! )?;
//! orchestrator.start().await?;
//! // ...
//! orchestrator.destroy().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod models;
pub mod orchestrator;
pub mod planning;
pub mod runtime;
pub mod solver;

pub use config::PlanningConfig;
pub use constants::{status_groups, TaskInputVariablesReadMode, TaskStatus, PLANNING_USER_ID};
pub use error::{PlanningError, PlanningResult};
pub use lifecycle::{Worker, WorkerLifecycle, WorkerStatus};
pub use models::{ExternalUser, PlanningItem, PlanningTask, Score, Solution, Task, TaskData, User};
pub use orchestrator::{
    OrchestratorEvent, PlanningEventHandler, PlanningOrchestrator, PublicationTiming,
};
pub use planning::{
    build_planning_items, PlanningContext, PublishWindowPlanner, SolutionBuilder,
    SolutionChangesBuilder, SolutionProcessor, SolutionProcessorResult, SolutionSynchronizer,
    SynchronizerResult,
};
pub use runtime::{
    FindTasksResult, PlanningErrorCode, PlanningExecutionResult, RuntimeClient, RuntimeDelegate,
    UserSystemService,
};
pub use solver::{
    BestSolutionChangedEvent, ProblemFactChange, Solver, SolverExecutor, SolverFactory,
};
