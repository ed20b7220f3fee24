//! # Solver
//!
//! Engine seam, the fact changes it consumes, the executor that drives it and an
//! in-memory reference engine.

pub mod changes;
pub mod engine;
pub mod executor;
pub mod in_memory;

pub use changes::ProblemFactChange;
pub use engine::{BestSolutionChangedEvent, BestSolutionListener, Solver, SolverFactory};
pub use executor::SolverExecutor;
pub use in_memory::{InMemorySolver, InMemorySolverFactory};
