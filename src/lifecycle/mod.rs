//! # Worker Lifecycle
//!
//! STOPPED → STARTED → STOPPED → … → DESTROYED state machine shared by the solver
//! executor, the solution synchronizer and the solution processor.

pub mod status;
pub mod worker;

pub use status::WorkerStatus;
pub use worker::{run_worker, Worker, WorkerLifecycle};
