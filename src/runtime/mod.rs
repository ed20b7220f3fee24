//! # External Collaborators
//!
//! Seams towards the workflow runtime and the user directory.

pub mod client;
pub mod delegate;
pub mod user_system;

pub use client::{
    PlanningErrorCode, PlanningExecutionResult, RuntimeClient, TaskQuery, TaskQueryPage,
};
pub use delegate::{FindTasksResult, RuntimeDelegate, DEFAULT_PAGE_SIZE};
pub use user_system::{StaticUserSystemService, UserSystemService};
