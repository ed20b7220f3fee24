//! # Planning Data Model
//!
//! Tasks, users and the working solution the optimizer improves, plus the
//! runtime-facing shapes (task data and planning items) exchanged with the
//! workflow runtime.

pub mod planning_item;
pub mod solution;
pub mod task;
pub mod user;

pub use planning_item::PlanningItem;
pub use solution::{Score, Solution};
pub use task::{PlanningTask, Task, TaskData};
pub use user::{ExternalUser, User};
