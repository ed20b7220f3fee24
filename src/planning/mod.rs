//! # Planning
//!
//! Builders that translate runtime state into solutions and fact changes, the
//! publish-window planner, and the synchronizer and processor workers.

pub mod changes_builder;
pub mod context;
pub mod processor;
pub mod publish_window;
pub mod solution_builder;
pub mod synchronizer;

pub use changes_builder::SolutionChangesBuilder;
pub use context::PlanningContext;
pub use processor::{SolutionProcessor, SolutionProcessorListener, SolutionProcessorResult};
pub use publish_window::{
    build_planning_items, ListOrderSelection, PrioritySelection, PublishWindowPlanner,
    TaskSelectionStrategy,
};
pub use solution_builder::SolutionBuilder;
pub use synchronizer::{
    truncate_to_seconds, SolutionSynchronizer, SynchronizerResult, SynchronizerResultListener,
    SynchronizerSettings,
};
