//! # Solution Processor
//!
//! Publishes plans. Only one plan can be in flight: `process` is rejected until the
//! previous publication completed and its result was delivered.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::publish_window::PublishWindowPlanner;
use crate::error::{PlanningError, PlanningResult};
use crate::lifecycle::{Worker, WorkerLifecycle};
use crate::models::Solution;
use crate::runtime::{PlanningExecutionResult, RuntimeDelegate};

#[derive(Debug, Clone, PartialEq)]
pub enum SolutionProcessorResult {
    /// The runtime answered, successfully or with a structured error
    Executed {
        solution: Solution,
        execution: PlanningExecutionResult,
    },
    /// The runtime call itself failed
    Failed {
        solution: Solution,
        error: PlanningError,
    },
}

impl SolutionProcessorResult {
    pub fn solution(&self) -> &Solution {
        match self {
            Self::Executed { solution, .. } | Self::Failed { solution, .. } => solution,
        }
    }

    pub fn into_solution(self) -> Solution {
        match self {
            Self::Executed { solution, .. } | Self::Failed { solution, .. } => solution,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Executed { execution, .. } if !execution.has_error())
    }
}

pub type SolutionProcessorListener = Arc<dyn Fn(SolutionProcessorResult) + Send + Sync>;

pub struct SolutionProcessor {
    lifecycle: WorkerLifecycle,
    delegate: RuntimeDelegate,
    planner: PublishWindowPlanner,
    target_user_id: String,
    listener: SolutionProcessorListener,
    pending_solution: Mutex<Option<Solution>>,
}

impl std::fmt::Debug for SolutionProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolutionProcessor")
            .field("lifecycle", &self.lifecycle)
            .field("planner", &self.planner)
            .field("target_user_id", &self.target_user_id)
            .finish()
    }
}

impl SolutionProcessor {
    pub fn new(
        delegate: RuntimeDelegate,
        planner: PublishWindowPlanner,
        target_user_id: impl Into<String>,
        listener: SolutionProcessorListener,
    ) -> Self {
        Self {
            lifecycle: WorkerLifecycle::new("SolutionProcessor"),
            delegate,
            planner,
            target_user_id: target_user_id.into(),
            listener,
            pending_solution: Mutex::new(None),
        }
    }

    /// Publish the plan of `solution`; fails while a previous plan is in flight
    pub fn process(&self, solution: Solution) -> PlanningResult<()> {
        self.lifecycle.begin("process")?;
        *self.pending_solution.lock() = Some(solution);
        self.lifecycle.release_permit();
        Ok(())
    }

    pub fn destroy(&self) {
        self.lifecycle.destroy();
    }

    pub fn is_stopped(&self) -> bool {
        self.lifecycle.is_stopped()
    }

    pub fn is_destroyed(&self) -> bool {
        self.lifecycle.is_destroyed()
    }
}

#[async_trait]
impl Worker for SolutionProcessor {
    fn lifecycle(&self) -> &WorkerLifecycle {
        &self.lifecycle
    }

    async fn run_once(&self) {
        let Some(solution) = self.pending_solution.lock().take() else {
            self.lifecycle.finish();
            return;
        };
        if !self.lifecycle.is_alive() {
            return;
        }

        let items = self.planner.plan(&solution);
        info!(
            items = items.len(),
            window_size = self.planner.window_size(),
            change_set_id = solution.change_set_id,
            target_user_id = %self.target_user_id,
            "📤 Publishing plan"
        );

        let result = match self
            .delegate
            .execute_planning(items, &self.target_user_id)
            .await
        {
            Ok(execution) => {
                if let Some(code) = execution.error {
                    warn!(
                        error_code = %code,
                        error_message = execution.error_message.as_deref().unwrap_or_default(),
                        container_id = execution.container_id.as_deref().unwrap_or_default(),
                        "Plan execution reported an error"
                    );
                } else {
                    info!("✅ Plan executed");
                }
                SolutionProcessorResult::Executed {
                    solution,
                    execution,
                }
            }
            Err(error) => {
                error!(error = %error, "Plan execution failed");
                SolutionProcessorResult::Failed { solution, error }
            }
        };

        if self.lifecycle.finish() {
            (self.listener)(result);
        }
    }
}
