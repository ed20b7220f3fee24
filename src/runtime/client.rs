//! Transport seam towards the workflow runtime.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{TaskInputVariablesReadMode, TaskStatus};
use crate::error::PlanningResult;
use crate::models::{PlanningItem, TaskData};

/// Parameters of a task query, shared by every page of it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskQuery {
    /// Empty means every status
    pub status_filter: Vec<TaskStatus>,
    pub from_last_modification_date: Option<DateTime<Utc>>,
    pub read_mode: TaskInputVariablesReadMode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskQueryPage {
    /// Runtime clock at the moment the page was read
    pub query_time: DateTime<Utc>,
    pub tasks: Vec<TaskData>,
}

/// Closed set of errors the runtime reports for a plan execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanningErrorCode {
    /// A task changed after the plan was calculated; resynchronizing is enough
    TaskModifiedSincePlanCalculationError,
    UnexpectedError,
}

impl PlanningErrorCode {
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::TaskModifiedSincePlanCalculationError)
    }
}

impl fmt::Display for PlanningErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TaskModifiedSincePlanCalculationError => {
                write!(f, "TASK_MODIFIED_SINCE_PLAN_CALCULATION_ERROR")
            }
            Self::UnexpectedError => write!(f, "UNEXPECTED_ERROR"),
        }
    }
}

/// Structured outcome of `execute_planning`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanningExecutionResult {
    pub container_id: Option<String>,
    pub error: Option<PlanningErrorCode>,
    pub error_message: Option<String>,
}

impl PlanningExecutionResult {
    pub fn success() -> Self {
        Self::default()
    }

    pub fn failure(
        error: PlanningErrorCode,
        container_id: Option<String>,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            container_id,
            error: Some(error),
            error_message: Some(error_message.into()),
        }
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn is_recoverable(&self) -> bool {
        self.error.is_some_and(|code| code.is_recoverable())
    }
}

/// Query and execute operations of the workflow runtime.
///
/// Implementations own the wire protocol; failures are reported as
/// [`PlanningError::RuntimeError`](crate::error::PlanningError::RuntimeError).
#[async_trait]
pub trait RuntimeClient: Send + Sync + fmt::Debug {
    /// Read one page (`page` starts at 0) of tasks matching `query`
    async fn find_tasks_page(
        &self,
        query: &TaskQuery,
        page: usize,
        page_size: usize,
    ) -> PlanningResult<TaskQueryPage>;

    async fn execute_planning(
        &self,
        items: Vec<PlanningItem>,
        user_id: &str,
    ) -> PlanningResult<PlanningExecutionResult>;
}
