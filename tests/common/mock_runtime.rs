#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tasker_planning::constants::TaskInputVariablesReadMode;
use tasker_planning::error::{PlanningError, PlanningResult};
use tasker_planning::models::{ExternalUser, PlanningItem, TaskData};
use tasker_planning::runtime::{
    PlanningExecutionResult, RuntimeClient, TaskQuery, TaskQueryPage, UserSystemService,
};

/// Scripted answer to one task query
#[derive(Debug, Clone)]
pub enum FindOutcome {
    Found {
        query_time: DateTime<Utc>,
        tasks: Vec<TaskData>,
    },
    Failed(String),
}

impl FindOutcome {
    pub fn empty(query_time: DateTime<Utc>) -> Self {
        Self::Found {
            query_time,
            tasks: Vec::new(),
        }
    }

    pub fn tasks(query_time: DateTime<Utc>, tasks: Vec<TaskData>) -> Self {
        Self::Found { query_time, tasks }
    }

    pub fn failed(message: &str) -> Self {
        Self::Failed(message.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedQuery {
    pub recovery: bool,
    pub from: Option<DateTime<Utc>>,
    pub read_mode: TaskInputVariablesReadMode,
}

/// Runtime double. Recovery queries (the ones carrying a status filter) are answered
/// from `recovery`, falling back to the recovery snapshot; synchronization queries
/// from `synchronization`, falling back to an empty page at `idle_query_time`.
#[derive(Debug)]
pub struct MockRuntimeClient {
    recovery: Mutex<VecDeque<FindOutcome>>,
    recovery_snapshot: Mutex<FindOutcome>,
    synchronization: Mutex<VecDeque<FindOutcome>>,
    idle_query_time: DateTime<Utc>,
    executions: Mutex<VecDeque<PlanningResult<PlanningExecutionResult>>>,
    hang_on_execution: AtomicBool,
    queries: Mutex<Vec<RecordedQuery>>,
    executed_plans: Mutex<Vec<(String, Vec<PlanningItem>)>>,
}

impl MockRuntimeClient {
    pub fn new(idle_query_time: DateTime<Utc>) -> Self {
        Self {
            recovery: Mutex::new(VecDeque::new()),
            recovery_snapshot: Mutex::new(FindOutcome::empty(idle_query_time)),
            synchronization: Mutex::new(VecDeque::new()),
            idle_query_time,
            executions: Mutex::new(VecDeque::new()),
            hang_on_execution: AtomicBool::new(false),
            queries: Mutex::new(Vec::new()),
            executed_plans: Mutex::new(Vec::new()),
        }
    }

    pub fn with_recovery_snapshot(self, query_time: DateTime<Utc>, tasks: Vec<TaskData>) -> Self {
        *self.recovery_snapshot.lock() = FindOutcome::tasks(query_time, tasks);
        self
    }

    pub fn with_recovery_outcome(self, outcome: FindOutcome) -> Self {
        self.recovery.lock().push_back(outcome);
        self
    }

    pub fn with_synchronization_outcomes(
        self,
        outcomes: impl IntoIterator<Item = FindOutcome>,
    ) -> Self {
        self.synchronization.lock().extend(outcomes);
        self
    }

    pub fn with_execution_result(self, result: PlanningResult<PlanningExecutionResult>) -> Self {
        self.executions.lock().push_back(result);
        self
    }

    /// Plans are recorded but the execute call never returns
    pub fn hanging_on_execution(self) -> Self {
        self.hang_on_execution.store(true, Ordering::SeqCst);
        self
    }

    pub fn queries(&self) -> Vec<RecordedQuery> {
        self.queries.lock().clone()
    }

    pub fn recovery_queries(&self) -> usize {
        self.queries.lock().iter().filter(|query| query.recovery).count()
    }

    pub fn synchronization_cursors(&self) -> Vec<Option<DateTime<Utc>>> {
        self.queries
            .lock()
            .iter()
            .filter(|query| !query.recovery)
            .map(|query| query.from)
            .collect()
    }

    pub fn executed_plans(&self) -> Vec<(String, Vec<PlanningItem>)> {
        self.executed_plans.lock().clone()
    }
}

#[async_trait]
impl RuntimeClient for MockRuntimeClient {
    async fn find_tasks_page(
        &self,
        query: &TaskQuery,
        page: usize,
        _page_size: usize,
    ) -> PlanningResult<TaskQueryPage> {
        if page > 0 {
            return Ok(TaskQueryPage {
                query_time: self.idle_query_time,
                tasks: Vec::new(),
            });
        }

        let recovery = !query.status_filter.is_empty();
        self.queries.lock().push(RecordedQuery {
            recovery,
            from: query.from_last_modification_date,
            read_mode: query.read_mode,
        });

        let outcome = if recovery {
            let scripted = self.recovery.lock().pop_front();
            scripted.unwrap_or_else(|| self.recovery_snapshot.lock().clone())
        } else {
            self.synchronization
                .lock()
                .pop_front()
                .unwrap_or_else(|| FindOutcome::empty(self.idle_query_time))
        };

        match outcome {
            FindOutcome::Found { query_time, tasks } => Ok(TaskQueryPage { query_time, tasks }),
            FindOutcome::Failed(message) => Err(PlanningError::RuntimeError(message)),
        }
    }

    async fn execute_planning(
        &self,
        items: Vec<PlanningItem>,
        user_id: &str,
    ) -> PlanningResult<PlanningExecutionResult> {
        self.executed_plans.lock().push((user_id.to_string(), items));
        if self.hang_on_execution.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        self.executions
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(PlanningExecutionResult::success()))
    }
}

/// Directory double whose first `failures` listings fail
#[derive(Debug, Default)]
pub struct MockUserSystem {
    users: Mutex<Vec<ExternalUser>>,
    failures: AtomicUsize,
    calls: AtomicUsize,
    lookups: Mutex<Vec<String>>,
}

impl MockUserSystem {
    pub fn new(users: Vec<ExternalUser>) -> Self {
        Self {
            users: Mutex::new(users),
            ..Default::default()
        }
    }

    pub fn failing(self, failures: usize) -> Self {
        self.failures.store(failures, Ordering::SeqCst);
        self
    }

    pub fn set_users(&self, users: Vec<ExternalUser>) {
        *self.users.lock() = users;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Ids passed to `find_user`, in call order
    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().clone()
    }
}

#[async_trait]
impl UserSystemService for MockUserSystem {
    fn name(&self) -> &str {
        "mock"
    }

    async fn find_all_users(&self) -> PlanningResult<Vec<ExternalUser>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(PlanningError::UserSystemError(
                "directory unavailable".to_string(),
            ));
        }
        Ok(self.users.lock().clone())
    }

    async fn find_user(&self, id: &str) -> PlanningResult<Option<ExternalUser>> {
        self.lookups.lock().push(id.to_string());
        Ok(self.users.lock().iter().find(|user| user.id == id).cloned())
    }
}
