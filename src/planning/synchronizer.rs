//! # Solution Synchronizer
//!
//! Keeps the optimizer fed with runtime state. `init_solver_executor` recovers a
//! full solution and starts the executor; `synchronize_solution` polls the runtime
//! at a fixed interval until a non empty delta shows up, or until an optional
//! unchanged period elapses. Query failures never advance the cursor and are
//! retried on the next tick.

use async_trait::async_trait;
use chrono::{DateTime, Timelike, Utc};
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::changes_builder::SolutionChangesBuilder;
use super::solution_builder::SolutionBuilder;
use crate::constants::{status_groups, TaskInputVariablesReadMode};
use crate::error::PlanningResult;
use crate::lifecycle::{Worker, WorkerLifecycle};
use crate::models::{ExternalUser, Solution, TaskData};
use crate::runtime::{RuntimeDelegate, UserSystemService};
use crate::solver::{ProblemFactChange, SolverExecutor};

/// Outcome delivered to the result listener once a unit of work completes
#[derive(Debug, Clone, PartialEq)]
pub enum SynchronizerResult {
    /// A recovered solution was handed to the executor
    SolverStarted {
        query_time: DateTime<Utc>,
        /// Run number returned by the executor start
        solver_run: u64,
    },
    /// A non empty delta was found
    Synchronized {
        changes: Vec<ProblemFactChange>,
        /// Cursor the successful query was issued with
        from: Option<DateTime<Utc>>,
        query_time: DateTime<Utc>,
    },
    /// The unchanged period of the pass elapsed without any change
    UnchangedPeriodTimeout {
        /// Cursor the last query was issued with
        from: Option<DateTime<Utc>>,
        query_time: DateTime<Utc>,
    },
}

impl SynchronizerResult {
    pub fn query_time(&self) -> DateTime<Utc> {
        match self {
            Self::SolverStarted { query_time, .. }
            | Self::Synchronized { query_time, .. }
            | Self::UnchangedPeriodTimeout { query_time, .. } => *query_time,
        }
    }
}

pub type SynchronizerResultListener = Arc<dyn Fn(SynchronizerResult) + Send + Sync>;

/// Timing of the synchronizer loops
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SynchronizerSettings {
    pub sync_interval: Duration,
    /// `None` disables the periodic users refresh
    pub users_sync_interval: Option<Duration>,
}

#[derive(Debug)]
enum Action {
    InitSolverExecutor,
    SynchronizeSolution {
        solution: Solution,
        from: Option<DateTime<Utc>>,
        unchanged_deadline: Option<Instant>,
    },
}

#[derive(Debug, Default)]
struct DirectoryState {
    users: Vec<ExternalUser>,
    next_refresh: Option<Instant>,
}

/// Runtime clock values are only trusted to the second
pub fn truncate_to_seconds(value: DateTime<Utc>) -> DateTime<Utc> {
    value.with_nanosecond(0).unwrap_or(value)
}

pub struct SolutionSynchronizer {
    lifecycle: WorkerLifecycle,
    solver_executor: Arc<SolverExecutor>,
    delegate: RuntimeDelegate,
    user_system: Arc<dyn UserSystemService>,
    settings: SynchronizerSettings,
    listener: SynchronizerResultListener,
    pending_action: Mutex<Option<Action>>,
    directory: Mutex<DirectoryState>,
}

impl std::fmt::Debug for SolutionSynchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolutionSynchronizer")
            .field("lifecycle", &self.lifecycle)
            .field("settings", &self.settings)
            .field("user_system", &self.user_system.name())
            .finish()
    }
}

impl SolutionSynchronizer {
    pub fn new(
        solver_executor: Arc<SolverExecutor>,
        delegate: RuntimeDelegate,
        user_system: Arc<dyn UserSystemService>,
        settings: SynchronizerSettings,
        listener: SynchronizerResultListener,
    ) -> Self {
        Self {
            lifecycle: WorkerLifecycle::new("SolutionSynchronizer"),
            solver_executor,
            delegate,
            user_system,
            settings,
            listener,
            pending_action: Mutex::new(None),
            directory: Mutex::new(DirectoryState::default()),
        }
    }

    /// Recover a full solution from the runtime and start the executor with it.
    /// Retried on every tick until the executor is stopped and there are tasks to plan.
    pub fn init_solver_executor(&self) -> PlanningResult<()> {
        self.lifecycle.begin("initSolverExecutor")?;
        *self.pending_action.lock() = Some(Action::InitSolverExecutor);
        self.lifecycle.release_permit();
        Ok(())
    }

    /// Poll the runtime for changes made since `from` against `solution`
    pub fn synchronize_solution(
        &self,
        solution: Solution,
        from: Option<DateTime<Utc>>,
    ) -> PlanningResult<()> {
        self.begin_synchronization(solution, from, None)
    }

    /// Like [`Self::synchronize_solution`], but the pass also completes with
    /// [`SynchronizerResult::UnchangedPeriodTimeout`] once `unchanged_period` went by
    /// without changes. A zero period is ignored.
    pub fn synchronize_solution_with_timeout(
        &self,
        solution: Solution,
        from: Option<DateTime<Utc>>,
        unchanged_period: Duration,
    ) -> PlanningResult<()> {
        self.begin_synchronization(solution, from, Some(unchanged_period))
    }

    fn begin_synchronization(
        &self,
        solution: Solution,
        from: Option<DateTime<Utc>>,
        unchanged_period: Option<Duration>,
    ) -> PlanningResult<()> {
        self.lifecycle.begin("synchronizeSolution")?;
        let unchanged_deadline = unchanged_period
            .filter(|period| !period.is_zero())
            .map(|period| Instant::now() + period);
        *self.pending_action.lock() = Some(Action::SynchronizeSolution {
            solution,
            from,
            unchanged_deadline,
        });
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

    async fn run_init(&self) -> Option<SynchronizerResult> {
        while self.lifecycle.is_alive() {
            if self.solver_executor.is_destroyed() {
                return None;
            }
            if self.solver_executor.is_stopped() {
                match self.recover_solution().await {
                    Ok((solution, _)) if solution.is_empty() => {
                        info!("No tasks to plan yet, solver start postponed");
                    }
                    Ok((solution, query_time)) => match self.solver_executor.start(solution) {
                        Ok(solver_run) => {
                            return Some(SynchronizerResult::SolverStarted {
                                query_time,
                                solver_run,
                            })
                        }
                        Err(error) => {
                            error!(error = %error, "Solver executor could not be started");
                        }
                    },
                    Err(error) => {
                        warn!(error = %error, "Solution recovery failed, retrying on next tick");
                    }
                }
            } else {
                debug!(
                    "Waiting for the solver executor to stop before recovering the solution"
                );
            }

            if !self.lifecycle.pause(self.settings.sync_interval).await {
                break;
            }
        }
        None
    }

    async fn recover_solution(&self) -> PlanningResult<(Solution, DateTime<Utc>)> {
        let users = self.user_system.find_all_users().await?;
        let result = self
            .delegate
            .find_tasks(
                status_groups::RECOVERY_STATUSES,
                None,
                TaskInputVariablesReadMode::ReadForAll,
            )
            .await?;
        info!(
            tasks = result.tasks.len(),
            users = users.len(),
            query_time = %result.query_time,
            "Solution recovered from runtime"
        );

        let solution = SolutionBuilder::new()
            .with_tasks(result.tasks)
            .with_users(users.clone())
            .build();

        let mut directory = self.directory.lock();
        directory.users = users;
        directory.next_refresh = self
            .settings
            .users_sync_interval
            .map(|interval| Instant::now() + interval);
        Ok((solution, result.query_time))
    }

    async fn run_synchronization(
        &self,
        solution: Solution,
        from: Option<DateTime<Utc>>,
        unchanged_deadline: Option<Instant>,
    ) -> Option<SynchronizerResult> {
        let mut cursor = from.map(truncate_to_seconds);

        loop {
            if !self.lifecycle.pause(self.settings.sync_interval).await {
                return None;
            }
            if !self.solver_executor.is_started() {
                debug!("Solver executor not started, synchronization tick skipped");
                continue;
            }

            let users_update = self.refresh_users_if_due().await;
            let result = match self
                .delegate
                .find_tasks(
                    &[],
                    cursor,
                    TaskInputVariablesReadMode::ReadWhenPlanningTaskIsNull,
                )
                .await
            {
                Ok(result) => result,
                Err(error) => {
                    warn!(
                        error = %error,
                        cursor = ?cursor,
                        "Synchronization query failed, retrying on next tick"
                    );
                    continue;
                }
            };
            if users_update.is_none() {
                self.resolve_unknown_owners(&solution, &result.tasks).await;
            }

            let changes = {
                let mut directory = self.directory.lock();
                if let Some(users) = users_update {
                    directory.users = users;
                    directory.next_refresh = self
                        .settings
                        .users_sync_interval
                        .map(|interval| Instant::now() + interval);
                    SolutionChangesBuilder::new(&solution)
                        .with_tasks(&result.tasks)
                        .with_users_update(&directory.users)
                        .build()
                } else {
                    SolutionChangesBuilder::new(&solution)
                        .with_tasks(&result.tasks)
                        .with_directory(&directory.users)
                        .build()
                }
            };

            if changes.is_empty() {
                if unchanged_deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                    info!(
                        cursor = ?cursor,
                        query_time = %result.query_time,
                        "No changes during the unchanged period"
                    );
                    return Some(SynchronizerResult::UnchangedPeriodTimeout {
                        from: cursor,
                        query_time: result.query_time,
                    });
                }
                debug!(
                    tasks = result.tasks.len(),
                    query_time = %result.query_time,
                    "No changes found, advancing cursor"
                );
                cursor = Some(truncate_to_seconds(result.query_time));
                continue;
            }

            info!(
                changes = changes.len(),
                tasks = result.tasks.len(),
                query_time = %result.query_time,
                "🔄 Solution changes found"
            );
            return Some(SynchronizerResult::Synchronized {
                changes,
                from: cursor,
                query_time: result.query_time,
            });
        }
    }

    /// Look up owners that neither the solution nor the cached directory know, and
    /// cache the ones the user system finds
    async fn resolve_unknown_owners(&self, solution: &Solution, tasks: &[TaskData]) {
        let unknown: BTreeSet<String> = {
            let directory = self.directory.lock();
            tasks
                .iter()
                .filter(|data| data.status.is_owned())
                .filter_map(|data| data.actual_owner.as_deref())
                .filter(|owner| {
                    solution.user(owner).is_none()
                        && !directory.users.iter().any(|user| user.id == *owner)
                })
                .map(str::to_string)
                .collect()
        };

        for owner in unknown {
            match self.user_system.find_user(&owner).await {
                Ok(Some(user)) => {
                    debug!(user_id = %owner, "Task owner resolved from user system");
                    self.directory.lock().users.push(user);
                }
                Ok(None) => {
                    debug!(user_id = %owner, "Task owner unknown to the user system");
                }
                Err(error) => {
                    warn!(error = %error, user_id = %owner, "Task owner lookup failed");
                }
            }
        }
    }

    /// Reload the directory when the users sync deadline passed. Failures are logged
    /// and leave the deadline untouched so the next tick tries again.
    async fn refresh_users_if_due(&self) -> Option<Vec<ExternalUser>> {
        let due = self
            .directory
            .lock()
            .next_refresh
            .is_some_and(|deadline| Instant::now() >= deadline);
        if !due {
            return None;
        }
        match self.user_system.find_all_users().await {
            Ok(users) => {
                debug!(users = users.len(), "Users refreshed from directory");
                Some(users)
            }
            Err(error) => {
                warn!(error = %error, "Users refresh failed, synchronizing tasks only");
                None
            }
        }
    }
}

#[async_trait]
impl Worker for SolutionSynchronizer {
    fn lifecycle(&self) -> &WorkerLifecycle {
        &self.lifecycle
    }

    async fn run_once(&self) {
        let action = self.pending_action.lock().take();
        let result = match action {
            Some(Action::InitSolverExecutor) => self.run_init().await,
            Some(Action::SynchronizeSolution {
                solution,
                from,
                unchanged_deadline,
            }) => {
                self.run_synchronization(solution, from, unchanged_deadline)
                    .await
            }
            None => None,
        };

        if !self.lifecycle.finish() {
            return;
        }
        if let Some(result) = result {
            (self.listener)(result);
        }
    }
}
