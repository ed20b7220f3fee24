//! # Planning Orchestrator
//!
//! Wires the solver executor, the solution synchronizer and the solution processor
//! together. Every callback the workers raise is funnelled through one unbounded
//! channel and handled serially by a single event actor, which is the only writer
//! of the [`PlanningContext`].
//!
//! ## Event flow
//!
//! 1. `start` launches the workers and asks the synchronizer to recover a solution.
//! 2. Best-solution events that are fully processed, initialized, carry the current
//!    change-set id and were not handled before are published by the processor.
//! 3. A successful publication starts the next synchronization pass; its changes are
//!    tagged with a fresh change-set id and forwarded to the executor.
//! 4. A failed publication either re-synchronizes (recoverable) or rebuilds the
//!    solution from scratch.
//!
//! ## Publication timing
//!
//! With a wait for improved solutions configured, the first publishable solution of
//! a change set arms a timer on the actor and the best solution seen when it fires is
//! published. With background improvement configured, the pass that follows a
//! successful publication gives up after a quiet period, and the best solution found
//! meanwhile is published when it beats the one already published.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::PlanningConfig;
use crate::error::{PlanningError, PlanningResult};
use crate::lifecycle::run_worker;
use crate::models::Solution;
use crate::planning::{
    PlanningContext, PublishWindowPlanner, SolutionProcessor, SolutionProcessorResult,
    SolutionSynchronizer, SynchronizerResult,
};
use crate::runtime::{RuntimeClient, RuntimeDelegate, UserSystemService};
use crate::solver::{
    BestSolutionChangedEvent, BestSolutionListener, ProblemFactChange, SolverExecutor,
    SolverFactory,
};

/// Everything the event actor reacts to
#[derive(Debug)]
pub enum OrchestratorEvent {
    BestSolutionChanged(BestSolutionChangedEvent),
    SolutionSynchronized(SynchronizerResult),
    SolutionProcessed(SolutionProcessorResult),
    /// The wait for an improved solution of `change_set_id` is over
    PublicationDelayElapsed {
        solver_run: u64,
        change_set_id: u64,
    },
    Shutdown,
}

/// When solutions get published; `None` disables a setting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublicationTiming {
    pub wait_for_improved_solution: Option<Duration>,
    pub improve_solution_on_background: Option<Duration>,
}

/// Serial handler of orchestrator events; owns the planning context
#[derive(Debug)]
pub struct PlanningEventHandler {
    context: PlanningContext,
    solver_executor: Arc<SolverExecutor>,
    synchronizer: Arc<SolutionSynchronizer>,
    processor: Arc<SolutionProcessor>,
    /// Executor run whose events are handled; `None` between a (re)build request and
    /// the matching solver start
    solver_run: Option<u64>,
    /// Latest event received while no run was active. The new engine may report its
    /// first solution before the synchronizer reports the start.
    early_best_solution: Option<BestSolutionChangedEvent>,
    timing: PublicationTiming,
    /// Delayed publications are delivered back through the event channel
    timer_tx: Option<mpsc::UnboundedSender<OrchestratorEvent>>,
    /// Change set whose delayed publication is armed
    scheduled_publication: Option<u64>,
    /// Latest complete solution of the current change set
    last_best_solution: Option<Solution>,
    /// Solution last handed to the processor
    current_solution: Option<Solution>,
    background_improvement_sent: bool,
}

impl PlanningEventHandler {
    pub fn new(
        solver_executor: Arc<SolverExecutor>,
        synchronizer: Arc<SolutionSynchronizer>,
        processor: Arc<SolutionProcessor>,
    ) -> Self {
        Self {
            context: PlanningContext::new(),
            solver_executor,
            synchronizer,
            processor,
            solver_run: None,
            early_best_solution: None,
            timing: PublicationTiming::default(),
            timer_tx: None,
            scheduled_publication: None,
            last_best_solution: None,
            current_solution: None,
            background_improvement_sent: false,
        }
    }

    /// Enable the publication timing settings; timers report on `event_tx`
    pub fn with_publication_timing(
        mut self,
        timing: PublicationTiming,
        event_tx: mpsc::UnboundedSender<OrchestratorEvent>,
    ) -> Self {
        self.timing = timing;
        self.timer_tx = Some(event_tx);
        self
    }

    pub fn context(&self) -> &PlanningContext {
        &self.context
    }

    /// Handle one event; returns false once the actor should stop
    pub fn handle(&mut self, event: OrchestratorEvent) -> bool {
        match event {
            OrchestratorEvent::BestSolutionChanged(event) => {
                self.on_best_solution_changed(event);
            }
            OrchestratorEvent::SolutionSynchronized(result) => self.on_solution_synchronized(result),
            OrchestratorEvent::SolutionProcessed(result) => self.on_solution_processed(result),
            OrchestratorEvent::PublicationDelayElapsed {
                solver_run,
                change_set_id,
            } => self.on_publication_delay_elapsed(solver_run, change_set_id),
            OrchestratorEvent::Shutdown => return false,
        }
        true
    }

    /// Publish the solution when it reflects every change of the current change set,
    /// right away or once the wait for improved solutions is over.
    /// Returns whether the event was accepted for publication.
    pub fn on_best_solution_changed(&mut self, event: BestSolutionChangedEvent) -> bool {
        let Some(solver_run) = self.solver_run else {
            debug!(solver_run = event.solver_run, "Best solution held until the solver start is reported");
            self.early_best_solution = Some(event);
            return false;
        };
        if event.solver_run != solver_run {
            debug!(
                solver_run = event.solver_run,
                current_solver_run = solver_run,
                "Best solution of a discarded solver ignored"
            );
            return false;
        }

        let solution = event.new_best_solution;
        let change_set_id = solution.change_set_id;
        debug!(
            every_problem_fact_change_processed = event.every_problem_fact_change_processed,
            change_set_id = change_set_id,
            current_change_set_id = self.context.current_change_set_id(),
            score = %solution.score,
            "Best solution changed"
        );

        if !event.every_problem_fact_change_processed
            || !solution.is_initialized()
            || change_set_id != self.context.current_change_set_id()
        {
            return false;
        }
        if self.context.is_processed_change_set(change_set_id) {
            // kept for the background improvement check
            self.last_best_solution = Some(solution);
            return false;
        }

        match self.timing.wait_for_improved_solution {
            Some(wait) if self.timer_tx.is_some() => {
                self.last_best_solution = Some(solution);
                self.schedule_publication(wait, solver_run, change_set_id);
            }
            _ => {
                self.last_best_solution = Some(solution.clone());
                self.publish(solution);
            }
        }
        true
    }

    /// Publish the best solution seen for `change_set_id` while the timer was armed
    pub fn on_publication_delay_elapsed(&mut self, solver_run: u64, change_set_id: u64) {
        if self.solver_run != Some(solver_run) || self.scheduled_publication != Some(change_set_id)
        {
            debug!(
                solver_run = solver_run,
                change_set_id = change_set_id,
                "Stale publication timer ignored"
            );
            return;
        }
        self.scheduled_publication = None;
        if change_set_id != self.context.current_change_set_id()
            || self.context.is_processed_change_set(change_set_id)
        {
            return;
        }
        let Some(solution) = self
            .last_best_solution
            .clone()
            .filter(|solution| solution.change_set_id == change_set_id)
        else {
            return;
        };
        debug!(
            change_set_id = change_set_id,
            score = %solution.score,
            "Publishing the best solution found during the wait"
        );
        self.publish(solution);
    }

    fn schedule_publication(&mut self, wait: Duration, solver_run: u64, change_set_id: u64) {
        if self.scheduled_publication == Some(change_set_id) {
            return;
        }
        let Some(timer_tx) = self.timer_tx.clone() else {
            return;
        };
        self.scheduled_publication = Some(change_set_id);
        debug!(
            change_set_id = change_set_id,
            wait_ms = wait.as_millis() as u64,
            "Publication delayed, waiting for an improved solution"
        );
        tokio::spawn(async move {
            tokio::time::sleep(wait).await;
            let elapsed = OrchestratorEvent::PublicationDelayElapsed {
                solver_run,
                change_set_id,
            };
            if timer_tx.send(elapsed).is_err() {
                debug!("Event actor gone, delayed publication dropped");
            }
        });
    }

    fn publish(&mut self, solution: Solution) {
        let change_set_id = solution.change_set_id;
        self.context.mark_processed(change_set_id);
        self.current_solution = Some(solution.clone());
        if let Err(error) = self.processor.process(solution) {
            warn!(error = %error, change_set_id = change_set_id, "Solution could not be handed to the processor");
        }
    }

    pub fn on_solution_synchronized(&mut self, result: SynchronizerResult) {
        match result {
            SynchronizerResult::SolverStarted {
                query_time,
                solver_run,
            } => {
                info!(
                    query_time = %query_time,
                    solver_run = solver_run,
                    "Solver started with recovered solution"
                );
                self.context.record_recovery(query_time);
                self.solver_run = Some(solver_run);
                if let Some(event) = self.early_best_solution.take() {
                    self.on_best_solution_changed(event);
                }
            }
            SynchronizerResult::Synchronized {
                changes,
                from,
                query_time,
            } => {
                self.context.record_synchronization(from, query_time);
                if changes.is_empty() {
                    return;
                }
                if !self.solver_executor.is_started() {
                    info!(
                        changes = changes.len(),
                        "Solver executor has not been started, changes discarded"
                    );
                    return;
                }
                self.background_improvement_sent = false;

                let change_set_id = self.context.next_change_set_id();
                let mut batch = Vec::with_capacity(changes.len() + 1);
                batch.push(ProblemFactChange::ChangeSet(change_set_id));
                batch.extend(changes);
                info!(
                    change_set_id = change_set_id,
                    changes = batch.len() - 1,
                    "Forwarding problem fact changes"
                );
                if let Err(error) = self.solver_executor.add_problem_fact_changes(batch) {
                    warn!(error = %error, change_set_id = change_set_id, "Problem fact changes were not accepted");
                }
            }
            SynchronizerResult::UnchangedPeriodTimeout { from, query_time } => {
                self.context.record_synchronization(from, query_time);
                self.on_unchanged_period_timeout();
            }
        }
    }

    /// Publish the solution improved on background, or go back to synchronizing
    fn on_unchanged_period_timeout(&mut self) {
        self.background_improvement_sent = true;
        let Some(current) = self.current_solution.clone() else {
            warn!("Unchanged period elapsed with no published solution, rebuilding");
            self.rebuild();
            return;
        };

        match self.last_best_solution.clone() {
            Some(best) if best.score > current.score => {
                info!(
                    score = %best.score,
                    published_score = %current.score,
                    change_set_id = best.change_set_id,
                    "Publishing the solution improved on background"
                );
                self.current_solution = Some(best.clone());
                if let Err(error) = self.processor.process(best) {
                    warn!(error = %error, "Improved solution could not be handed to the processor");
                }
            }
            _ => {
                debug!("No improved solution found on background, synchronization restarted");
                if let Err(error) = self
                    .synchronizer
                    .synchronize_solution(current, self.context.next_query_time())
                {
                    error!(error = %error, "Synchronization pass could not be started");
                }
            }
        }
    }

    pub fn on_solution_processed(&mut self, result: SolutionProcessorResult) {
        let (from, unchanged_period) = match &result {
            SolutionProcessorResult::Failed { error, .. } => {
                error!(
                    error = %error,
                    "Plan publication failed, the solver will be restarted with a recovered solution"
                );
                self.rebuild();
                return;
            }
            SolutionProcessorResult::Executed { execution, .. }
                if execution.has_error() && !execution.is_recoverable() =>
            {
                error!(
                    error_code = ?execution.error,
                    error_message = ?execution.error_message,
                    "Plan execution failed, the solver will be restarted with a recovered solution"
                );
                self.rebuild();
                return;
            }
            SolutionProcessorResult::Executed { execution, .. } if execution.has_error() => {
                info!(
                    error_code = ?execution.error,
                    error_message = ?execution.error_message,
                    "Recoverable plan execution error, re-reading changes since the previous query"
                );
                (self.context.previous_query_time(), None)
            }
            SolutionProcessorResult::Executed { .. } => {
                let unchanged_period = self
                    .timing
                    .improve_solution_on_background
                    .filter(|_| !self.background_improvement_sent);
                (self.context.next_query_time(), unchanged_period)
            }
        };

        let solution = result.into_solution();
        let started = match unchanged_period {
            Some(period) => self
                .synchronizer
                .synchronize_solution_with_timeout(solution, from, period),
            None => self.synchronizer.synchronize_solution(solution, from),
        };
        if let Err(error) = started {
            error!(error = %error, "Synchronization pass could not be started");
        }
    }

    /// Stop the solver and recover a fresh solution from the runtime
    fn rebuild(&mut self) {
        self.solver_executor.stop();
        self.context.reset_change_sets();
        self.solver_run = None;
        self.early_best_solution = None;
        self.scheduled_publication = None;
        self.last_best_solution = None;
        self.current_solution = None;
        self.background_improvement_sent = false;
        if let Err(error) = self.synchronizer.init_solver_executor() {
            error!(error = %error, "Solution rebuild could not be started");
        }
    }
}

pub struct PlanningOrchestrator {
    id: Uuid,
    config: PlanningConfig,
    solver_executor: Arc<SolverExecutor>,
    synchronizer: Arc<SolutionSynchronizer>,
    processor: Arc<SolutionProcessor>,
    event_tx: mpsc::UnboundedSender<OrchestratorEvent>,
    event_rx: Mutex<Option<mpsc::UnboundedReceiver<OrchestratorEvent>>>,
    workers: Mutex<Option<JoinSet<()>>>,
}

impl std::fmt::Debug for PlanningOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlanningOrchestrator")
            .field("id", &self.id)
            .field("config", &self.config)
            .field("solver_executor", &self.solver_executor)
            .field("synchronizer", &self.synchronizer)
            .field("processor", &self.processor)
            .finish()
    }
}

impl PlanningOrchestrator {
    pub fn new(
        config: PlanningConfig,
        solver_factory: Arc<dyn SolverFactory>,
        runtime_client: Arc<dyn RuntimeClient>,
        user_system: Arc<dyn UserSystemService>,
    ) -> PlanningResult<Self> {
        config.validate()?;
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let delegate = RuntimeDelegate::new(runtime_client, config.runtime_page_size)?;

        let best_solution_tx = event_tx.clone();
        let best_solution_listener: BestSolutionListener =
            Arc::new(move |event: BestSolutionChangedEvent| {
                if best_solution_tx
                    .send(OrchestratorEvent::BestSolutionChanged(event))
                    .is_err()
                {
                    debug!("Event actor gone, best solution dropped");
                }
            });
        let solver_executor = Arc::new(SolverExecutor::new(solver_factory, best_solution_listener));

        let synchronized_tx = event_tx.clone();
        let synchronizer = Arc::new(SolutionSynchronizer::new(
            solver_executor.clone(),
            delegate.clone(),
            user_system,
            config.synchronizer_settings(),
            Arc::new(move |result: SynchronizerResult| {
                if synchronized_tx
                    .send(OrchestratorEvent::SolutionSynchronized(result))
                    .is_err()
                {
                    debug!("Event actor gone, synchronization result dropped");
                }
            }),
        ));

        let processed_tx = event_tx.clone();
        let processor = Arc::new(SolutionProcessor::new(
            delegate,
            PublishWindowPlanner::new(config.publish_window_size),
            config.target_user_id.clone(),
            Arc::new(move |result: SolutionProcessorResult| {
                if processed_tx
                    .send(OrchestratorEvent::SolutionProcessed(result))
                    .is_err()
                {
                    debug!("Event actor gone, processor result dropped");
                }
            }),
        ));

        Ok(Self {
            id: Uuid::new_v4(),
            config,
            solver_executor,
            synchronizer,
            processor,
            event_tx,
            event_rx: Mutex::new(Some(event_rx)),
            workers: Mutex::new(None),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &PlanningConfig {
        &self.config
    }

    pub fn solver_executor(&self) -> &Arc<SolverExecutor> {
        &self.solver_executor
    }

    pub fn synchronizer(&self) -> &Arc<SolutionSynchronizer> {
        &self.synchronizer
    }

    pub fn processor(&self) -> &Arc<SolutionProcessor> {
        &self.processor
    }

    /// Launch the workers and the event actor, then recover the initial solution
    pub async fn start(&self) -> PlanningResult<()> {
        let mut event_rx = self.event_rx.lock().take().ok_or_else(|| {
            PlanningError::InvalidState("PlanningOrchestrator already started".to_string())
        })?;

        let mut handler = PlanningEventHandler::new(
            self.solver_executor.clone(),
            self.synchronizer.clone(),
            self.processor.clone(),
        )
        .with_publication_timing(self.config.publication_timing(), self.event_tx.clone());

        let mut workers = JoinSet::new();
        workers.spawn(run_worker(self.solver_executor.clone()));
        workers.spawn(run_worker(self.synchronizer.clone()));
        workers.spawn(run_worker(self.processor.clone()));
        workers.spawn(async move {
            while let Some(event) = event_rx.recv().await {
                if !handler.handle(event) {
                    break;
                }
            }
            debug!("Orchestrator event actor finished");
        });
        *self.workers.lock() = Some(workers);

        info!(
            orchestrator_id = %self.id,
            publish_window_size = self.config.publish_window_size,
            sync_interval_ms = self.config.sync_interval_ms,
            target_user_id = %self.config.target_user_id,
            "🚀 Planning orchestrator started"
        );
        self.synchronizer.init_solver_executor()
    }

    /// Destroy the workers and wait up to the termination timeout for them to finish
    /// before aborting whatever is left
    pub async fn destroy(&self) {
        self.solver_executor.destroy();
        self.synchronizer.destroy();
        self.processor.destroy();
        if self.event_tx.send(OrchestratorEvent::Shutdown).is_err() {
            debug!("Event actor gone, shutdown request dropped");
        }

        let workers = self.workers.lock().take();
        let Some(mut workers) = workers else {
            return;
        };

        let timeout = self.config.termination_timeout();
        let graceful = tokio::time::timeout(timeout, async {
            while let Some(joined) = workers.join_next().await {
                if let Err(join_error) = joined {
                    warn!(error = %join_error, "Worker ended abnormally during shutdown");
                    return false;
                }
            }
            true
        })
        .await;

        match graceful {
            Ok(true) => {
                info!(orchestrator_id = %self.id, "✅ Planning orchestrator stopped");
            }
            Ok(false) => {
                workers.abort_all();
                warn!(orchestrator_id = %self.id, "Shutdown interrupted, remaining workers aborted");
            }
            Err(_) => {
                workers.abort_all();
                warn!(
                    orchestrator_id = %self.id,
                    timeout_ms = self.config.termination_timeout_ms,
                    "Workers did not finish in time, aborted"
                );
            }
        }
    }
}
