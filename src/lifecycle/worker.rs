//! # Worker Lifecycle
//!
//! Composable lifecycle state machine embedded by every background worker. It owns
//! the status, the start permit the worker loop waits on, and the shutdown
//! notification that interrupts any pause.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, Semaphore};
use tracing::{debug, info};
use uuid::Uuid;

use super::status::WorkerStatus;
use crate::error::{PlanningError, PlanningResult};

#[derive(Debug)]
pub struct WorkerLifecycle {
    /// Worker name for logging and error messages
    name: &'static str,
    /// Instance id for logging
    id: Uuid,
    status: AtomicU8,
    /// One permit per accepted unit of work; closed on destroy
    start_permits: Semaphore,
    shutdown_notify: Notify,
}

impl WorkerLifecycle {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            id: Uuid::new_v4(),
            status: AtomicU8::new(WorkerStatus::Stopped as u8),
            start_permits: Semaphore::new(0),
            shutdown_notify: Notify::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn status(&self) -> WorkerStatus {
        WorkerStatus::from(self.status.load(Ordering::Acquire))
    }

    pub fn is_stopped(&self) -> bool {
        self.status() == WorkerStatus::Stopped
    }

    pub fn is_started(&self) -> bool {
        self.status() == WorkerStatus::Started
    }

    pub fn is_destroyed(&self) -> bool {
        self.status() == WorkerStatus::Destroyed
    }

    /// The worker loop keeps running until the worker is destroyed
    pub fn is_alive(&self) -> bool {
        !self.is_destroyed()
    }

    /// Atomically move from `expected` to `new`. `Destroyed` is never left.
    pub fn compare_and_set(&self, expected: WorkerStatus, new: WorkerStatus) -> bool {
        if expected.is_terminal() {
            return false;
        }
        self.status
            .compare_exchange(
                expected as u8,
                new as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Accept a new unit of work: STOPPED → STARTED, or a state error naming `operation`
    pub fn begin(&self, operation: &str) -> PlanningResult<()> {
        if self.compare_and_set(WorkerStatus::Stopped, WorkerStatus::Started) {
            Ok(())
        } else {
            Err(self.state_error(operation, WorkerStatus::Stopped))
        }
    }

    /// Fail with a state error unless the worker is STARTED
    pub fn require_started(&self, operation: &str) -> PlanningResult<()> {
        if self.is_started() {
            Ok(())
        } else {
            Err(self.state_error(operation, WorkerStatus::Started))
        }
    }

    /// Leave STARTED after a unit of work. Returns false if the worker was destroyed meanwhile.
    pub fn finish(&self) -> bool {
        self.compare_and_set(WorkerStatus::Started, WorkerStatus::Stopped)
    }

    /// Roll back a `begin` whose setup failed
    pub fn abort_start(&self) {
        self.finish();
    }

    /// Wake the worker loop for the unit of work accepted by `begin`
    pub fn release_permit(&self) {
        self.start_permits.add_permits(1);
    }

    /// Wait until a unit of work is released. Returns false once destroyed.
    pub async fn acquire_permit(&self) -> bool {
        match self.start_permits.acquire().await {
            Ok(permit) => {
                permit.forget();
                self.is_alive()
            }
            Err(_) => false,
        }
    }

    /// Sleep for `duration` unless destroyed first. Returns whether the worker is still alive.
    pub async fn pause(&self, duration: Duration) -> bool {
        let notified = self.shutdown_notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();
        if !self.is_alive() {
            return false;
        }
        tokio::select! {
            _ = tokio::time::sleep(duration) => {}
            _ = &mut notified => {
                debug!(worker = self.name, "Shutdown notification received during pause");
            }
        }
        self.is_alive()
    }

    /// Mark the worker as destroyed and interrupt any wait. Safe to call repeatedly.
    pub fn destroy(&self) {
        let previous = self
            .status
            .swap(WorkerStatus::Destroyed as u8, Ordering::AcqRel);
        self.start_permits.close();
        self.shutdown_notify.notify_waiters();
        if !WorkerStatus::from(previous).is_terminal() {
            info!(worker = self.name, worker_id = %self.id, "Worker destroyed");
        }
    }

    fn state_error(&self, operation: &str, required: WorkerStatus) -> PlanningError {
        PlanningError::InvalidState(format!(
            "{} {} method can only be invoked when the status is {}",
            self.name, operation, required
        ))
    }
}

/// A background worker driven by [`run_worker`]
///
/// Implementors embed a [`WorkerLifecycle`] and provide the unit of work executed each
/// time the worker is started.
#[async_trait]
pub trait Worker: Send + Sync + 'static {
    fn lifecycle(&self) -> &WorkerLifecycle;

    /// Run the unit of work accepted by the last successful `begin`.
    ///
    /// Implementations must check [`WorkerLifecycle::is_alive`] at their safe points and
    /// leave STARTED through [`WorkerLifecycle::finish`] when done.
    async fn run_once(&self);
}

/// Worker loop: waits for a start permit, runs one unit of work, repeats until destroyed
pub async fn run_worker<W: Worker + ?Sized>(worker: Arc<W>) {
    let lifecycle = worker.lifecycle();
    info!(
        worker = lifecycle.name(),
        worker_id = %lifecycle.id(),
        "Worker loop started"
    );

    while lifecycle.is_alive() {
        if !lifecycle.acquire_permit().await {
            break;
        }
        worker.run_once().await;
    }

    info!(
        worker = lifecycle.name(),
        worker_id = %lifecycle.id(),
        "Worker loop finished"
    );
}
