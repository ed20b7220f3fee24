//! Shared orchestration context.
//!
//! Only the orchestrator's event actor mutates it.

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanningContext {
    /// Id of the last change set forwarded to the executor
    current_change_set_id: u64,
    /// Highest id ever allocated; ids are never reused, even after a reset
    last_allocated_change_set_id: u64,
    processed_change_sets: BTreeSet<u64>,
    /// Cursor the last successful synchronization query was issued with
    previous_query_time: Option<DateTime<Utc>>,
    /// Runtime clock reported by that query; where the next pass starts
    next_query_time: Option<DateTime<Utc>>,
}

impl PlanningContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_change_set_id(&self) -> u64 {
        self.current_change_set_id
    }

    /// Allocate the next change-set id and make it current
    pub fn next_change_set_id(&mut self) -> u64 {
        self.last_allocated_change_set_id += 1;
        self.current_change_set_id = self.last_allocated_change_set_id;
        self.current_change_set_id
    }

    pub fn is_processed_change_set(&self, change_set_id: u64) -> bool {
        self.processed_change_sets.contains(&change_set_id)
    }

    pub fn mark_processed(&mut self, change_set_id: u64) {
        self.processed_change_sets.insert(change_set_id);
    }

    /// Forget processed ids after a full rebuild; the rebuilt solution starts at id 0
    pub fn reset_change_sets(&mut self) {
        self.processed_change_sets.clear();
        self.current_change_set_id = 0;
    }

    pub fn previous_query_time(&self) -> Option<DateTime<Utc>> {
        self.previous_query_time
    }

    pub fn next_query_time(&self) -> Option<DateTime<Utc>> {
        self.next_query_time
    }

    /// A solution was recovered from scratch at `query_time`
    pub fn record_recovery(&mut self, query_time: DateTime<Utc>) {
        self.previous_query_time = Some(query_time);
        self.next_query_time = Some(query_time);
    }

    pub fn record_synchronization(
        &mut self,
        from: Option<DateTime<Utc>>,
        query_time: DateTime<Utc>,
    ) {
        self.previous_query_time = from;
        self.next_query_time = Some(query_time);
    }
}
