//! # Planner Configuration
//!
//! Immutable settings injected into the orchestrator at construction. Values are
//! layered: built-in defaults, then an optional configuration file, then
//! `TASK_ASSIGNING_*` environment variables.

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::constants::PLANNING_USER_ID;
use crate::error::{PlanningError, PlanningResult};
use crate::orchestrator::PublicationTiming;
use crate::planning::SynchronizerSettings;
use crate::runtime::DEFAULT_PAGE_SIZE;

/// Default configuration file, looked up relative to the working directory with any
/// supported extension
pub const DEFAULT_CONFIG_FILE: &str = "config/task-assigning";

pub const ENV_PREFIX: &str = "TASK_ASSIGNING";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanningConfig {
    /// Non pinned tasks published per user on top of the pinned ones
    pub publish_window_size: usize,
    pub sync_interval_ms: u64,
    /// 0 disables the periodic users refresh
    pub users_sync_interval_ms: u64,
    /// User the runtime executes plans on behalf of
    pub target_user_id: String,
    pub runtime_page_size: usize,
    /// Bounded wait for the workers on shutdown
    pub termination_timeout_ms: u64,
    /// Delay before publishing the solution of a new change set, keeping the best one
    /// found meanwhile; 0 publishes right away
    pub wait_for_improved_solution_ms: u64,
    /// Quiet period after a publication after which a better solution found on
    /// background is published; 0 disables it
    pub improve_solution_on_background_ms: u64,
}

impl Default for PlanningConfig {
    fn default() -> Self {
        Self {
            publish_window_size: 2,
            sync_interval_ms: 2000,
            users_sync_interval_ms: 7_200_000,
            target_user_id: PLANNING_USER_ID.to_string(),
            runtime_page_size: DEFAULT_PAGE_SIZE,
            termination_timeout_ms: 5000,
            wait_for_improved_solution_ms: 0,
            improve_solution_on_background_ms: 60_000,
        }
    }
}

impl PlanningConfig {
    /// Load from the default file location and the process environment
    pub fn load() -> PlanningResult<Self> {
        Self::from_sources(None, Environment::with_prefix(ENV_PREFIX))
    }

    /// Load from an explicit file (any format the `config` crate knows) and the process environment
    pub fn load_from_file(path: &Path) -> PlanningResult<Self> {
        Self::from_sources(Some(path), Environment::with_prefix(ENV_PREFIX))
    }

    /// Layer `path` (or the default file when `None`) under `environment`
    pub fn from_sources(path: Option<&Path>, environment: Environment) -> PlanningResult<Self> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let config: PlanningConfig = Config::builder()
            .add_source(file)
            .add_source(environment.try_parsing(true))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        debug!(config = ?config, "Planning configuration loaded");
        Ok(config)
    }

    pub fn validate(&self) -> PlanningResult<()> {
        if self.sync_interval_ms == 0 {
            return Err(PlanningError::ConfigurationError(
                "sync_interval_ms must be greater than 0".to_string(),
            ));
        }
        if self.runtime_page_size == 0 {
            return Err(PlanningError::ConfigurationError(
                "runtime_page_size must be greater than 0".to_string(),
            ));
        }
        if self.target_user_id.trim().is_empty() {
            return Err(PlanningError::ConfigurationError(
                "target_user_id must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_millis(self.sync_interval_ms)
    }

    pub fn users_sync_interval(&self) -> Option<Duration> {
        (self.users_sync_interval_ms > 0).then(|| Duration::from_millis(self.users_sync_interval_ms))
    }

    pub fn termination_timeout(&self) -> Duration {
        Duration::from_millis(self.termination_timeout_ms)
    }

    pub fn publication_timing(&self) -> PublicationTiming {
        let non_zero = |ms: u64| (ms > 0).then(|| Duration::from_millis(ms));
        PublicationTiming {
            wait_for_improved_solution: non_zero(self.wait_for_improved_solution_ms),
            improve_solution_on_background: non_zero(self.improve_solution_on_background_ms),
        }
    }

    pub fn synchronizer_settings(&self) -> SynchronizerSettings {
        SynchronizerSettings {
            sync_interval: self.sync_interval(),
            users_sync_interval: self.users_sync_interval(),
        }
    }
}
