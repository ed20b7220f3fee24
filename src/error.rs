//! Error types for the planning system.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanningError {
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("Solver error: {0}")]
    SolverError(String),
    #[error("Runtime error: {0}")]
    RuntimeError(String),
    #[error("User system error: {0}")]
    UserSystemError(String),
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PlanningError {
    /// Whether this error reports a lifecycle misuse rather than an I/O problem
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, PlanningError::InvalidState(_))
    }
}

impl From<config::ConfigError> for PlanningError {
    fn from(error: config::ConfigError) -> Self {
        PlanningError::ConfigurationError(error.to_string())
    }
}

impl From<tokio::task::JoinError> for PlanningError {
    fn from(error: tokio::task::JoinError) -> Self {
        PlanningError::Internal(format!("Worker task failed: {error}"))
    }
}

pub type PlanningResult<T> = anyhow::Result<T, PlanningError>;
