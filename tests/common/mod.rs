// Common test utilities for integration tests

pub mod builders;
pub mod mock_runtime;
pub mod strategies;

pub use builders::*;
pub use mock_runtime::*;
