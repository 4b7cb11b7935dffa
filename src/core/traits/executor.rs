use std::path::PathBuf;

use thiserror::Error;

use crate::core::domain::{ExecutionOutcome, ResourceLimits, TestCase};

#[derive(Debug, Clone, Error)]
pub enum ExecuteError {
    /// A fixture file vanished between discovery and execution.
    #[error("test fixture not found: {}", .path.display())]
    FixtureMissing { path: PathBuf },
    #[error("{msg}")]
    Internal { msg: String },
}

#[mockall::automock]
#[async_trait::async_trait]
pub trait Executor: std::fmt::Debug + Send + Sync {
    async fn execute(
        &self,
        case: &TestCase,
        limits: &ResourceLimits,
    ) -> Result<ExecutionOutcome, ExecuteError>;
}
