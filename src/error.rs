use thiserror::Error;

use crate::core::{
    discovery::DiscoveryError, domain::ConfigError, pipeline::running::SuiteError,
    traits::compiler::CompileError,
};

/// Errors that stop a run before every test has been judged.
#[derive(Debug, Error)]
pub enum JudgeError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
    #[error(transparent)]
    Suite(#[from] SuiteError),
}

impl JudgeError {
    pub fn is_no_tests(&self) -> bool {
        matches!(self, JudgeError::Discovery(DiscoveryError::NoTests { .. }))
    }
}
