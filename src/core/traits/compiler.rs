use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::domain::{Artifact, Language};

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("compilation failed:\n{stderr}")]
    CompilationFailed { stderr: String },
    #[error("compiler not found: {}", .tool.display())]
    ToolchainMissing { tool: PathBuf },
    #[error("compiler reported success but {} was not created", .path.display())]
    ArtifactMissing { path: PathBuf },
    #[error("failed to run compiler: {0}")]
    Io(#[from] std::io::Error),
}

#[mockall::automock]
#[async_trait::async_trait]
pub trait Compiler: std::fmt::Debug + Send + Sync {
    async fn compile(&self, source: &Path, language: Language) -> Result<Artifact, CompileError>;
}
