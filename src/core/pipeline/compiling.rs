use std::path::Path;

use crate::core::{
    domain::{Artifact, Language},
    traits::compiler::{CompileError, Compiler},
};

/// Builds the program once before any test runs. Any failure aborts the run.
#[tracing::instrument(skip(compiler))]
pub async fn compile_program(
    compiler: &dyn Compiler,
    source: &Path,
    language: Language,
) -> Result<Artifact, CompileError> {
    tracing::info!("Compiling {} as {}", source.display(), language);

    match compiler.compile(source, language).await {
        Ok(artifact) => {
            tracing::debug!("Compilation result: {:?}", artifact);
            Ok(artifact)
        }
        Err(e) => {
            tracing::error!("Compilation of {} failed: {}", source.display(), e);
            Err(e)
        }
    }
}
