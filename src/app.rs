use std::io::Write;
use std::sync::Arc;

use crate::cli::JudgeConfig;
use crate::core::{
    discovery::discover,
    domain::RunSummary,
    pipeline::{compiling::compile_program, running::run_suite},
    reporter::Reporter,
    traits::compiler::Compiler,
};
use crate::error::JudgeError;
use crate::native::{compiler::ToolchainCompiler, executor::NativeExecutor, limiter::select_limiter};

/// Compiles the program, discovers its tests and judges every one of them.
#[tracing::instrument(skip_all, fields(program = %config.program_name))]
pub async fn run<W: Write>(config: &JudgeConfig, out: W) -> Result<RunSummary, JudgeError> {
    let compiler = ToolchainCompiler::new(config.toolchain.clone());
    run_with(config, &compiler, out).await
}

pub async fn run_with<W: Write>(
    config: &JudgeConfig,
    compiler: &dyn Compiler,
    out: W,
) -> Result<RunSummary, JudgeError> {
    let artifact = compile_program(compiler, &config.source, config.language).await?;
    let cases = discover(&config.program_name, &config.tests_dir).await?;

    let limiter = select_limiter(&config.limits);
    let executor = NativeExecutor::new(artifact, &config.program_dir, limiter);

    tracing::info!(
        "Running {} tests with {:?} time limit and {} MB memory limit",
        cases.len(),
        config.limits.time_limit(),
        config.limits.memory_limit_mb()
    );

    let summary = run_suite(
        &cases,
        Arc::new(executor),
        Arc::new(config.limits.clone()),
        config.policy,
        config.jobs,
        Reporter::new(&config.program_name, out),
    )
    .await?;

    tracing::info!(
        "Finished {}: {}/{} passed in {}ms",
        summary.program_name,
        summary.passed_count,
        summary.total_count,
        (summary.finished_at - summary.started_at).num_milliseconds()
    );
    Ok(summary)
}
