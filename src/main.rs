use std::io::Write;
use std::panic;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, JudgeConfig};
use crate::error::JudgeError;

mod app;
mod cli;
mod constants;
mod core;
mod error;
mod native;


const EXIT_TESTS_FAILED: u8 = 1;
const EXIT_NO_TESTS: u8 = 2;
const EXIT_ABORTED: u8 = 3;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    set_panic_hook();

    let cli = Cli::parse();
    let code = exit_code(judge(cli).await, &mut std::io::stdout());
    ExitCode::from(code)
}

/// Maps the run result to a process exit code. Only the no-tests notice goes
/// to `out`; aborts are reported once, through the log.
fn exit_code<W: Write>(result: Result<bool, JudgeError>, out: &mut W) -> u8 {
    match result {
        Ok(true) => 0,
        Ok(false) => EXIT_TESTS_FAILED,
        Err(e) if e.is_no_tests() => {
            if let Err(write_err) = writeln!(out, "No test files found: {e}") {
                tracing::warn!("Failed to write report line: {}", write_err);
            }
            EXIT_NO_TESTS
        }
        Err(e) => {
            tracing::error!("Run aborted: {}", e);
            EXIT_ABORTED
        }
    }
}

/// Returns whether every test passed.
async fn judge(cli: Cli) -> Result<bool, JudgeError> {
    let config = JudgeConfig::try_from(cli)?;
    let summary = app::run(&config, std::io::stdout()).await?;
    Ok(summary.all_passed())
}

fn set_panic_hook() {
    panic::set_hook(Box::new(|panic_info| {
        tracing::error!(
            message = "panic occurred",
            panic = %panic_info
        );
    }));
}
