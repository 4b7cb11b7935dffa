use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use thiserror::Error;

use crate::core::{
    domain::{DiagnosticPolicy, ResourceLimits, RunSummary, TestCase, TestResult, TestStatus},
    judging::judge,
    reporter::Reporter,
    traits::executor::Executor,
};

#[derive(Debug, Error)]
pub enum SuiteError {
    #[error("test {index} lost its input or expected output during the run")]
    FixtureMissing { index: u64 },
}

/// Runs every test case and records the results in discovery order.
///
/// Up to `jobs` tests run at once; results are still handed to the reporter
/// in the order of `cases`. Each test is spawned as its own task so a panic
/// while handling one test is recorded as an internal error for that test
/// only. A missing fixture stops the suite after it has been reported.
#[tracing::instrument(skip_all, fields(tests = cases.len(), jobs = jobs))]
pub async fn run_suite<W: Write>(
    cases: &[TestCase],
    executor: Arc<dyn Executor>,
    limits: Arc<ResourceLimits>,
    policy: DiagnosticPolicy,
    jobs: usize,
    mut reporter: Reporter<W>,
) -> Result<RunSummary, SuiteError> {
    let mut results = futures::stream::iter(cases)
        .map(|case| {
            let executor = executor.clone();
            let limits = limits.clone();
            let owned = case.clone();
            async move {
                tracing::info!("Running test {}", owned.index);
                let handle = tokio::spawn(async move {
                    let execution = executor.execute(&owned, &limits).await;
                    judge(&owned, execution, policy).await
                });
                let result = match handle.await {
                    Ok(result) => result,
                    Err(e) => {
                        tracing::error!("Test {} crashed the harness: {}", case.index, e);
                        TestResult {
                            index: case.index,
                            status: TestStatus::InternalError,
                            elapsed: Duration::ZERO,
                            diagnostic: Some(e.to_string()),
                        }
                    }
                };
                (case, result)
            }
        })
        .buffered(jobs.max(1));

    while let Some((case, result)) = results.next().await {
        let missing = result.status == TestStatus::Missing;
        reporter.record(case, result);
        if missing {
            return Err(SuiteError::FixtureMissing { index: case.index });
        }
    }

    Ok(reporter.finish())
}
