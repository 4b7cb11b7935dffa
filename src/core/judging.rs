use std::time::Duration;

use crate::constants::{ALLOCATION_FAILURE_MARKERS, DIAGNOSTIC_EXCERPT_BYTES};
use crate::core::comparator;
use crate::core::domain::{
    DiagnosticPolicy, ExecutionOutcome, TerminationReason, TestCase, TestResult, TestStatus,
};
use crate::core::traits::executor::ExecuteError;

/// Turns the raw result of one execution into the final status of the test.
pub async fn judge(
    case: &TestCase,
    execution: Result<ExecutionOutcome, ExecuteError>,
    policy: DiagnosticPolicy,
) -> TestResult {
    let outcome = match execution {
        Ok(outcome) => outcome,
        Err(err) => {
            let status = match err {
                ExecuteError::FixtureMissing { .. } => TestStatus::Missing,
                ExecuteError::Internal { .. } => TestStatus::InternalError,
            };
            tracing::error!("Test {} could not be executed: {}", case.index, err);
            return TestResult {
                index: case.index,
                status,
                elapsed: Duration::ZERO,
                diagnostic: Some(err.to_string()),
            };
        }
    };

    let diagnostic = excerpt(&outcome.stderr);
    let status = match classify_termination(&outcome) {
        Some(status) => status,
        None if !outcome.stderr.is_empty() && policy == DiagnosticPolicy::Strict => {
            TestStatus::StrayDiagnosticOutput
        }
        None => {
            if !outcome.stderr.is_empty() {
                tracing::warn!("Test {} wrote {} bytes to stderr", case.index, outcome.stderr.len());
            }
            match comparator::compare(&case.expected_output_path, &case.actual_output_path).await {
                Ok(status) => status,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    tracing::error!("Test {} lost a fixture before comparison: {}", case.index, e);
                    return TestResult {
                        index: case.index,
                        status: TestStatus::Missing,
                        elapsed: outcome.elapsed,
                        diagnostic: Some(e.to_string()),
                    };
                }
                Err(e) => {
                    tracing::error!("Test {} could not be compared: {}", case.index, e);
                    return TestResult {
                        index: case.index,
                        status: TestStatus::InternalError,
                        elapsed: outcome.elapsed,
                        diagnostic: Some(e.to_string()),
                    };
                }
            }
        }
    };

    TestResult {
        index: case.index,
        status,
        elapsed: outcome.elapsed,
        diagnostic,
    }
}

/// Status implied by how the process stopped, or `None` for a clean exit.
fn classify_termination(outcome: &ExecutionOutcome) -> Option<TestStatus> {
    match outcome.termination {
        TerminationReason::TimedOut => Some(TestStatus::Timeout),
        TerminationReason::Exited(0) => None,
        TerminationReason::Exited(_) | TerminationReason::Signaled(_) => {
            if reports_allocation_failure(&outcome.stderr) {
                Some(TestStatus::MemoryExceeded)
            } else {
                Some(TestStatus::RuntimeError)
            }
        }
    }
}

fn reports_allocation_failure(stderr: &[u8]) -> bool {
    let stderr = String::from_utf8_lossy(stderr);
    ALLOCATION_FAILURE_MARKERS
        .iter()
        .any(|marker| stderr.contains(marker))
}

fn excerpt(stderr: &[u8]) -> Option<String> {
    if stderr.is_empty() {
        return None;
    }
    let end = stderr.len().min(DIAGNOSTIC_EXCERPT_BYTES);
    let mut text = String::from_utf8_lossy(&stderr[..end]).trim_end().to_string();
    if end < stderr.len() {
        text.push_str(" ...");
    }
    Some(text)
}
