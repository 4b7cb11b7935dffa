use std::io::Write;

use crate::core::domain::{RunSummary, TestCase, TestResult, TestStatus};

/// Collects test results in the order they are recorded and prints a line
/// for each. A failing writer never changes what is collected.
pub struct Reporter<W: Write> {
    program_name: String,
    out: W,
    results: Vec<TestResult>,
    started_at: chrono::DateTime<chrono::Utc>,
}

impl<W: Write> Reporter<W> {
    pub fn new(program_name: &str, out: W) -> Self {
        Self {
            program_name: program_name.to_string(),
            out,
            results: Vec::new(),
            started_at: chrono::Utc::now(),
        }
    }

    pub fn record(&mut self, case: &TestCase, result: TestResult) {
        let line = status_line(case, &result);
        self.emit(&line);
        self.results.push(result);
    }

    pub fn finish(mut self) -> RunSummary {
        let total_count = self.results.len();
        let passed_count = self.results.iter().filter(|r| r.status.is_passed()).count();

        let line = if total_count > 0 && passed_count == total_count {
            format!(
                "All tests passed for {}! ({}/{} passed)",
                self.program_name, passed_count, total_count
            )
        } else {
            format!(
                "Some tests failed for {}. ({}/{} passed)",
                self.program_name, passed_count, total_count
            )
        };
        self.emit(&line);

        RunSummary {
            program_name: self.program_name,
            results: self.results,
            passed_count,
            total_count,
            started_at: self.started_at,
            finished_at: chrono::Utc::now(),
        }
    }

    fn emit(&mut self, text: &str) {
        if let Err(e) = writeln!(self.out, "{text}").and_then(|_| self.out.flush()) {
            tracing::warn!("Failed to write report line: {}", e);
        }
    }
}

fn status_line(case: &TestCase, result: &TestResult) -> String {
    let secs = result.elapsed.as_secs_f64();
    let mut line = match result.status {
        TestStatus::Passed => format!("  Test {} passed in {:.3}s", result.index, secs),
        TestStatus::WrongAnswer => format!(
            "  Test {} failed: wrong answer ({:.3}s)\n     Expected output: {}\n     Actual output: {}",
            result.index,
            secs,
            case.expected_output_path.display(),
            case.actual_output_path.display()
        ),
        TestStatus::Timeout => format!(
            "  Test {} failed: time limit exceeded (ran {:.3}s)",
            result.index, secs
        ),
        TestStatus::Missing => format!(
            "  Test {} aborted: fixture missing, check {} and {}",
            result.index,
            case.input_path.display(),
            case.expected_output_path.display()
        ),
        status => format!("  Test {} failed: {} ({:.3}s)", result.index, status, secs),
    };

    if let Some(diagnostic) = &result.diagnostic {
        line.push_str("\n     Error: ");
        line.push_str(diagnostic);
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;

    fn case(index: u64) -> TestCase {
        TestCase {
            index,
            input_path: PathBuf::from(format!("t/input{index}.txt")),
            expected_output_path: PathBuf::from(format!("t/output{index}.txt")),
            actual_output_path: PathBuf::from(format!("t/actual_results/output{index}.txt")),
        }
    }

    fn result(index: u64, status: TestStatus) -> TestResult {
        TestResult {
            index,
            status,
            elapsed: Duration::from_millis(250),
            diagnostic: None,
        }
    }

    struct BrokenWriter;

    impl Write for BrokenWriter {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("closed"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Err(std::io::Error::other("closed"))
        }
    }

    #[test]
    fn test_counts_follow_statuses() {
        let statuses = [
            TestStatus::Passed,
            TestStatus::WrongAnswer,
            TestStatus::Passed,
            TestStatus::Timeout,
            TestStatus::MemoryExceeded,
            TestStatus::RuntimeError,
            TestStatus::StrayDiagnosticOutput,
        ];

        let mut reporter = Reporter::new("sum", Vec::new());
        for (i, status) in statuses.iter().enumerate() {
            reporter.record(&case(i as u64), result(i as u64, *status));
        }
        let summary = reporter.finish();

        assert_eq!(summary.passed_count, 2);
        assert_eq!(summary.total_count, statuses.len());
        assert!(!summary.all_passed());
        let order: Vec<u64> = summary.results.iter().map(|r| r.index).collect();
        assert_eq!(order, (0..statuses.len() as u64).collect::<Vec<_>>());
        assert!(summary.finished_at >= summary.started_at);
    }

    #[test]
    fn test_report_text() {
        let mut out = Vec::new();
        {
            let mut reporter = Reporter::new("sum", &mut out);
            reporter.record(&case(2), result(2, TestStatus::Passed));
            reporter.record(&case(10), result(10, TestStatus::WrongAnswer));
            let mut crashed = result(11, TestStatus::RuntimeError);
            crashed.diagnostic = Some("Segmentation fault".to_string());
            reporter.record(&case(11), crashed);
            reporter.finish();
        }
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("Test 2 passed in 0.250s"));
        assert!(text.contains("Test 10 failed: wrong answer"));
        assert!(text.contains("Expected output: t/output10.txt"));
        assert!(text.contains("Actual output: t/actual_results/output10.txt"));
        assert!(text.contains("Test 11 failed: runtime error"));
        assert!(text.contains("Error: Segmentation fault"));
        assert!(text.ends_with("Some tests failed for sum. (1/3 passed)\n"));
    }

    #[test]
    fn test_all_passed_line() {
        let mut out = Vec::new();
        let summary = {
            let mut reporter = Reporter::new("sum", &mut out);
            reporter.record(&case(1), result(1, TestStatus::Passed));
            reporter.finish()
        };
        assert!(summary.all_passed());
        let text = String::from_utf8(out).unwrap();
        assert!(text.ends_with("All tests passed for sum! (1/1 passed)\n"));
    }

    #[test]
    fn test_write_failures_do_not_change_counts() {
        let mut reporter = Reporter::new("sum", BrokenWriter);
        reporter.record(&case(1), result(1, TestStatus::Passed));
        reporter.record(&case(2), result(2, TestStatus::Timeout));

        let summary = reporter.finish();
        assert_eq!(summary.results.len(), 2);
        assert_eq!(summary.passed_count, 1);
        assert_eq!(summary.total_count, 2);
    }
}
