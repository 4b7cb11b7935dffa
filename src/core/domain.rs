use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Language {
    C,
    Cpp,
    Java,
    Python,
}

impl Language {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .ok_or_else(|| ConfigError::UnsupportedLanguage {
                extension: String::new(),
            })?;
        ext.parse()
    }
}

impl FromStr for Language {
    type Err = ConfigError;

    fn from_str(ext: &str) -> Result<Self, Self::Err> {
        match ext.to_ascii_lowercase().as_str() {
            "c" => Ok(Language::C),
            "cpp" => Ok(Language::Cpp),
            "java" => Ok(Language::Java),
            "py" => Ok(Language::Python),
            _ => Err(ConfigError::UnsupportedLanguage {
                extension: ext.to_string(),
            }),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::Java => "java",
            Language::Python => "python",
        };
        f.write_str(tag)
    }
}

/// What the compiler left behind and how to launch it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Artifact {
    Executable { path: PathBuf },
    Bytecode {
        launcher: PathBuf,
        classpath: PathBuf,
        entry: String,
    },
    Script {
        interpreter: PathBuf,
        script: PathBuf,
    },
}

impl Artifact {
    /// Program and arguments used to start one run.
    pub fn invocation(&self) -> (PathBuf, Vec<String>) {
        match self {
            Artifact::Executable { path } => (path.clone(), Vec::new()),
            Artifact::Bytecode {
                launcher,
                classpath,
                entry,
            } => (
                launcher.clone(),
                vec![
                    "-cp".to_string(),
                    classpath.display().to_string(),
                    entry.clone(),
                ],
            ),
            Artifact::Script {
                interpreter,
                script,
            } => (interpreter.clone(), vec![script.display().to_string()]),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestCase {
    pub index: u64,
    pub input_path: PathBuf,
    pub expected_output_path: PathBuf,
    pub actual_output_path: PathBuf,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ResourceLimits {
    time_limit: Duration,
    memory_limit_mb: u64,
}

impl ResourceLimits {
    pub fn new(time_limit_secs: f64, memory_limit_mb: u64) -> Result<Self, ConfigError> {
        if !time_limit_secs.is_finite() || time_limit_secs <= 0.0 {
            return Err(ConfigError::InvalidTimeLimit(time_limit_secs));
        }
        if memory_limit_mb == 0 {
            return Err(ConfigError::InvalidMemoryLimit(memory_limit_mb));
        }
        let time_limit = Duration::try_from_secs_f64(time_limit_secs)
            .map_err(|_| ConfigError::InvalidTimeLimit(time_limit_secs))?;

        Ok(Self {
            time_limit,
            memory_limit_mb,
        })
    }

    pub fn time_limit(&self) -> Duration {
        self.time_limit
    }

    pub fn memory_limit_mb(&self) -> u64 {
        self.memory_limit_mb
    }

    pub fn memory_limit_bytes(&self) -> u64 {
        self.memory_limit_mb.saturating_mul(1024 * 1024)
    }
}

/// How a spawned program stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TerminationReason {
    Exited(i32),
    Signaled(i32),
    TimedOut,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionOutcome {
    pub termination: TerminationReason,
    pub stderr: Vec<u8>,
    pub elapsed: Duration,
}

/// Whether any stderr output fails an otherwise clean run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DiagnosticPolicy {
    #[default]
    Strict,
    Lenient,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TestStatus {
    Passed,
    WrongAnswer,
    Timeout,
    MemoryExceeded,
    RuntimeError,
    StrayDiagnosticOutput,
    Missing,
    InternalError,
}

impl TestStatus {
    pub fn is_passed(&self) -> bool {
        matches!(self, TestStatus::Passed)
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TestStatus::Passed => "passed",
            TestStatus::WrongAnswer => "wrong answer",
            TestStatus::Timeout => "time limit exceeded",
            TestStatus::MemoryExceeded => "memory limit exceeded",
            TestStatus::RuntimeError => "runtime error",
            TestStatus::StrayDiagnosticOutput => "wrote to stderr",
            TestStatus::Missing => "fixture missing",
            TestStatus::InternalError => "internal error",
        };
        f.write_str(text)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TestResult {
    pub index: u64,
    pub status: TestStatus,
    pub elapsed: Duration,
    pub diagnostic: Option<String>,
}

#[derive(Clone, Debug)]
pub struct RunSummary {
    pub program_name: String,
    pub results: Vec<TestResult>,
    pub passed_count: usize,
    pub total_count: usize,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub finished_at: chrono::DateTime<chrono::Utc>,
}

impl RunSummary {
    pub fn all_passed(&self) -> bool {
        self.total_count > 0 && self.passed_count == self.total_count
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unsupported language or invalid file extension: {extension:?}")]
    UnsupportedLanguage { extension: String },
    #[error("time limit must be a positive number of seconds, got {0}")]
    InvalidTimeLimit(f64),
    #[error("memory limit must be a positive number of megabytes, got {0}")]
    InvalidMemoryLimit(u64),
    #[error("jobs must be at least 1")]
    InvalidJobs,
    #[error("cannot resolve program path {}: {source}", .path.display())]
    ProgramPath {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_from_extension() {
        assert_eq!(Language::from_path(Path::new("a/sum.c")).unwrap(), Language::C);
        assert_eq!(Language::from_path(Path::new("sum.CPP")).unwrap(), Language::Cpp);
        assert_eq!(Language::from_path(Path::new("Main.java")).unwrap(), Language::Java);
        assert_eq!(Language::from_path(Path::new("sum.py")).unwrap(), Language::Python);
        assert!(matches!(
            Language::from_path(Path::new("sum.rs")),
            Err(ConfigError::UnsupportedLanguage { .. })
        ));
        assert!(Language::from_path(Path::new("Makefile")).is_err());
    }

    #[test]
    fn test_resource_limits_validation() {
        let limits = ResourceLimits::new(1.5, 64).unwrap();
        assert_eq!(limits.time_limit(), Duration::from_millis(1500));
        assert_eq!(limits.memory_limit_bytes(), 64 * 1024 * 1024);

        assert!(matches!(
            ResourceLimits::new(0.0, 64),
            Err(ConfigError::InvalidTimeLimit(_))
        ));
        assert!(ResourceLimits::new(f64::NAN, 64).is_err());
        assert!(ResourceLimits::new(-1.0, 64).is_err());
        assert!(matches!(
            ResourceLimits::new(1e20, 64),
            Err(ConfigError::InvalidTimeLimit(_))
        ));
        assert!(ResourceLimits::new(f64::MAX, 64).is_err());
        assert_eq!(
            ResourceLimits::new(86_400.0, 64).unwrap().time_limit(),
            Duration::from_secs(86_400)
        );
        assert!(matches!(
            ResourceLimits::new(1.0, 0),
            Err(ConfigError::InvalidMemoryLimit(0))
        ));
    }

    #[test]
    fn test_bytecode_invocation() {
        let artifact = Artifact::Bytecode {
            launcher: PathBuf::from("java"),
            classpath: PathBuf::from("/work"),
            entry: "Main".to_string(),
        };
        let (program, args) = artifact.invocation();
        assert_eq!(program, PathBuf::from("java"));
        assert_eq!(args, vec!["-cp", "/work", "Main"]);
    }

    #[test]
    fn test_all_passed_requires_tests() {
        let now = chrono::Utc::now();
        let summary = RunSummary {
            program_name: "sum".to_string(),
            results: vec![],
            passed_count: 0,
            total_count: 0,
            started_at: now,
            finished_at: now,
        };
        assert!(!summary.all_passed());
    }
}
