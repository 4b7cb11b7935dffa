use std::path::PathBuf;

use clap::Parser;

use crate::constants::{DEFAULT_MEMORY_LIMIT_MB, DEFAULT_TESTS_DIR, DEFAULT_TIME_LIMIT_SECS};
use crate::core::domain::{ConfigError, DiagnosticPolicy, Language, ResourceLimits};
use crate::native::compiler::Toolchain;

/// Compile a program and judge it against its input/output test pairs
#[derive(Parser, Debug)]
#[command(name = "codejudge", version, long_about = None)]
pub struct Cli {
    /// Program source (.c, .cpp, .java or .py)
    #[arg(value_name = "SOURCE")]
    pub source: PathBuf,

    /// Wall-clock limit per test, in seconds
    #[arg(value_name = "TIME_LIMIT", default_value_t = DEFAULT_TIME_LIMIT_SECS)]
    pub time_limit: f64,

    /// Address-space limit per test, in megabytes
    #[arg(value_name = "MEMORY_LIMIT", default_value_t = DEFAULT_MEMORY_LIMIT_MB)]
    pub memory_limit: u64,

    /// Directory containing `<program>_tests` fixture directories
    #[arg(long, env = "CODEJUDGE_TESTS_DIR", default_value = DEFAULT_TESTS_DIR)]
    pub tests_dir: PathBuf,

    /// Number of tests to run at the same time
    #[arg(short, long, default_value_t = 1)]
    pub jobs: usize,

    /// Judge programs that write to stderr on their stdout alone
    #[arg(long)]
    pub lenient_stderr: bool,

    #[arg(long, env = "CODEJUDGE_GCC", default_value = "gcc")]
    pub gcc: PathBuf,

    #[arg(long, env = "CODEJUDGE_GXX", default_value = "g++")]
    pub gxx: PathBuf,

    #[arg(long, env = "CODEJUDGE_JAVAC", default_value = "javac")]
    pub javac: PathBuf,

    #[arg(long, env = "CODEJUDGE_JAVA", default_value = "java")]
    pub java: PathBuf,

    #[arg(long, env = "CODEJUDGE_PYTHON", default_value = "python3")]
    pub python: PathBuf,
}

/// Everything one run needs, validated.
#[derive(Clone, Debug)]
pub struct JudgeConfig {
    pub source: PathBuf,
    pub language: Language,
    pub program_name: String,
    pub program_dir: PathBuf,
    pub tests_dir: PathBuf,
    pub limits: ResourceLimits,
    pub policy: DiagnosticPolicy,
    pub jobs: usize,
    pub toolchain: Toolchain,
}

impl TryFrom<Cli> for JudgeConfig {
    type Error = ConfigError;

    fn try_from(cli: Cli) -> Result<Self, Self::Error> {
        // Reject unknown languages before touching the filesystem.
        let language = Language::from_path(&cli.source)?;
        let limits = ResourceLimits::new(cli.time_limit, cli.memory_limit)?;
        if cli.jobs == 0 {
            return Err(ConfigError::InvalidJobs);
        }

        let source = std::fs::canonicalize(&cli.source).map_err(|source| ConfigError::ProgramPath {
            path: cli.source.clone(),
            source,
        })?;
        let program_dir = source
            .parent()
            .map(|dir| dir.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("/"));
        let program_name = source
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();

        let policy = if cli.lenient_stderr {
            DiagnosticPolicy::Lenient
        } else {
            DiagnosticPolicy::Strict
        };

        Ok(JudgeConfig {
            source,
            language,
            program_name,
            program_dir,
            tests_dir: cli.tests_dir,
            limits,
            policy,
            jobs: cli.jobs,
            toolchain: Toolchain {
                gcc: cli.gcc,
                gxx: cli.gxx,
                javac: cli.javac,
                java: cli.java,
                python: cli.python,
            },
        })
    }
}
