pub const DEFAULT_TIME_LIMIT_SECS: f64 = 12.0;
pub const DEFAULT_MEMORY_LIMIT_MB: u64 = 128;
pub const DEFAULT_TESTS_DIR: &str = "test_cases";

pub const TESTS_DIR_SUFFIX: &str = "_tests";
pub const ACTUAL_RESULTS_DIR: &str = "actual_results";
pub const INPUT_PREFIX: &str = "input";
pub const OUTPUT_PREFIX: &str = "output";

/// Extension given to native executables next to their source.
pub const EXECUTABLE_EXTENSION: &str = "out";

/// Max stderr bytes kept in a test result for the report.
pub const DIAGNOSTIC_EXCERPT_BYTES: usize = 512;

/// Messages runtimes print when an allocation fails under the address-space limit.
pub const ALLOCATION_FAILURE_MARKERS: &[&str] = &[
    "std::bad_alloc",
    "MemoryError",
    "java.lang.OutOfMemoryError",
    "Cannot allocate memory",
];
