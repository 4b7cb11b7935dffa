use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use itertools::Itertools;
use thiserror::Error;
use tokio::fs;

use crate::constants::{ACTUAL_RESULTS_DIR, INPUT_PREFIX, OUTPUT_PREFIX, TESTS_DIR_SUFFIX};
use crate::core::domain::TestCase;

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("no test files found in {}", .dir.display())]
    NoTests { dir: PathBuf },
    #[error(
        "input/output files do not pair up: missing outputs for {}, missing inputs for {}",
        fmt_indices(.missing_outputs),
        fmt_indices(.missing_inputs)
    )]
    MismatchedIndices {
        missing_outputs: Vec<u64>,
        missing_inputs: Vec<u64>,
    },
    #[error("more than one {role} file has index {index}")]
    DuplicateIndex { role: &'static str, index: u64 },
    #[error("failed to scan {}: {source}", .dir.display())]
    Io {
        dir: PathBuf,
        source: std::io::Error,
    },
}

fn fmt_indices(indices: &[u64]) -> String {
    if indices.is_empty() {
        "none".to_string()
    } else {
        format!("[{}]", indices.iter().join(", "))
    }
}

/// Directory holding the fixtures of `program_name`.
pub fn tests_dir(tests_root: &Path, program_name: &str) -> PathBuf {
    tests_root.join(format!("{program_name}{TESTS_DIR_SUFFIX}"))
}

/// Finds the `input<N>` / `output<N>` pairs of a program, ordered by `N`,
/// and recreates the directory that receives the program's actual output.
#[tracing::instrument]
pub async fn discover(program_name: &str, tests_root: &Path) -> Result<Vec<TestCase>, DiscoveryError> {
    let dir = tests_dir(tests_root, program_name);

    let (inputs, outputs) = match scan(&dir).await {
        Ok(found) => found,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(DiscoveryError::NoTests { dir });
        }
        Err(source) => return Err(DiscoveryError::Io { dir, source }),
    };

    let inputs = index_files(inputs, INPUT_PREFIX)?;
    let outputs = index_files(outputs, OUTPUT_PREFIX)?;

    if inputs.is_empty() && outputs.is_empty() {
        return Err(DiscoveryError::NoTests { dir });
    }

    let missing_outputs: Vec<u64> = inputs.keys().filter(|i| !outputs.contains_key(*i)).copied().collect();
    let missing_inputs: Vec<u64> = outputs.keys().filter(|i| !inputs.contains_key(*i)).copied().collect();
    if !missing_outputs.is_empty() || !missing_inputs.is_empty() {
        return Err(DiscoveryError::MismatchedIndices {
            missing_outputs,
            missing_inputs,
        });
    }

    let results_dir = dir.join(ACTUAL_RESULTS_DIR);
    recreate_dir(&results_dir)
        .await
        .map_err(|source| DiscoveryError::Io {
            dir: results_dir.clone(),
            source,
        })?;

    let cases: Vec<TestCase> = inputs
        .into_iter()
        .zip(outputs)
        .map(|((index, input_path), (_, expected_output_path))| {
            let file_name = expected_output_path.file_name().unwrap_or_default();
            TestCase {
                index,
                actual_output_path: results_dir.join(file_name),
                input_path,
                expected_output_path,
            }
        })
        .collect();

    tracing::info!("Discovered {} test cases in {}", cases.len(), dir.display());
    Ok(cases)
}

/// Returns `(index, path)` pairs for inputs and outputs, unsorted.
async fn scan(dir: &Path) -> std::io::Result<(Vec<(u64, PathBuf)>, Vec<(u64, PathBuf)>)> {
    let mut inputs = Vec::new();
    let mut outputs = Vec::new();

    let mut entries = fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };

        if let Some(index) = parse_index(name, INPUT_PREFIX) {
            inputs.push((index, entry.path()));
        } else if let Some(index) = parse_index(name, OUTPUT_PREFIX) {
            outputs.push((index, entry.path()));
        }
    }

    Ok((inputs, outputs))
}

/// Parses `N` out of `<prefix><N>.<ext>`.
fn parse_index(file_name: &str, prefix: &str) -> Option<u64> {
    let rest = file_name.strip_prefix(prefix)?;
    let (digits, ext) = rest.split_once('.')?;
    if digits.is_empty() || ext.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

fn index_files(
    files: Vec<(u64, PathBuf)>,
    role: &'static str,
) -> Result<BTreeMap<u64, PathBuf>, DiscoveryError> {
    let mut indexed = BTreeMap::new();
    for (index, path) in files {
        if indexed.insert(index, path).is_some() {
            return Err(DiscoveryError::DuplicateIndex { role, index });
        }
    }
    Ok(indexed)
}

async fn recreate_dir(dir: &Path) -> std::io::Result<()> {
    match fs::remove_dir_all(dir).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    fs::create_dir_all(dir).await
}
