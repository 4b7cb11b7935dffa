use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::fs;
use tokio::process::Command;

use crate::constants::EXECUTABLE_EXTENSION;
use crate::core::{
    domain::{Artifact, Language},
    traits::compiler::{CompileError, Compiler},
};

/// Paths of the external tools used to build and launch programs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Toolchain {
    pub gcc: PathBuf,
    pub gxx: PathBuf,
    pub javac: PathBuf,
    pub java: PathBuf,
    pub python: PathBuf,
}

impl Default for Toolchain {
    fn default() -> Self {
        Self {
            gcc: PathBuf::from("gcc"),
            gxx: PathBuf::from("g++"),
            javac: PathBuf::from("javac"),
            java: PathBuf::from("java"),
            python: PathBuf::from("python3"),
        }
    }
}

/// Builds programs next to their source with the host toolchain.
#[derive(Clone, Debug)]
pub struct ToolchainCompiler {
    toolchain: Toolchain,
}

impl ToolchainCompiler {
    pub fn new(toolchain: Toolchain) -> Self {
        Self { toolchain }
    }

    async fn compile_native(
        &self,
        source: &Path,
        compiler: &Path,
        standard: &str,
    ) -> Result<Artifact, CompileError> {
        let output = source.with_extension(EXECUTABLE_EXTENSION);

        let mut cmd = Command::new(compiler);
        cmd.arg(source)
            .arg("-o")
            .arg(&output)
            .arg(standard)
            .arg("-Wall");
        run_tool(cmd, compiler).await?;

        ensure_exists(&output).await?;
        Ok(Artifact::Executable { path: output })
    }

    async fn compile_java(&self, source: &Path) -> Result<Artifact, CompileError> {
        let mut cmd = Command::new(&self.toolchain.javac);
        cmd.arg(source);
        run_tool(cmd, &self.toolchain.javac).await?;

        let classpath = parent_dir(source);
        let entry = stem(source);
        ensure_exists(&classpath.join(format!("{entry}.class"))).await?;

        Ok(Artifact::Bytecode {
            launcher: self.toolchain.java.clone(),
            classpath,
            entry,
        })
    }
}

#[async_trait::async_trait]
impl Compiler for ToolchainCompiler {
    #[tracing::instrument(skip(self))]
    async fn compile(&self, source: &Path, language: Language) -> Result<Artifact, CompileError> {
        fs::metadata(source).await?;

        match language {
            Language::C => self.compile_native(source, &self.toolchain.gcc, "-std=c11").await,
            Language::Cpp => {
                self.compile_native(source, &self.toolchain.gxx, "-std=c++17")
                    .await
            }
            Language::Java => self.compile_java(source).await,
            Language::Python => Ok(Artifact::Script {
                interpreter: self.toolchain.python.clone(),
                script: source.to_path_buf(),
            }),
        }
    }
}

async fn run_tool(mut cmd: Command, tool: &Path) -> Result<(), CompileError> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    tracing::debug!("Running compiler: {:?}", cmd);

    let out = match cmd.output().await {
        Ok(out) => out,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(CompileError::ToolchainMissing {
                tool: tool.to_path_buf(),
            });
        }
        Err(e) => return Err(e.into()),
    };

    if !out.status.success() {
        let mut stderr = String::from_utf8_lossy(&out.stderr).to_string();
        if stderr.trim().is_empty() {
            stderr = String::from_utf8_lossy(&out.stdout).to_string();
        }
        return Err(CompileError::CompilationFailed { stderr });
    }
    Ok(())
}

async fn ensure_exists(path: &Path) -> Result<(), CompileError> {
    if fs::try_exists(path).await.unwrap_or(false) {
        Ok(())
    } else {
        Err(CompileError::ArtifactMissing {
            path: path.to_path_buf(),
        })
    }
}

fn parent_dir(source: &Path) -> PathBuf {
    match source.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn stem(source: &Path) -> String {
    source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn gcc_path() -> String {
        std::env::var("GCC_PATH").unwrap_or_else(|_| "gcc".to_string())
    }

    async fn gcc_available() -> bool {
        Command::new(gcc_path())
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }

    const CORRECT_CODE: &str = "
        #include <stdio.h>
        int main(void) {
            int a, b;
            if (scanf(\"%d %d\", &a, &b) != 2) return 1;
            printf(\"%d\\n\", a + b);
            return 0;
        }";

    const INCORRECT_CODE: &str = "
        #include <stdio.h>
        int main(void) {
            printf(\"missing semicolon\\n\")
            return 0;
        }";

    async fn write_source(name: &str, code: &str) -> (PathBuf, PathBuf) {
        let dir = std::env::temp_dir().join(format!("codejudge_compile_{}", Uuid::new_v4()));
        fs::create_dir_all(&dir).await.unwrap();
        let source = dir.join(name);
        fs::write(&source, code).await.unwrap();
        (dir, source)
    }

    fn compiler() -> ToolchainCompiler {
        ToolchainCompiler::new(Toolchain {
            gcc: PathBuf::from(gcc_path()),
            ..Toolchain::default()
        })
    }

    #[tokio::test]
    async fn test_compile_c_success() {
        if !gcc_available().await {
            eprintln!("gcc not available, skipping");
            return;
        }
        let (dir, source) = write_source("sum.c", CORRECT_CODE).await;

        let artifact = compiler().compile(&source, Language::C).await.unwrap();

        assert_eq!(
            artifact,
            Artifact::Executable {
                path: dir.join("sum.out")
            }
        );
        let out = Command::new("/bin/sh")
            .arg("-c")
            .arg(format!("echo '2 3' | {}", dir.join("sum.out").display()))
            .output()
            .await
            .expect("Failed to run executable");
        assert_eq!(String::from_utf8_lossy(&out.stdout), "5\n");
        fs::remove_dir_all(dir).await.unwrap();
    }

    #[tokio::test]
    async fn test_compile_c_error() {
        if !gcc_available().await {
            eprintln!("gcc not available, skipping");
            return;
        }
        let (dir, source) = write_source("broken.c", INCORRECT_CODE).await;

        let result = compiler().compile(&source, Language::C).await;

        match result {
            Err(CompileError::CompilationFailed { stderr }) => assert!(!stderr.is_empty()),
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(!dir.join("broken.out").exists());
        fs::remove_dir_all(dir).await.unwrap();
    }

    #[tokio::test]
    async fn test_compiler_not_found() {
        let (dir, source) = write_source("sum.cpp", CORRECT_CODE).await;
        let compiler = ToolchainCompiler::new(Toolchain {
            gxx: PathBuf::from("/aboba/g++"),
            ..Toolchain::default()
        });

        let result = compiler.compile(&source, Language::Cpp).await;

        assert!(matches!(result, Err(CompileError::ToolchainMissing { ref tool }) if tool == Path::new("/aboba/g++")));
        fs::remove_dir_all(dir).await.unwrap();
    }

    #[tokio::test]
    async fn test_python_needs_no_compilation() {
        let (dir, source) = write_source("sum.py", "print(4)\n").await;

        let artifact = compiler().compile(&source, Language::Python).await.unwrap();

        assert_eq!(
            artifact,
            Artifact::Script {
                interpreter: PathBuf::from("python3"),
                script: source.clone(),
            }
        );
        fs::remove_dir_all(dir).await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_source() {
        let result = compiler()
            .compile(Path::new("/nonexistent/sum.py"), Language::Python)
            .await;
        assert!(matches!(result, Err(CompileError::Io(_))));
    }

    #[test]
    fn test_java_entry_naming() {
        assert_eq!(stem(Path::new("/work/Main.java")), "Main");
        assert_eq!(parent_dir(Path::new("/work/Main.java")), PathBuf::from("/work"));
        assert_eq!(parent_dir(Path::new("Main.java")), PathBuf::from("."));
    }
}
