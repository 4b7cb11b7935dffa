use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::fs;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::time::{Instant, timeout};

use crate::core::{
    domain::{Artifact, ExecutionOutcome, ResourceLimits, TerminationReason, TestCase},
    traits::executor::{ExecuteError, Executor},
};
use crate::native::limiter::ResourceLimiter;

/// Stderr beyond this is drained but not kept.
const STDERR_CAPTURE_BYTES: usize = 64 * 1024;

/// How long stderr may stay open once the process group is gone. A
/// descendant that left the group can hold the pipe past this.
const STDERR_DRAIN_GRACE: Duration = Duration::from_millis(200);

/// Runs the compiled program directly on the host, one process group per test.
#[derive(Debug, Clone)]
pub struct NativeExecutor {
    artifact: Artifact,
    workdir: PathBuf,
    limiter: Arc<dyn ResourceLimiter>,
}

impl NativeExecutor {
    pub fn new<T>(artifact: Artifact, workdir: T, limiter: Arc<dyn ResourceLimiter>) -> Self
    where
        T: AsRef<Path>,
    {
        NativeExecutor {
            artifact,
            workdir: workdir.as_ref().into(),
            limiter,
        }
    }

    fn command(&self, stdin: std::fs::File, stdout: std::fs::File) -> Command {
        let (program, args) = self.artifact.invocation();

        let mut cmd = Command::new(program);
        cmd.args(args)
            .current_dir(&self.workdir)
            .stdin(Stdio::from(stdin))
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // SAFETY: setpgid is async-signal-safe.
        unsafe {
            cmd.pre_exec(|| {
                if libc::setpgid(0, 0) != 0 {
                    return Err(std::io::Error::last_os_error());
                }
                Ok(())
            });
        }
        self.limiter.configure(&mut cmd);

        cmd
    }
}

#[async_trait::async_trait]
impl Executor for NativeExecutor {
    #[tracing::instrument(skip(self, case, limits), fields(test = case.index))]
    async fn execute(
        &self,
        case: &TestCase,
        limits: &ResourceLimits,
    ) -> Result<ExecutionOutcome, ExecuteError> {
        let stdin = open_fixture(&case.input_path).await?;
        if !fs::try_exists(&case.expected_output_path)
            .await
            .unwrap_or(false)
        {
            return Err(ExecuteError::FixtureMissing {
                path: case.expected_output_path.clone(),
            });
        }

        let stdout = fs::File::create(&case.actual_output_path)
            .await
            .map_err(|e| internal("Failed to create output file", e))?
            .into_std()
            .await;

        let mut cmd = self.command(stdin, stdout);
        tracing::debug!("Spawning {:?}", cmd);

        let start = Instant::now();
        let mut child = cmd
            .spawn()
            .map_err(|e| internal("Failed to spawn process", e))?;
        // The child leads its own group, so its pid is the group id.
        let pgid = child.id().map(|pid| pid as i32);

        let stderr = child.stderr.take().ok_or_else(|| ExecuteError::Internal {
            msg: "Child stderr was not captured".to_string(),
        })?;
        let captured = Arc::new(Mutex::new(Vec::new()));
        let mut stderr_task = tokio::spawn(read_capped(
            stderr,
            STDERR_CAPTURE_BYTES,
            Arc::clone(&captured),
        ));

        let termination = match timeout(limits.time_limit(), child.wait()).await {
            Ok(status) => {
                let status = status.map_err(|e| internal("Failed to wait for process", e))?;
                // Reap anything the program left running so stderr reaches EOF.
                kill_process_group(pgid);
                decode_status(status)
            }
            Err(_) => {
                tracing::debug!("Test {} exceeded {:?}", case.index, limits.time_limit());
                terminate(&mut child, pgid).await;
                TerminationReason::TimedOut
            }
        };
        let elapsed = start.elapsed();

        match timeout(STDERR_DRAIN_GRACE, &mut stderr_task).await {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(e))) => return Err(internal("Failed to read stderr", e)),
            Ok(Err(e)) => return Err(ExecuteError::Internal { msg: e.to_string() }),
            Err(_) => {
                tracing::warn!(
                    "Test {}: stderr still open {:?} after termination, a descendant escaped the process group",
                    case.index,
                    STDERR_DRAIN_GRACE
                );
                stderr_task.abort();
            }
        }
        let stderr = std::mem::take(&mut *captured.lock().unwrap_or_else(PoisonError::into_inner));

        tracing::debug!(
            "Test {} finished: {:?} after {:?}, {} stderr bytes",
            case.index,
            termination,
            elapsed,
            stderr.len()
        );

        Ok(ExecutionOutcome {
            termination,
            stderr,
            elapsed,
        })
    }
}

async fn open_fixture(path: &Path) -> Result<std::fs::File, ExecuteError> {
    match fs::File::open(path).await {
        Ok(file) => Ok(file.into_std().await),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ExecuteError::FixtureMissing {
            path: path.to_path_buf(),
        }),
        Err(e) => Err(internal("Failed to open input file", e)),
    }
}

fn internal(context: &str, e: std::io::Error) -> ExecuteError {
    ExecuteError::Internal {
        msg: format!("{context}: {e}"),
    }
}

fn kill_process_group(pgid: Option<i32>) {
    if let Some(pgid) = pgid {
        // SAFETY: plain syscall; ESRCH just means the group is already gone.
        unsafe {
            libc::killpg(pgid, libc::SIGKILL);
        }
    }
}

async fn terminate(child: &mut Child, pgid: Option<i32>) {
    kill_process_group(pgid);
    if let Err(e) = child.kill().await {
        tracing::debug!("Kill after timeout failed: {}", e);
    }
}

fn decode_status(status: ExitStatus) -> TerminationReason {
    match (status.code(), status.signal()) {
        (Some(code), _) => TerminationReason::Exited(code),
        (None, Some(signal)) => TerminationReason::Signaled(signal),
        (None, None) => TerminationReason::Exited(-1),
    }
}

/// Reads the stream to EOF, keeping at most `cap` bytes in `kept`. What was
/// read stays in `kept` if the task is aborted midway.
async fn read_capped<R: AsyncRead + Unpin>(
    mut reader: R,
    cap: usize,
    kept: Arc<Mutex<Vec<u8>>>,
) -> std::io::Result<()> {
    let mut chunk = [0u8; 4096];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        let mut buf = kept.lock().unwrap_or_else(PoisonError::into_inner);
        let room = cap.saturating_sub(buf.len());
        buf.extend_from_slice(&chunk[..n.min(room)]);
    }
}
