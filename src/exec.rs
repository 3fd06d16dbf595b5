//! Subprocess execution for external tools.
//!
//! The document is fed on stdin while stdout and stderr are drained
//! concurrently, so a tool that interleaves reading and writing can never
//! stall on a full pipe. Every outcome, including spawn failures and
//! timeouts, is reported as an [`ExecResult`] rather than an `Err`.

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;

/// Process-level failure of one execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecError {
    #[error("failed to spawn '{program}': {message}")]
    Spawn { program: String, message: String },

    #[error("process exited with code {code}")]
    Exit { code: i32 },

    #[error("process terminated by signal {signal}")]
    Signal { signal: i32 },

    #[error("I/O error: {0}")]
    Io(String),

    #[error("process timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}

/// Outcome of one subprocess execution.
///
/// `error` being `None` only means the process exited cleanly. The tool may
/// still have reported a failure through its streams.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecResult {
    pub stdout: String,
    pub stderr: String,
    pub error: Option<ExecError>,
}

impl ExecResult {
    pub fn failed(error: ExecError) -> Self {
        Self {
            stdout: String::new(),
            stderr: String::new(),
            error: Some(error),
        }
    }
}

/// What to run: program, arguments and working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

/// Runs a command with the given stdin content.
///
/// Implementations must always resolve to an [`ExecResult`].
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(&self, command: &CommandSpec, input: &str) -> ExecResult;
}

/// [`ProcessRunner`] backed by real child processes.
#[derive(Debug, Clone)]
pub struct SubprocessRunner {
    /// `None` waits forever.
    timeout: Option<Duration>,
}

impl SubprocessRunner {
    /// Create a runner with the given timeout; `0` disables the timeout.
    pub fn new(timeout_ms: u64) -> Self {
        Self {
            timeout: (timeout_ms > 0).then(|| Duration::from_millis(timeout_ms)),
        }
    }
}

impl Default for SubprocessRunner {
    fn default() -> Self {
        Self::new(30_000) // 30 seconds default
    }
}

#[async_trait]
impl ProcessRunner for SubprocessRunner {
    async fn run(&self, command: &CommandSpec, input: &str) -> ExecResult {
        let program = command.program.display().to_string();

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &command.working_dir {
            cmd.current_dir(dir);
        }

        log::debug!("Running {program} {:?}", command.args);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                return ExecResult::failed(ExecError::Spawn {
                    program,
                    message: e.to_string(),
                });
            }
        };

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let mut stdout_buf = Vec::new();
        let mut stderr_buf = Vec::new();

        let completion = async {
            let write = async move {
                let Some(mut stdin) = stdin else {
                    return Ok(());
                };
                let written = stdin.write_all(input.as_bytes()).await;
                let closed = stdin.shutdown().await;
                drop(stdin);
                match written.and(closed) {
                    // The tool stopped reading; its exit status tells the rest.
                    Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => Ok(()),
                    other => other,
                }
            };

            let (written, read_out, read_err) = tokio::join!(
                write,
                read_pipe(stdout, &mut stdout_buf),
                read_pipe(stderr, &mut stderr_buf)
            );
            let status = child.wait().await;
            (written.and(read_out).and(read_err), status)
        };

        let outcome = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, completion).await.ok(),
            None => Some(completion.await),
        };

        let error = match outcome {
            Some((io, Ok(status))) => status_error(status).or_else(|| io.err().map(|e| ExecError::Io(e.to_string()))),
            Some((_, Err(e))) => Some(ExecError::Io(format!("Failed to wait for '{program}': {e}"))),
            None => {
                let timeout_ms = self.timeout.map_or(0, |t| t.as_millis() as u64);
                log::warn!("'{program}' timed out after {timeout_ms}ms, killing it");
                let _ = child.kill().await;
                Some(ExecError::Timeout { timeout_ms })
            }
        };

        ExecResult {
            stdout: String::from_utf8_lossy(&stdout_buf).into_owned(),
            stderr: String::from_utf8_lossy(&stderr_buf).into_owned(),
            error,
        }
    }
}

async fn read_pipe<R: AsyncRead + Unpin>(pipe: Option<R>, buf: &mut Vec<u8>) -> std::io::Result<()> {
    match pipe {
        Some(mut pipe) => pipe.read_to_end(buf).await.map(|_| ()),
        None => Ok(()),
    }
}

fn status_error(status: ExitStatus) -> Option<ExecError> {
    if status.success() {
        return None;
    }
    if let Some(code) = status.code() {
        return Some(ExecError::Exit { code });
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return Some(ExecError::Signal { signal });
        }
    }

    Some(ExecError::Exit { code: -1 })
}
