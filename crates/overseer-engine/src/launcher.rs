//! External process launching and supervision.

use chrono::{DateTime, Utc};
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use overseer_core::{InvocationStatus, PlannedInvocation, StopReason};

use crate::error::{EngineError, EngineResult};

/// Default cap on captured bytes per stream (8 MiB).
pub const DEFAULT_OUTPUT_CAP: usize = 8 * 1024 * 1024;

/// How long to wait for output readers once the process is gone.
const READER_GRACE: Duration = Duration::from_secs(2);

/// Launcher settings
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    /// Command prepended when an invocation requests elevation (e.g. `["sudo", "-n"]`)
    pub elevation_command: Vec<String>,
    /// Maximum bytes kept per output stream; the rest is drained and dropped
    pub output_cap: usize,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            elevation_command: Vec::new(),
            output_cap: DEFAULT_OUTPUT_CAP,
        }
    }
}

/// Bytes captured from one output stream
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Captured {
    /// Captured bytes, at most the configured cap
    pub bytes: Vec<u8>,
    /// More output was produced than kept
    pub truncated: bool,
}

impl Captured {
    /// Captured bytes as text
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }

    /// Returns true if nothing (or only whitespace) was captured
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.bytes.iter().all(u8::is_ascii_whitespace)
    }
}

/// Spawns planned invocations
#[derive(Debug, Clone, Default)]
pub struct Launcher {
    options: LaunchOptions,
}

impl Launcher {
    /// Create a launcher with the given options
    #[must_use]
    pub const fn new(options: LaunchOptions) -> Self {
        Self { options }
    }

    /// Start an invocation without waiting for it.
    ///
    /// The returned handle is already `Running`.
    pub fn launch(&self, invocation: &PlannedInvocation) -> EngineResult<ProcessHandle> {
        let executable = invocation
            .executable
            .as_deref()
            .ok_or_else(|| EngineError::Unresolved {
                tool: invocation.tool.clone(),
            })?;

        let mut cmd = match self.options.elevation_command.split_first() {
            Some((program, prefix)) if invocation.elevate => {
                let mut cmd = Command::new(program);
                cmd.args(prefix).arg(executable);
                cmd
            }
            _ => {
                if invocation.elevate {
                    info!(tool = %invocation.tool, "elevation requested but no elevation command is configured");
                }
                Command::new(executable)
            }
        };

        cmd.args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if invocation.working_dir.is_dir() {
            cmd.current_dir(&invocation.working_dir);
        }

        let mut child = cmd.spawn().map_err(|source| EngineError::Launch {
            tool: invocation.tool.clone(),
            source,
        })?;

        let pid = child.id();
        let cap = self.options.output_cap;
        let stdout = child.stdout.take().map(|s| tokio::spawn(capture(s, cap)));
        let stderr = child.stderr.take().map(|s| tokio::spawn(capture(s, cap)));

        debug!(tool = %invocation.tool, pid, executable = %executable.display(), "launched");

        Ok(ProcessHandle {
            tool: invocation.tool.clone(),
            pid,
            started_at: Utc::now(),
            started: Instant::now(),
            status: InvocationStatus::Running,
            exit_code: None,
            stop_reason: None,
            error: None,
            child,
            stdout,
            stderr,
        })
    }
}

async fn capture<R: AsyncRead + Unpin>(mut reader: R, cap: usize) -> Captured {
    let mut captured = Captured::default();
    let mut buf = vec![0u8; 16 * 1024];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                let room = cap.saturating_sub(captured.bytes.len());
                if n > room {
                    captured.truncated = true;
                }
                captured.bytes.extend_from_slice(&buf[..n.min(room)]);
            }
        }
    }
    captured
}

/// A launched process, owned by whoever drives it
#[derive(Debug)]
pub struct ProcessHandle {
    tool: String,
    pid: Option<u32>,
    started_at: DateTime<Utc>,
    started: Instant,
    status: InvocationStatus,
    exit_code: Option<i32>,
    stop_reason: Option<StopReason>,
    error: Option<String>,
    child: Child,
    stdout: Option<JoinHandle<Captured>>,
    stderr: Option<JoinHandle<Captured>>,
}

impl ProcessHandle {
    /// Logical tool name
    #[must_use]
    pub fn tool(&self) -> &str {
        &self.tool
    }

    /// OS process id
    #[must_use]
    pub const fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Launch time
    #[must_use]
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Current status
    #[must_use]
    pub const fn status(&self) -> InvocationStatus {
        self.status
    }

    /// Wait for the process to exit, killing it if `timeout` elapses first.
    ///
    /// Returns immediately on a terminal handle. Cancel-safe: dropping the
    /// future leaves the process running and the handle usable.
    pub async fn wait(&mut self, timeout: Option<Duration>) -> InvocationStatus {
        if self.status.is_terminal() {
            return self.status;
        }

        let waited = match timeout {
            Some(limit) => tokio::time::timeout(limit, self.child.wait()).await.ok(),
            None => Some(self.child.wait().await),
        };

        match waited {
            Some(Ok(exit)) => self.record_exit(exit),
            Some(Err(e)) => {
                warn!(tool = %self.tool, error = %e, "failed to wait for process");
                self.error = Some(e.to_string());
                self.status = InvocationStatus::Failed;
            }
            None => {
                warn!(tool = %self.tool, pid = self.pid, "hard ceiling reached, killing");
                self.terminate().await;
                self.stop_reason = Some(StopReason::CeilingReached);
                self.status = InvocationStatus::TimedOut;
            }
        }
        self.status
    }

    /// Forcibly stop the process.
    ///
    /// A no-op on terminal handles. A process that already exited on its own
    /// keeps its natural status.
    pub async fn kill(&mut self, reason: StopReason) -> InvocationStatus {
        if self.status.is_terminal() {
            return self.status;
        }
        if let Ok(Some(exit)) = self.child.try_wait() {
            self.record_exit(exit);
            return self.status;
        }

        debug!(tool = %self.tool, pid = self.pid, %reason, "killing");
        self.terminate().await;
        self.stop_reason = Some(reason);
        self.status = InvocationStatus::Killed;
        self.status
    }

    async fn terminate(&mut self) {
        if let Err(e) = self.child.start_kill() {
            debug!(tool = %self.tool, error = %e, "kill signal failed");
        }
        if let Err(e) = self.child.wait().await {
            warn!(tool = %self.tool, error = %e, "failed to reap killed process");
        }
    }

    fn record_exit(&mut self, exit: ExitStatus) {
        self.exit_code = exit.code();
        self.status = if exit.success() {
            InvocationStatus::Succeeded
        } else {
            InvocationStatus::Failed
        };
        debug!(tool = %self.tool, code = ?self.exit_code, status = %self.status, "exited");
    }

    /// Collect captured output; kills the process first if it is still running.
    pub async fn finish(mut self) -> ProcessOutput {
        if !self.status.is_terminal() {
            self.kill(StopReason::SessionEnded).await;
        }

        let stdout = join_reader(self.stdout.take()).await;
        let stderr = join_reader(self.stderr.take()).await;
        let elapsed = self.started.elapsed();

        ProcessOutput {
            status: self.status,
            exit_code: self.exit_code,
            stop_reason: self.stop_reason,
            error: self.error,
            pid: self.pid,
            started_at: self.started_at,
            finished_at: Utc::now(),
            elapsed,
            stdout,
            stderr,
        }
    }
}

async fn join_reader(reader: Option<JoinHandle<Captured>>) -> Captured {
    let Some(mut task) = reader else {
        return Captured::default();
    };
    match tokio::time::timeout(READER_GRACE, &mut task).await {
        Ok(Ok(captured)) => captured,
        Ok(Err(_)) => Captured::default(),
        Err(_) => {
            // A grandchild still holds the pipe open.
            task.abort();
            Captured::default()
        }
    }
}

/// Everything known about a process once it is terminal
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    /// Terminal status
    pub status: InvocationStatus,
    /// Exit code, if the process exited on its own
    pub exit_code: Option<i32>,
    /// Why it was stopped, if it was
    pub stop_reason: Option<StopReason>,
    /// Supervision failure, if any
    pub error: Option<String>,
    /// OS process id
    pub pid: Option<u32>,
    /// Launch time
    pub started_at: DateTime<Utc>,
    /// Time output was collected
    pub finished_at: DateTime<Utc>,
    /// Wall-clock runtime
    pub elapsed: Duration,
    /// Captured standard output
    pub stdout: Captured,
    /// Captured standard error
    pub stderr: Captured,
}
