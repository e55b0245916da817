use std::io::{ErrorKind, Read};
use std::process::{Child, ChildStderr, ChildStdout, Command, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::app::error::AppError;

pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Converts a nonzero exit into `ERR_TOOL_INVOCATION`, keeping the tool's stderr.
    pub fn into_success(self, what: &str, trace_id: &str) -> Result<CommandOutput, AppError> {
        if self.success() {
            return Ok(self);
        }
        let detail = if self.stderr.trim().is_empty() {
            self.stdout.trim()
        } else {
            self.stderr.trim()
        };
        Err(AppError::tool_invocation(
            format!(
                "{what} failed (exit code {}): {detail}",
                self.exit_code
                    .map(|code| code.to_string())
                    .unwrap_or_else(|| "none".to_string())
            ),
            trace_id,
        ))
    }
}

/// How a lifecycle command left the tool: awaited to completion, or only spawned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    Completed(CommandOutput),
    /// Fire-and-forget. The process started; nothing is known about how it ends.
    Spawned,
}

/// Process boundary for every vendor tool call. Adapters only talk to tools through this.
pub trait ToolRunner: Send + Sync {
    fn run(&self, program: &str, args: &[String], trace_id: &str) -> Result<CommandOutput, AppError>;

    /// Starts the process and returns once the spawn succeeded. No completion guarantee.
    fn spawn_detached(&self, program: &str, args: &[String], trace_id: &str) -> Result<(), AppError>;
}

#[derive(Debug, Clone)]
pub struct SystemRunner {
    timeout: Duration,
}

impl SystemRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self::new(DEFAULT_COMMAND_TIMEOUT)
    }
}

impl ToolRunner for SystemRunner {
    fn run(&self, program: &str, args: &[String], trace_id: &str) -> Result<CommandOutput, AppError> {
        debug!(trace_id = %trace_id, program = %program, args = ?args, "run tool");
        run_command_with_timeout(program, args, self.timeout, trace_id)
    }

    fn spawn_detached(&self, program: &str, args: &[String], trace_id: &str) -> Result<(), AppError> {
        debug!(trace_id = %trace_id, program = %program, args = ?args, "spawn detached tool");
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|err| spawn_error(program, err, trace_id))?;

        // Reap the child so a long-lived emulator does not linger as a zombie once it exits.
        let program = program.to_string();
        let trace_id = trace_id.to_string();
        std::thread::spawn(move || {
            let status = child.wait();
            debug!(
                trace_id = %trace_id,
                program = %program,
                exit_code = ?status.ok().and_then(|status| status.code()),
                "detached tool exited"
            );
        });
        Ok(())
    }
}

fn spawn_error(program: &str, err: std::io::Error, trace_id: &str) -> AppError {
    if err.kind() == ErrorKind::NotFound {
        AppError::tool_not_found(format!("{program} not found: {err}"), trace_id)
    } else {
        AppError::tool_invocation(format!("Failed to spawn {program}: {err}"), trace_id)
    }
}

pub fn run_command_with_timeout(
    program: &str,
    args: &[String],
    timeout: Duration,
    trace_id: &str,
) -> Result<CommandOutput, AppError> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|err| spawn_error(program, err, trace_id))?;

    // Both pipes are drained on their own threads; a chatty child would otherwise block once the
    // pipe buffer fills and look like a timeout.
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| AppError::system("Failed to capture stdout", trace_id))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| AppError::system("Failed to capture stderr", trace_id))?;
    let (stdout_handle, stderr_handle) = drain_pipes(stdout, stderr);

    let exit_code = match wait_with_deadline(&mut child, timeout) {
        Ok(code) => code,
        Err(err) => {
            let _ = stdout_handle.join();
            let _ = stderr_handle.join();
            return Err(match err {
                WaitError::TimedOut => AppError::timeout(
                    format!("{program} timed out after {}s", timeout.as_secs()),
                    trace_id,
                ),
                WaitError::Poll(err) => {
                    AppError::system(format!("Failed to poll {program}: {err}"), trace_id)
                }
            });
        }
    };

    let stdout_bytes = stdout_handle.join().unwrap_or_default();
    let stderr_bytes = stderr_handle.join().unwrap_or_default();

    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&stdout_bytes).to_string(),
        stderr: String::from_utf8_lossy(&stderr_bytes).to_string(),
        exit_code,
    })
}

enum WaitError {
    TimedOut,
    Poll(std::io::Error),
}

fn wait_with_deadline(child: &mut Child, timeout: Duration) -> Result<Option<i32>, WaitError> {
    let start = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status.code()),
            Ok(None) => {
                if start.elapsed() > timeout {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(WaitError::TimedOut);
                }
                std::thread::sleep(Duration::from_millis(20));
            }
            Err(err) => return Err(WaitError::Poll(err)),
        }
    }
}

fn drain_pipes(
    stdout: ChildStdout,
    stderr: ChildStderr,
) -> (JoinHandle<Vec<u8>>, JoinHandle<Vec<u8>>) {
    (
        std::thread::spawn(move || read_to_end(stdout)),
        std::thread::spawn(move || read_to_end(stderr)),
    )
}

fn read_to_end(mut reader: impl Read) -> Vec<u8> {
    let mut buffer = Vec::<u8>::new();
    let mut temp = [0u8; 4096];
    loop {
        match reader.read(&mut temp) {
            Ok(0) => break,
            Ok(count) => buffer.extend_from_slice(&temp[..count]),
            Err(_) => break,
        }
    }
    buffer
}
