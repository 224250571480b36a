// src/exec/child.rs

//! Drives a spawned child process to completion.
//!
//! Shared by every runner that executes a local process (the subprocess
//! runner and the container CLI runner alike):
//! - stdout/stderr are read line by line, logged live and captured
//! - cancellation or timeout kills the child's whole process group and
//!   surfaces a terminal error
//! - the exit status becomes data in the [`ExecutionResult`]
//!
//! A run is only finished once the child has exited *and* both output pipes
//! reached EOF. Background jobs that inherited a pipe therefore stay under
//! the same timeout and cancellation as the shell itself.

use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::errors::{Result, TaskError};
use crate::task::result::ExecutionResult;

use super::backend::CancellationToken;

/// Which stream a captured line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stream {
    Stdout,
    Stderr,
}

/// Spawn `cmd` and wait for it, honouring `timeout` and `cancel`.
pub async fn run_child(
    mut cmd: Command,
    label: &str,
    warning_on_stderr: bool,
    timeout: Option<Duration>,
    cancel: CancellationToken,
) -> Result<ExecutionResult> {
    if cancel.is_cancelled() {
        return Err(TaskError::Cancelled);
    }

    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    cmd.process_group(0);

    let mut child = cmd
        .spawn()
        .map_err(|e| TaskError::RunnerLaunch(format!("spawning {label}: {e}")))?;
    let pid = child.id();

    info!(runner = %label, pid = ?pid, "started command sequence");

    let stdout = child
        .stdout
        .take()
        .map(|s| spawn_line_reader(s, label.to_string(), Stream::Stdout, warning_on_stderr));
    let stderr = child
        .stderr
        .take()
        .map(|s| spawn_line_reader(s, label.to_string(), Stream::Stderr, warning_on_stderr));

    let outcome = tokio::select! {
        res = wait_and_drain(&mut child, label, stdout, stderr) => res,

        _ = cancel.cancelled() => {
            info!(runner = %label, "cancellation requested; killing process group");
            Err(TaskError::Cancelled)
        }

        _ = deadline(timeout) => {
            let elapsed = timeout.unwrap_or_default();
            warn!(runner = %label, ?elapsed, "timeout reached; killing process group");
            Err(TaskError::TimedOut(elapsed))
        }
    };

    match outcome {
        Ok((status, stdout_lines, stderr_lines)) => {
            let exit_code = status.code().unwrap_or(-1);
            info!(
                runner = %label,
                exit_code,
                success = status.success(),
                "command sequence exited"
            );
            Ok(ExecutionResult {
                exit_code,
                stdout_lines,
                stderr_lines,
            })
        }
        Err(e) => {
            terminate(&mut child, pid, label).await;
            Err(e)
        }
    }
}

async fn wait_and_drain(
    child: &mut Child,
    label: &str,
    stdout: Option<JoinHandle<Vec<String>>>,
    stderr: Option<JoinHandle<Vec<String>>>,
) -> Result<(ExitStatus, Vec<String>, Vec<String>)> {
    let status = child
        .wait()
        .await
        .map_err(|e| TaskError::RunnerLaunch(format!("waiting for {label}: {e}")))?;
    debug!(runner = %label, "process exited; draining output");
    let stdout_lines = collect_lines(stdout).await;
    let stderr_lines = collect_lines(stderr).await;
    Ok((status, stdout_lines, stderr_lines))
}

fn spawn_line_reader<R>(
    reader: R,
    label: String,
    stream: Stream,
    warning_on_stderr: bool,
) -> JoinHandle<Vec<String>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        let mut captured = Vec::new();

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    let line = decode_line(&buf);
                    match stream {
                        Stream::Stdout => info!(runner = %label, "{}", line),
                        Stream::Stderr if warning_on_stderr => warn!(runner = %label, "{}", line),
                        Stream::Stderr => info!(runner = %label, "{}", line),
                    }
                    captured.push(line);
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!(runner = %label, ?stream, error = %e, "reading output stream failed");
                    break;
                }
            }
        }

        debug!(runner = %label, ?stream, "output stream closed");
        captured
    })
}

/// One raw output line as text: line terminator removed, invalid UTF-8
/// replaced with U+FFFD.
fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\n").unwrap_or(bytes);
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

async fn collect_lines(handle: Option<JoinHandle<Vec<String>>>) -> Vec<String> {
    match handle {
        Some(handle) => handle.await.unwrap_or_else(|e| {
            warn!(error = %e, "output reader task failed");
            Vec::new()
        }),
        None => Vec::new(),
    }
}

async fn deadline(timeout: Option<Duration>) {
    match timeout {
        Some(d) => tokio::time::sleep(d).await,
        None => std::future::pending::<()>().await,
    }
}

/// Kill the child and everything it started.
async fn terminate(child: &mut Child, pid: Option<u32>, label: &str) {
    #[cfg(unix)]
    {
        if let Some(pid) = pid {
            kill_process_group(pid, label);
        }
    }
    #[cfg(not(unix))]
    let _ = pid;

    // Already reaped when only the output drain was still pending.
    if let Err(e) = child.kill().await {
        debug!(runner = %label, error = %e, "child process already gone");
    }
}

#[cfg(unix)]
fn kill_process_group(pid: u32, label: &str) {
    let Ok(pgid) = libc::pid_t::try_from(pid) else {
        return;
    };
    // SAFETY: `kill` only sends a signal; the group was created by
    // `process_group(0)` at spawn time and has the child's pid as its id.
    let rc = unsafe { libc::kill(-pgid, libc::SIGKILL) };
    if rc != 0 {
        debug!(
            runner = %label,
            error = %std::io::Error::last_os_error(),
            "process group already gone"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_line_strips_terminators() {
        assert_eq!(decode_line(b"hello\n"), "hello");
        assert_eq!(decode_line(b"hello\r\n"), "hello");
        assert_eq!(decode_line(b"no newline"), "no newline");
        assert_eq!(decode_line(b"\n"), "");
    }

    #[test]
    fn decode_line_keeps_invalid_utf8_lossily() {
        assert_eq!(decode_line(b"caf\xe9\n"), "caf\u{fffd}");
    }
}
