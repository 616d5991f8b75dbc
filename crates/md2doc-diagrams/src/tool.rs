//! Running local renderer tools with a deadline.

use std::ffi::OsStr;
use std::io::{self, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::RenderErrorKind;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Local tool failure.
#[derive(Debug, thiserror::Error)]
pub(crate) enum ToolError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("{program} timed out after {}s", .timeout.as_secs())]
    Timeout { program: String, timeout: Duration },
    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },
}

impl From<ToolError> for RenderErrorKind {
    fn from(e: ToolError) -> Self {
        match e {
            ToolError::NotFound(program) => Self::Unavailable(program),
            ToolError::Timeout { timeout, .. } => Self::Timeout(timeout),
            other => Self::Tool(other.to_string()),
        }
    }
}

/// Run `program` with `args`, killing it if it outlives `timeout`.
///
/// Stdout is discarded; stderr is captured for error reporting.
pub(crate) fn run<S: AsRef<OsStr>>(
    program: &str,
    args: &[S],
    timeout: Duration,
) -> Result<(), ToolError> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                ToolError::NotFound(program.to_owned())
            } else {
                ToolError::Spawn {
                    program: program.to_owned(),
                    source,
                }
            }
        })?;

    // Drain stderr concurrently so a chatty tool cannot block on a full pipe
    let stderr = child.stderr.take().map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = String::new();
            let _ = pipe.read_to_string(&mut buf);
            buf
        })
    });

    let Some(status) = wait_with_deadline(&mut child, timeout) else {
        // Grandchildren may still hold the pipe; leave the reader detached
        return Err(ToolError::Timeout {
            program: program.to_owned(),
            timeout,
        });
    };
    if status.success() {
        return Ok(());
    }

    let stderr = stderr
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default();
    Err(ToolError::Failed {
        program: program.to_owned(),
        status,
        stderr: stderr.trim().to_owned(),
    })
}

/// Whether `program` runs and exits successfully within `timeout`.
pub(crate) fn probe(program: &str, args: &[&str], timeout: Duration) -> bool {
    match run(program, args, timeout) {
        Ok(()) => {
            tracing::debug!(program, "local renderer available");
            true
        }
        Err(e) => {
            tracing::debug!(program, "local renderer unavailable: {e}");
            false
        }
    }
}

/// Wait for `child`; on timeout kill it and return `None`.
fn wait_with_deadline(child: &mut Child, timeout: Duration) -> Option<ExitStatus> {
    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Some(status),
            Ok(None) if Instant::now() < deadline => thread::sleep(POLL_INTERVAL),
            Ok(None) | Err(_) => {
                let _ = child.kill();
                let _ = child.wait();
                return None;
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_missing_program() {
        let err = run("md2doc-no-such-tool", &["--version"], Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
        assert!(!probe("md2doc-no-such-tool", &[], Duration::from_secs(1)));
    }

    #[test]
    fn test_success_and_failure() {
        assert!(run("sh", &["-c", "exit 0"], Duration::from_secs(5)).is_ok());

        let err = run("sh", &["-c", "echo boom >&2; exit 3"], Duration::from_secs(5)).unwrap_err();
        match err {
            ToolError::Failed { stderr, .. } => assert_eq!(stderr, "boom"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_timeout_kills_process() {
        let started = Instant::now();
        let err = run("sh", &["-c", "sleep 5"], Duration::from_millis(100)).unwrap_err();
        assert!(matches!(err, ToolError::Timeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(4));
    }
}
