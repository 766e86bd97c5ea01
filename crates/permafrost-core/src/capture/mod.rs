//! Subprocess output capture with streamed stdout.
//!
//! [`CommandCapture::run`] spawns an external command, delivers each stdout
//! line to a callback as it becomes available (before the exit status is
//! known), and buffers stderr separately in a temporary spool file. A caller
//! can react to, say, only the first delivered line without buffering the
//! rest.
//!
//! Failure does not invalidate partial success: stdout is always drained and
//! delivered in full, and a non-zero exit is reported through the returned
//! [`CaptureOutcome`] alongside every captured stderr line. Converting a
//! failed outcome into an error is an explicit step (`into_result`), so
//! callers keep whatever they already recorded from the stream.
//!
//! The stderr spool file is removed on every exit path.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use snafu::prelude::*;
use tempfile::NamedTempFile;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::debug;

use crate::error::{
    CaptureError, CommandFailedSnafu, EmptyCommandSnafu, SpawnSnafu, SpoolSnafu, StdoutSnafu,
    TimedOutSnafu, WaitSnafu,
};

/// Result of one subprocess invocation.
///
/// `stderr` holds every line the command wrote to stderr, in order. Stdout
/// is not buffered here; it was streamed to the caller during the run.
#[derive(Debug)]
pub struct CaptureOutcome {
    command: String,
    /// Whether the command exited with status 0.
    pub success: bool,
    /// The exit code, or `None` if the process was killed by a signal.
    pub status: Option<i32>,
    /// Captured stderr lines.
    pub stderr: Vec<String>,
}

impl CaptureOutcome {
    /// The command line this outcome belongs to.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Convert a failed outcome into a [`CaptureError::CommandFailed`]
    /// carrying the captured stderr lines.
    pub fn into_result(self) -> Result<(), CaptureError> {
        if self.success {
            Ok(())
        } else {
            CommandFailedSnafu {
                command: self.command,
                status: self.status,
                stderr: self.stderr,
            }
            .fail()
        }
    }
}

/// Runs external commands, streaming stdout line-by-line.
#[derive(Debug, Clone)]
pub struct CommandCapture {
    spool_dir: PathBuf,
    timeout: Option<Duration>,
}

impl Default for CommandCapture {
    fn default() -> Self {
        Self {
            spool_dir: std::env::temp_dir(),
            timeout: None,
        }
    }
}

impl CommandCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound the whole child interaction (spawn to exit) by `timeout`.
    /// On expiry the child is killed and [`CaptureError::TimedOut`] returned.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Directory for the stderr spool file (defaults to the system temp dir).
    pub fn with_spool_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.spool_dir = dir.into();
        self
    }

    /// Run `command`, delivering each stdout line to `on_line` with a
    /// zero-based index.
    ///
    /// Returns the outcome for both successful and failed exits; errors are
    /// reserved for the capture machinery itself (spawn, IO, timeout).
    pub async fn run<F>(
        &self,
        command: &[String],
        mut on_line: F,
    ) -> Result<CaptureOutcome, CaptureError>
    where
        F: FnMut(&str, usize),
    {
        let (program, args) = command.split_first().context(EmptyCommandSnafu)?;
        let cmd_display = command.join(" ");

        let spool = NamedTempFile::new_in(&self.spool_dir).context(SpoolSnafu)?;
        let stderr_handle = spool.reopen().context(SpoolSnafu)?;

        debug!(command = %cmd_display, "Spawning command");
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::from(stderr_handle))
            .kill_on_drop(true)
            .spawn()
            .context(SpawnSnafu {
                command: cmd_display.clone(),
            })?;

        let stdout = child.stdout.take().expect("stdout is piped");
        let mut lines = BufReader::new(stdout).lines();

        // Drain stdout to EOF before waiting, so every line reaches the
        // caller ahead of any failure report.
        let drain = async {
            let mut index = 0usize;
            while let Some(line) = lines.next_line().await.context(StdoutSnafu {
                command: cmd_display.clone(),
            })? {
                on_line(&line, index);
                index += 1;
            }
            child.wait().await.context(WaitSnafu {
                command: cmd_display.clone(),
            })
        };

        let waited = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, drain).await.map_err(|_| limit),
            None => Ok(drain.await),
        };
        let status = match waited {
            Ok(result) => result?,
            Err(limit) => {
                let _ = child.kill().await;
                return TimedOutSnafu {
                    command: cmd_display,
                    timeout: limit,
                }
                .fail();
            }
        };

        let stderr_text = std::fs::read_to_string(spool.path()).context(SpoolSnafu)?;
        let stderr: Vec<String> = stderr_text.lines().map(str::to_owned).collect();

        // `spool` drops here on every path, removing the temp file.
        Ok(CaptureOutcome {
            command: cmd_display,
            success: status.success(),
            status: status.code(),
            stderr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sh(script: &str) -> Vec<String> {
        vec!["sh".to_string(), "-c".to_string(), script.to_string()]
    }

    fn dir_entry_count(dir: &TempDir) -> usize {
        std::fs::read_dir(dir.path()).unwrap().count()
    }

    #[tokio::test]
    async fn test_streams_stdout_lines_with_indices() {
        let mut seen = Vec::new();
        let outcome = CommandCapture::new()
            .run(&sh("printf 'alpha\\nbeta\\ngamma\\n'"), |line, index| {
                seen.push((line.to_string(), index));
            })
            .await
            .unwrap();

        assert!(outcome.success);
        assert_eq!(
            seen,
            vec![
                ("alpha".to_string(), 0),
                ("beta".to_string(), 1),
                ("gamma".to_string(), 2),
            ]
        );
        assert!(outcome.stderr.is_empty());
    }

    #[tokio::test]
    async fn test_partial_success_preserved_on_failure() {
        let spool_dir = TempDir::new().unwrap();
        let mut seen = Vec::new();

        let outcome = CommandCapture::new()
            .with_spool_dir(spool_dir.path())
            .run(
                &sh("echo one; echo two; echo boom >&2; echo bang >&2; exit 3"),
                |line, index| seen.push((line.to_string(), index)),
            )
            .await
            .unwrap();

        // stdout was delivered in full before the failure surfaced
        assert_eq!(seen, vec![("one".to_string(), 0), ("two".to_string(), 1)]);
        assert!(!outcome.success);
        assert_eq!(outcome.status, Some(3));
        assert_eq!(outcome.stderr, vec!["boom".to_string(), "bang".to_string()]);

        // spool file removed
        assert_eq!(dir_entry_count(&spool_dir), 0);

        let err = outcome.into_result().unwrap_err();
        match err {
            CaptureError::CommandFailed { status, stderr, .. } => {
                assert_eq!(status, Some(3));
                assert_eq!(stderr, vec!["boom".to_string(), "bang".to_string()]);
            }
            other => panic!("expected CommandFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_success_outcome_into_result_is_ok() {
        let outcome = CommandCapture::new()
            .run(&sh("true"), |_, _| {})
            .await
            .unwrap();
        assert!(outcome.into_result().is_ok());
    }

    #[tokio::test]
    async fn test_empty_command_rejected() {
        let err = CommandCapture::new()
            .run(&[], |_, _| {})
            .await
            .unwrap_err();
        assert!(matches!(err, CaptureError::EmptyCommand));
    }

    #[tokio::test]
    async fn test_missing_binary_cleans_spool() {
        let spool_dir = TempDir::new().unwrap();
        let err = CommandCapture::new()
            .with_spool_dir(spool_dir.path())
            .run(
                &["permafrost-no-such-binary".to_string()],
                |_, _| {},
            )
            .await
            .unwrap_err();

        assert!(matches!(err, CaptureError::Spawn { .. }));
        assert_eq!(dir_entry_count(&spool_dir), 0);
    }

    #[tokio::test]
    async fn test_timeout_kills_child_and_cleans_spool() {
        let spool_dir = TempDir::new().unwrap();
        let err = CommandCapture::new()
            .with_spool_dir(spool_dir.path())
            .with_timeout(Duration::from_millis(100))
            .run(&sh("sleep 5"), |_, _| {})
            .await
            .unwrap_err();

        assert!(matches!(err, CaptureError::TimedOut { .. }));
        assert_eq!(dir_entry_count(&spool_dir), 0);
    }
}
