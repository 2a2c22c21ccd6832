use crate::command_spec::CommandSpec;
use crate::error::RunnerError;
use async_trait::async_trait;
use camino::Utf8Path;
use std::process::Stdio;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Buffered output of a completed tool invocation.
///
/// Exit-code interpretation deliberately stays with the caller: a non-zero
/// exit from a lint tool means "violations found", not "tool crashed", while
/// the same exit from `tar` is a hard failure.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    /// Exit code of the process (None if terminated by a signal)
    pub exit_code: Option<i32>,
    /// Captured standard output
    pub stdout: Vec<u8>,
    /// Captured standard error
    pub stderr: Vec<u8>,
}

impl ProcessOutput {
    #[must_use]
    pub fn new(exit_code: Option<i32>, stdout: Vec<u8>, stderr: Vec<u8>) -> Self {
        Self {
            exit_code,
            stdout,
            stderr,
        }
    }

    /// Stdout as a UTF-8 string, lossy conversion.
    #[must_use]
    pub fn stdout_string(&self) -> String {
        String::from_utf8_lossy(&self.stdout).to_string()
    }

    /// Stderr as a UTF-8 string, lossy conversion.
    #[must_use]
    pub fn stderr_string(&self) -> String {
        String::from_utf8_lossy(&self.stderr).to_string()
    }

    /// Whether the process exited with code 0.
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Trait for external tool execution.
///
/// Implementations MUST use argv-style APIs only (no shell string
/// evaluation); [`CommandSpec`] enforces this at the type level.
/// Cancelling the supplied token stops waiting on the subprocess promptly;
/// the native process is killed on a best-effort basis.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Execute a command, capturing stdout and stderr buffered.
    async fn run(
        &self,
        cmd: &CommandSpec,
        cancel: &CancellationToken,
    ) -> Result<ProcessOutput, RunnerError>;
}

/// Production runner on top of `tokio::process`.
#[derive(Debug, Clone, Default)]
pub struct NativeRunner;

impl NativeRunner {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProcessRunner for NativeRunner {
    async fn run(
        &self,
        cmd: &CommandSpec,
        cancel: &CancellationToken,
    ) -> Result<ProcessOutput, RunnerError> {
        let program = cmd.program_name();

        debug!(program = %program, args = cmd.args.len(), "spawning process");

        let mut command = cmd.to_tokio_command();
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = command.spawn().map_err(|source| RunnerError::Spawn {
            program: program.clone(),
            source,
        })?;

        tokio::select! {
            output = child.wait_with_output() => {
                let output = output.map_err(|source| RunnerError::Wait {
                    program: program.clone(),
                    source,
                })?;

                debug!(
                    program = %program,
                    exit_code = ?output.status.code(),
                    "process completed"
                );

                Ok(ProcessOutput::new(
                    output.status.code(),
                    output.stdout,
                    output.stderr,
                ))
            }
            () = cancel.cancelled() => {
                debug!(program = %program, "process wait cancelled");
                Err(RunnerError::Cancelled { program })
            }
        }
    }
}

/// Grant execute permission to a freshly downloaded binary.
///
/// Release artifacts downloaded over HTTP arrive without an execute bit, so
/// this must run before the first invocation on Unix. Failure is a hard
/// failure for that tool's pipeline step. No-op on platforms where the
/// permission bit does not exist.
///
/// # Errors
///
/// Returns [`RunnerError::Permission`] when the permission change fails.
#[cfg(unix)]
pub fn grant_execute_permission(path: &Utf8Path) -> Result<(), RunnerError> {
    use std::os::unix::fs::PermissionsExt;

    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).map_err(|source| {
        RunnerError::Permission {
            path: path.to_owned(),
            source,
        }
    })
}

#[cfg(not(unix))]
pub fn grant_execute_permission(_path: &Utf8Path) -> Result<(), RunnerError> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn token() -> CancellationToken {
        CancellationToken::new()
    }

    #[tokio::test]
    async fn captures_stdout() {
        let cmd = CommandSpec::new("echo").arg("hello");
        let output = NativeRunner::new().run(&cmd, &token()).await.unwrap();
        assert!(output.success());
        assert_eq!(output.stdout_string().trim(), "hello");
        assert!(output.stderr.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn reports_nonzero_exit_code_without_error() {
        let cmd = CommandSpec::new("false");
        let output = NativeRunner::new().run(&cmd, &token()).await.unwrap();
        assert_eq!(output.exit_code, Some(1));
        assert!(!output.success());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn applies_environment_overlay() {
        let cmd = CommandSpec::new("printenv")
            .arg("OASGUARD_TEST_VAR")
            .env("OASGUARD_TEST_VAR", "overlay-value");
        let output = NativeRunner::new().run(&cmd, &token()).await.unwrap();
        assert_eq!(output.stdout_string().trim(), "overlay-value");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn runs_in_requested_working_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let expected = tmp.path().canonicalize().unwrap();
        let cmd = CommandSpec::new("pwd").cwd(tmp.path());
        let output = NativeRunner::new().run(&cmd, &token()).await.unwrap();
        assert_eq!(output.stdout_string().trim(), expected.to_string_lossy());
    }

    #[tokio::test]
    async fn spawn_failure_is_reported() {
        let cmd = CommandSpec::new("oasguard-definitely-not-a-real-binary");
        let err = NativeRunner::new().run(&cmd, &token()).await.unwrap_err();
        assert!(matches!(err, RunnerError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn cancellation_returns_promptly() {
        let cancel = token();
        let cmd = CommandSpec::new("sleep").arg("5");

        let child_cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            child_cancel.cancel();
        });

        let started = Instant::now();
        let err = NativeRunner::new().run(&cmd, &cancel).await.unwrap_err();
        assert!(err.is_cancelled());
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[cfg(unix)]
    #[test]
    fn grant_execute_permission_sets_mode() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("tool");
        std::fs::write(&path, b"#!/bin/sh\n").unwrap();
        let utf8 = Utf8Path::from_path(&path).unwrap();

        grant_execute_permission(utf8).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o111, 0o111);
    }

    #[cfg(unix)]
    #[test]
    fn grant_execute_permission_fails_on_missing_file() {
        let err = grant_execute_permission(Utf8Path::new("/nonexistent/tool")).unwrap_err();
        assert!(matches!(err, RunnerError::Permission { .. }));
    }
}
