//! Process side of the action layer.
//!
//! [`SystemExecutor`] resolves programs on `PATH` and runs them to
//! completion; [`DryRunExecutor`] only reports the command it would run.
use anyhow::{Context as _, Result};
use std::fmt;
use std::path::PathBuf;
use std::process::{Command, Output};
use std::sync::Arc;

use crate::error::ExecError;
use crate::logging::Log;

/// Result of a command execution.
#[derive(Debug, Clone, Default)]
pub struct ExecResult {
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// Whether the process exited successfully.
    pub success: bool,
    /// Exit code, if the process was not killed by a signal.
    pub code: Option<i32>,
}

impl From<Output> for ExecResult {
    fn from(output: Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
            code: output.status.code(),
        }
    }
}

/// Runs external programs on behalf of stages.
pub trait Executor: Send + Sync + fmt::Debug {
    /// Run `program` with `args`, waiting for it to exit.
    ///
    /// # Errors
    ///
    /// Returns an error if the program cannot be found or started, or exits
    /// unsuccessfully.
    fn run(&self, program: &str, args: &[&str]) -> Result<ExecResult>;
}

/// Executor that runs commands on the live system.
pub struct SystemExecutor {
    log: Arc<dyn Log>,
}

impl SystemExecutor {
    /// Create an executor that reports the commands it runs at debug level.
    #[must_use]
    pub fn new(log: Arc<dyn Log>) -> Self {
        Self { log }
    }
}

impl fmt::Debug for SystemExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemExecutor")
            .field("log", &"<dyn Log>")
            .finish()
    }
}

impl Executor for SystemExecutor {
    fn run(&self, program: &str, args: &[&str]) -> Result<ExecResult> {
        let path = which::which(program).map_err(|source| ExecError::NotFound {
            program: program.to_string(),
            source,
        })?;
        self.log
            .debug(&format!("RUN {} {args:?}", path.display()));

        let output = Command::new(&path)
            .args(args)
            .output()
            .with_context(|| format!("failed to execute: {}", path.display()))?;
        let result = ExecResult::from(output);
        if !result.success {
            return Err(ExecError::Failed {
                program: program.to_string(),
                code: result.code,
                stderr: result.stderr.trim().to_string(),
            }
            .into());
        }
        Ok(result)
    }
}

/// Executor that reports commands instead of running them.
pub struct DryRunExecutor {
    log: Arc<dyn Log>,
}

impl DryRunExecutor {
    /// Create a dry-run executor that reports through `log`.
    #[must_use]
    pub fn new(log: Arc<dyn Log>) -> Self {
        Self { log }
    }
}

impl fmt::Debug for DryRunExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DryRunExecutor")
            .field("log", &"<dyn Log>")
            .finish()
    }
}

impl Executor for DryRunExecutor {
    fn run(&self, program: &str, args: &[&str]) -> Result<ExecResult> {
        // Unresolvable programs are reported by bare name.
        let path = which::which(program).unwrap_or_else(|_| PathBuf::from(program));
        self.log
            .dry_run(&format!("RUN {} {args:?}", path.display()));
        Ok(ExecResult {
            success: true,
            code: Some(0),
            ..ExecResult::default()
        })
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::stages::test_helpers::RecordingLog;

    fn system() -> (SystemExecutor, Arc<RecordingLog>) {
        let log = Arc::new(RecordingLog::default());
        (SystemExecutor::new(Arc::clone(&log) as Arc<dyn Log>), log)
    }

    #[test]
    fn run_echo() {
        let (executor, _log) = system();
        let result = executor.run("echo", &["hello"]).unwrap();
        assert!(result.success, "echo command should succeed");
        assert_eq!(result.stdout.trim(), "hello");
    }

    #[test]
    fn run_logs_resolved_command_at_debug() {
        let (executor, log) = system();
        executor.run("echo", &["hi"]).unwrap();
        let lines = log.debug_lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("RUN /"), "path should be resolved: {}", lines[0]);
        assert!(lines[0].ends_with("[\"hi\"]"));
    }

    #[test]
    fn run_failure_carries_exit_code() {
        let (executor, _log) = system();
        let err = executor.run("false", &[]).unwrap_err();
        let exec_err = err
            .downcast_ref::<ExecError>()
            .expect("failure should be an ExecError");
        assert!(matches!(
            exec_err,
            ExecError::Failed { code: Some(1), .. }
        ));
    }

    #[test]
    fn run_missing_program_is_not_found() {
        let (executor, _log) = system();
        let err = executor
            .run("this-program-does-not-exist-12345", &[])
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ExecError>(),
            Some(ExecError::NotFound { .. })
        ));
    }

    #[test]
    fn dry_run_reports_and_succeeds() {
        let log = Arc::new(RecordingLog::default());
        let executor = DryRunExecutor::new(Arc::clone(&log) as Arc<dyn Log>);

        let result = executor.run("echo", &["-n", "x"]).unwrap();

        assert!(result.success);
        assert!(result.stdout.is_empty(), "nothing should actually run");
        let lines = log.dry_run_lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("RUN /"));
    }

    #[test]
    fn dry_run_falls_back_to_bare_name() {
        let log = Arc::new(RecordingLog::default());
        let executor = DryRunExecutor::new(Arc::clone(&log) as Arc<dyn Log>);

        executor
            .run("this-program-does-not-exist-12345", &["--flag"])
            .unwrap();

        assert_eq!(
            log.dry_run_lines(),
            vec!["RUN this-program-does-not-exist-12345 [\"--flag\"]".to_string()]
        );
    }
}
