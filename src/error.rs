//! Typed errors for the installer.
//!
//! Stage and resource code works with [`anyhow::Error`]; the pipeline
//! boundaries (setup, parsing, running) turn failures into the types below so
//! the binary can pick an exit status without inspecting messages.
//!
//! ```text
//! InstallError
//! ├── Setup(SetupError)    bad system root, chroot failure
//! ├── Parse(ParseError)    unknown stage, bad flags, failed validation, help
//! └── Stage(StageFailure)  a stage's run() failed
//! ```

use std::path::PathBuf;

use thiserror::Error;

/// Failures that happen before any stage is constructed.
#[derive(Error, Debug)]
pub enum SetupError {
    /// The system root is not an absolute path.
    #[error("system root {} is not an absolute path", .0.display())]
    RelativeRoot(PathBuf),

    /// The chroot system call failed.
    #[error("unable to chroot to {}: {source}", .path.display())]
    Chroot {
        /// Requested new root.
        path: PathBuf,
        /// Underlying OS error.
        source: std::io::Error,
    },
}

/// Failures while turning the stage arguments into a stage sequence.
#[derive(Error, Debug)]
pub enum ParseError {
    /// No stage is registered under this name.
    #[error("unable to create stage {stage:?}: unrecognized stage name")]
    UnknownStage {
        /// The unrecognized name.
        stage: String,
    },

    /// The stage factory failed.
    #[error("unable to create stage {stage:?}: {reason}")]
    Construct {
        /// Stage being constructed.
        stage: String,
        /// Full error chain from the factory.
        reason: String,
    },

    /// The stage's flags could not be parsed.
    #[error("error parsing {stage:?} arguments: {message}")]
    Arguments {
        /// Stage whose flags failed to parse.
        stage: String,
        /// First line of the parser's message.
        message: String,
        /// Parser error, including usage.
        #[source]
        source: clap::Error,
    },

    /// The stage rejected its configuration.
    #[error("unable to configure stage {stage:?}: {reason}")]
    Invalid {
        /// Stage that failed validation.
        stage: String,
        /// Full error chain from validation.
        reason: String,
    },

    /// `-h`/`--help` was given to a stage. Not a failure.
    #[error("help requested for stage {stage:?}")]
    HelpRequested {
        /// Stage whose help was requested.
        stage: String,
        /// Rendered help text.
        usage: String,
    },
}

impl ParseError {
    /// Build an [`ParseError::Arguments`] from a clap error, keeping only
    /// the first line of its message for display.
    #[must_use]
    pub fn arguments(stage: &str, source: clap::Error) -> Self {
        let rendered = source.to_string();
        let message = rendered
            .lines()
            .next()
            .unwrap_or_default()
            .trim_start_matches("error: ")
            .to_string();
        Self::Arguments {
            stage: stage.to_string(),
            message,
            source,
        }
    }
}

/// A stage's `run` failed; later stages were abandoned.
#[derive(Error, Debug)]
#[error("fatal error in stage {stage:?} ({position}/{total}): {reason}")]
pub struct StageFailure {
    /// 1-based position of the failed stage.
    pub position: usize,
    /// Number of stages in the sequence.
    pub total: usize,
    /// Name of the failed stage.
    pub stage: String,
    /// Full error chain from the stage.
    pub reason: String,
}

/// Failures of the action layer's process execution.
#[derive(Error, Debug)]
pub enum ExecError {
    /// The program could not be resolved on `PATH`.
    #[error("unable to locate {program:?}: {source}")]
    NotFound {
        /// Program name as requested.
        program: String,
        /// Resolution error.
        source: which::Error,
    },

    /// The program ran but exited unsuccessfully.
    #[error("{program} failed (exit {}): {stderr}", exit_label(.code))]
    Failed {
        /// Program name as requested.
        program: String,
        /// Exit code, or `None` if killed by a signal.
        code: Option<i32>,
        /// Trimmed standard error.
        stderr: String,
    },
}

fn exit_label(code: &Option<i32>) -> String {
    code.map_or_else(|| "signal".to_string(), |c| c.to_string())
}

/// Top-level error returned by [`commands::install::run`](crate::commands::install::run).
#[derive(Error, Debug)]
pub enum InstallError {
    /// Setup failed before any stage was parsed.
    #[error(transparent)]
    Setup(#[from] SetupError),

    /// The stage arguments were invalid, or help was requested.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// A stage failed while running.
    #[error(transparent)]
    Stage(#[from] StageFailure),
}

impl InstallError {
    /// Process exit status for this error: `2` for a help request, `1`
    /// for everything else.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Parse(ParseError::HelpRequested { .. }) => 2,
            _ => 1,
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn unknown_stage_display() {
        let e = ParseError::UnknownStage {
            stage: "bogus".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "unable to create stage \"bogus\": unrecognized stage name"
        );
    }

    #[test]
    fn invalid_display_names_stage() {
        let e = ParseError::Invalid {
            stage: "get-address".to_string(),
            reason: "timeout (-5s) may not be < 0".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "unable to configure stage \"get-address\": timeout (-5s) may not be < 0"
        );
    }

    #[test]
    fn arguments_keeps_first_line_only() {
        let source = clap::Error::raw(
            clap::error::ErrorKind::UnknownArgument,
            "unexpected argument '-x' found\n\nUsage: stage [OPTIONS]\n",
        );
        let e = ParseError::arguments("stage-a", source);
        assert_eq!(
            e.to_string(),
            "error parsing \"stage-a\" arguments: unexpected argument '-x' found"
        );
    }

    #[test]
    fn stage_failure_display() {
        let e = StageFailure {
            position: 2,
            total: 3,
            stage: "enable-services".to_string(),
            reason: "service \"sshd\" not found".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "fatal error in stage \"enable-services\" (2/3): service \"sshd\" not found"
        );
    }

    #[test]
    fn chroot_display_includes_path() {
        let e = SetupError::Chroot {
            path: PathBuf::from("/mnt/target"),
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        };
        assert!(e.to_string().contains("/mnt/target"));
    }

    #[test]
    fn exec_failed_display() {
        let e = ExecError::Failed {
            program: "dhcpcd".to_string(),
            code: Some(1),
            stderr: "timed out".to_string(),
        };
        assert_eq!(e.to_string(), "dhcpcd failed (exit 1): timed out");

        let killed = ExecError::Failed {
            program: "dhcpcd".to_string(),
            code: None,
            stderr: String::new(),
        };
        assert!(killed.to_string().contains("exit signal"));
    }

    #[test]
    fn exit_codes() {
        let help: InstallError = ParseError::HelpRequested {
            stage: "get-address".to_string(),
            usage: String::new(),
        }
        .into();
        assert_eq!(help.exit_code(), 2);

        let unknown: InstallError = ParseError::UnknownStage {
            stage: "x".to_string(),
        }
        .into();
        assert_eq!(unknown.exit_code(), 1);

        let setup: InstallError = SetupError::RelativeRoot(PathBuf::from("rel")).into();
        assert_eq!(setup.exit_code(), 1);

        let stage: InstallError = StageFailure {
            position: 1,
            total: 1,
            stage: "a".to_string(),
            reason: "boom".to_string(),
        }
        .into();
        assert_eq!(stage.exit_code(), 1);
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn error_types_are_send_sync() {
        assert_send_sync::<SetupError>();
        assert_send_sync::<ParseError>();
        assert_send_sync::<StageFailure>();
        assert_send_sync::<ExecError>();
        assert_send_sync::<InstallError>();
    }

    #[test]
    fn exec_error_converts_to_anyhow() {
        let e = ExecError::Failed {
            program: "x".to_string(),
            code: Some(2),
            stderr: String::new(),
        };
        let _anyhow_err: anyhow::Error = e.into();
    }
}
