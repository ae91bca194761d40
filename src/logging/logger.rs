//! [`tracing`]-backed implementation of [`Log`].
use super::types::{DRY_RUN_TARGET, Log, STAGE_TARGET};

/// Logger that turns every [`Log`] call into a [`tracing`] event.
///
/// Formatting, verbosity filtering and the per-stage line prefix are the
/// subscriber's job (see [`init_subscriber`](super::init_subscriber)); this
/// type only chooses the level and target.
#[derive(Debug, Default, Clone, Copy)]
pub struct Logger;

impl Logger {
    /// Create a new logger.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Log for Logger {
    fn stage(&self, msg: &str) {
        tracing::info!(target: STAGE_TARGET, "{msg}");
    }

    fn info(&self, msg: &str) {
        tracing::info!("{msg}");
    }

    fn debug(&self, msg: &str) {
        tracing::debug!("{msg}");
    }

    fn warn(&self, msg: &str) {
        tracing::warn!("{msg}");
    }

    fn error(&self, msg: &str) {
        tracing::error!("{msg}");
    }

    fn dry_run(&self, msg: &str) {
        tracing::info!(target: DRY_RUN_TARGET, "{msg}");
    }
}
