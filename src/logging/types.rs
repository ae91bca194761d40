//! The [`Log`] trait shared by the logger, the dry-run action set, and tests.

/// Tracing target for stage headers.
pub const STAGE_TARGET: &str = "vai::stage";

/// Tracing target for actions reported instead of performed.
pub const DRY_RUN_TARGET: &str = "vai::dry_run";

/// Name of the span the runner opens around each stage.
///
/// The subscriber reads its `position`, `total` and `name` fields to build
/// the `[n/N] name: ` line prefix.
pub const STAGE_SPAN: &str = "stage";

/// Abstraction over logging backends.
///
/// [`Logger`](super::logger::Logger) forwards to [`tracing`]; tests swap in a
/// recording implementation so they can assert on what a stage reported
/// without installing a subscriber.
pub trait Log: Send + Sync {
    /// Log a stage header (major section).
    fn stage(&self, msg: &str);
    /// Log an informational message.
    fn info(&self, msg: &str);
    /// Log a debug message (only shown on the console when verbose).
    fn debug(&self, msg: &str);
    /// Log a warning message.
    fn warn(&self, msg: &str);
    /// Log an error message.
    fn error(&self, msg: &str);
    /// Log an action that a dry run skipped.
    fn dry_run(&self, msg: &str);
}
