use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::exec::{DryRunExecutor, Executor, SystemExecutor};
use crate::logging::Log;
use crate::operations::{DryRunFileSystemOps, FileSystemOps, SystemFileSystemOps};
use crate::root::SystemRoot;

/// Whether actions are performed or only reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Mutate the system.
    Live,
    /// Report every mutation through the logger instead of performing it.
    DryRun,
}

impl ExecutionMode {
    /// Map the `--dry-run` flag onto a mode.
    #[must_use]
    pub const fn from_dry_run(dry_run: bool) -> Self {
        if dry_run { Self::DryRun } else { Self::Live }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Live => write!(f, "live"),
            Self::DryRun => write!(f, "dry-run"),
        }
    }
}

/// Shared context for stage execution.
///
/// Built once after global flags are parsed. The action set in `fs_ops` and
/// `executor` is chosen from `mode` here, so stage code never checks the
/// mode before acting.
pub struct Context {
    /// Live or dry-run.
    pub mode: ExecutionMode,
    /// Root every provisioning path is resolved under.
    pub root: SystemRoot,
    /// Logger for console output.
    pub log: Arc<dyn Log>,
    /// Filesystem half of the action layer.
    pub fs_ops: Arc<dyn FileSystemOps>,
    /// Process half of the action layer.
    pub executor: Arc<dyn Executor>,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("mode", &self.mode)
            .field("root", &self.root)
            .field("log", &"<dyn Log>")
            .field("fs_ops", &self.fs_ops)
            .field("executor", &self.executor)
            .finish()
    }
}

impl Context {
    /// Creates a new context, selecting the live or dry-run action set.
    #[must_use]
    pub fn new(mode: ExecutionMode, root: SystemRoot, log: Arc<dyn Log>) -> Self {
        let (fs_ops, executor): (Arc<dyn FileSystemOps>, Arc<dyn Executor>) = match mode {
            ExecutionMode::Live => (
                Arc::new(SystemFileSystemOps),
                Arc::new(SystemExecutor::new(Arc::clone(&log))),
            ),
            ExecutionMode::DryRun => (
                Arc::new(DryRunFileSystemOps::new(Arc::clone(&log))),
                Arc::new(DryRunExecutor::new(Arc::clone(&log))),
            ),
        };
        Self {
            mode,
            root,
            log,
            fs_ops,
            executor,
        }
    }

    /// Whether mutations are only reported.
    #[must_use]
    pub fn is_dry_run(&self) -> bool {
        self.mode == ExecutionMode::DryRun
    }

    /// Resolve an in-system path beneath the system root.
    #[must_use]
    pub fn in_root(&self, path: impl AsRef<Path>) -> PathBuf {
        self.root.join(path)
    }

    /// Replace the [`FileSystemOps`] implementation.
    ///
    /// Used in tests to wrap the action set in a recording double.
    #[cfg(test)]
    #[must_use]
    pub fn with_fs_ops(mut self, fs_ops: Arc<dyn FileSystemOps>) -> Self {
        self.fs_ops = fs_ops;
        self
    }

    /// Replace the [`Executor`] implementation.
    #[cfg(test)]
    #[must_use]
    pub fn with_executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.executor = executor;
        self
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::stages::test_helpers::RecordingLog;

    fn context(mode: ExecutionMode, root: &str) -> (Context, Arc<RecordingLog>) {
        let log = Arc::new(RecordingLog::default());
        let ctx = Context::new(mode, SystemRoot::new(root).unwrap(), log.clone());
        (ctx, log)
    }

    #[test]
    fn mode_from_flag() {
        assert_eq!(ExecutionMode::from_dry_run(true), ExecutionMode::DryRun);
        assert_eq!(ExecutionMode::from_dry_run(false), ExecutionMode::Live);
    }

    #[test]
    fn in_root_joins_under_root() {
        let (ctx, _log) = context(ExecutionMode::Live, "/mnt/target");
        assert_eq!(
            ctx.in_root("/etc/sv"),
            PathBuf::from("/mnt/target/etc/sv")
        );
    }

    #[test]
    fn dry_run_context_selects_reporting_action_set() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, log) = context(ExecutionMode::DryRun, dir.path().to_str().unwrap());
        assert!(ctx.is_dry_run());

        ctx.fs_ops
            .create_dir_all(&ctx.in_root("/a/b"), 0o755)
            .unwrap();
        ctx.executor.run("dhcpcd", &["-w"]).unwrap();

        assert!(!dir.path().join("a").exists());
        assert_eq!(log.dry_run_lines().len(), 2);
    }

    #[test]
    fn live_context_mutates() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, log) = context(ExecutionMode::Live, dir.path().to_str().unwrap());
        assert!(!ctx.is_dry_run());

        ctx.fs_ops
            .create_dir_all(&ctx.in_root("/a/b"), 0o755)
            .unwrap();

        assert!(dir.path().join("a/b").is_dir());
        assert!(log.dry_run_lines().is_empty());
    }

    #[test]
    fn debug_format_includes_key_fields() {
        let (ctx, _log) = context(ExecutionMode::DryRun, "/");
        let debug = format!("{ctx:?}");
        assert!(debug.contains("DryRun"));
        assert!(debug.contains("DryRunFileSystemOps"));
        assert!(debug.contains("DryRunExecutor"));
    }
}
