//! Named stages, the registry that builds them from the command line, and
//! the runner that executes them in order.
mod context;
pub mod enable_services;
pub mod get_address;
pub mod registry;

pub use context::{Context, ExecutionMode};
pub use registry::StageRegistry;

use std::fmt;

use anyhow::Result;
use clap::{ArgMatches, Command};

use crate::error::StageFailure;
use crate::logging::STAGE_SPAN;

/// Stages run when none are named, or when the only argument is `default`.
pub const DEFAULT_STAGES: &[&str] = &[get_address::GetAddress::NAME];

/// An independently named, configured, validated and executed unit of
/// provisioning work.
///
/// A stage is built by the [`StageRegistry`], given its own flag namespace
/// through [`configure`](Stage::configure), loaded from the parsed matches,
/// validated, run once, then dropped.
pub trait Stage: fmt::Debug {
    /// Registry name. Never empty.
    fn name(&self) -> &'static str;

    /// Register this stage's options on its flag namespace.
    fn configure(&self, flags: Command) -> Command {
        flags
    }

    /// Read option values back out of the parsed namespace.
    ///
    /// # Errors
    ///
    /// Returns an error if a registered option cannot be extracted.
    fn load(&mut self, matches: &ArgMatches) -> Result<()> {
        let _ = matches;
        Ok(())
    }

    /// Check the loaded configuration before anything runs.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid option.
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    /// Perform the stage's work through `ctx`.
    ///
    /// # Errors
    ///
    /// Returns an error if any action fails; the runner stops there.
    fn run(&self, ctx: &Context) -> Result<()>;
}

/// Run `stages` in order, stopping at the first failure.
///
/// Every line logged while a stage runs carries the `[n/N] name: ` prefix.
/// Stages before a failure are not undone.
///
/// # Errors
///
/// Returns a [`StageFailure`] naming the first stage whose `run` failed.
pub fn run_stages(stages: &[Box<dyn Stage>], ctx: &Context) -> Result<(), StageFailure> {
    let total = stages.len();
    for (index, stage) in stages.iter().enumerate() {
        let position = index + 1;
        let name = stage.name();
        let span = tracing::info_span!(STAGE_SPAN, position, total, name);
        let _entered = span.enter();

        ctx.log.stage(&format!("Beginning stage {name}"));
        if let Err(e) = stage.run(ctx) {
            ctx.log
                .error(&format!("Fatal error in stage {name:?}: {e:#}"));
            return Err(StageFailure {
                position,
                total,
                stage: name.to_string(),
                reason: format!("{e:#}"),
            });
        }
    }
    Ok(())
}

/// Shared helpers for stage and resource unit tests.
///
/// Recording doubles for the [`Log`](crate::logging::Log),
/// [`Executor`](crate::exec::Executor) and
/// [`FileSystemOps`](crate::operations::FileSystemOps) seams, plus a context
/// factory wiring them together over a temporary root.
#[cfg(test)]
#[allow(clippy::expect_used)]
pub mod test_helpers {
    use std::io;
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex, PoisonError};

    use anyhow::Result;

    use super::{Context, ExecutionMode};
    use crate::exec::{ExecResult, Executor};
    use crate::logging::Log;
    use crate::operations::{EntryKind, FileSystemOps};
    use crate::root::SystemRoot;

    /// Which [`Log`] method produced a recorded line.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum LogKind {
        Stage,
        Info,
        Debug,
        Warn,
        Error,
        DryRun,
    }

    /// [`Log`] implementation that keeps every line in memory.
    #[derive(Debug, Default)]
    pub struct RecordingLog {
        entries: Mutex<Vec<(LogKind, String)>>,
    }

    impl RecordingLog {
        fn push(&self, kind: LogKind, msg: &str) {
            self.entries
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push((kind, msg.to_string()));
        }

        /// Every recorded line, in order.
        #[must_use]
        pub fn entries(&self) -> Vec<(LogKind, String)> {
            self.entries
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }

        /// Lines recorded through one method.
        #[must_use]
        pub fn lines(&self, kind: LogKind) -> Vec<String> {
            self.entries()
                .into_iter()
                .filter(|(k, _)| *k == kind)
                .map(|(_, msg)| msg)
                .collect()
        }

        #[must_use]
        pub fn stage_lines(&self) -> Vec<String> {
            self.lines(LogKind::Stage)
        }

        #[must_use]
        pub fn debug_lines(&self) -> Vec<String> {
            self.lines(LogKind::Debug)
        }

        #[must_use]
        pub fn error_lines(&self) -> Vec<String> {
            self.lines(LogKind::Error)
        }

        #[must_use]
        pub fn dry_run_lines(&self) -> Vec<String> {
            self.lines(LogKind::DryRun)
        }
    }

    impl Log for RecordingLog {
        fn stage(&self, msg: &str) {
            self.push(LogKind::Stage, msg);
        }
        fn info(&self, msg: &str) {
            self.push(LogKind::Info, msg);
        }
        fn debug(&self, msg: &str) {
            self.push(LogKind::Debug, msg);
        }
        fn warn(&self, msg: &str) {
            self.push(LogKind::Warn, msg);
        }
        fn error(&self, msg: &str) {
            self.push(LogKind::Error, msg);
        }
        fn dry_run(&self, msg: &str) {
            self.push(LogKind::DryRun, msg);
        }
    }

    /// [`Executor`] that records each command line and never spawns anything.
    #[derive(Debug, Default)]
    pub struct RecordingExecutor {
        calls: Mutex<Vec<Vec<String>>>,
        failure: Option<String>,
    }

    impl RecordingExecutor {
        /// An executor whose every call fails with `message`.
        #[must_use]
        pub fn failing(message: &str) -> Self {
            Self {
                calls: Mutex::default(),
                failure: Some(message.to_string()),
            }
        }

        /// Recorded calls as `[program, args...]`.
        #[must_use]
        pub fn calls(&self) -> Vec<Vec<String>> {
            self.calls
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }
    }

    impl Executor for RecordingExecutor {
        fn run(&self, program: &str, args: &[&str]) -> Result<ExecResult> {
            let mut call = vec![program.to_string()];
            call.extend(args.iter().map(ToString::to_string));
            self.calls
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(call);

            if let Some(message) = &self.failure {
                anyhow::bail!("{message}");
            }
            Ok(ExecResult {
                success: true,
                code: Some(0),
                ..ExecResult::default()
            })
        }
    }

    /// [`FileSystemOps`] wrapper that counts mutating calls before delegating.
    #[derive(Debug)]
    pub struct CountingFileSystemOps {
        inner: Arc<dyn FileSystemOps>,
        mutations: Mutex<Vec<String>>,
    }

    impl CountingFileSystemOps {
        #[must_use]
        pub fn new(inner: Arc<dyn FileSystemOps>) -> Self {
            Self {
                inner,
                mutations: Mutex::default(),
            }
        }

        /// Names of the mutating methods called so far, in order.
        #[must_use]
        pub fn mutations(&self) -> Vec<String> {
            self.mutations
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }

        fn record(&self, op: &str) {
            self.mutations
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(op.to_string());
        }
    }

    impl FileSystemOps for CountingFileSystemOps {
        fn entry_kind(&self, path: &Path) -> io::Result<EntryKind> {
            self.inner.entry_kind(path)
        }

        fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
            self.inner.read_link(path)
        }

        fn symlink(&self, target: &Path, link: &Path) -> Result<()> {
            self.record("symlink");
            self.inner.symlink(target, link)
        }

        fn remove(&self, path: &Path) -> Result<()> {
            self.record("remove");
            self.inner.remove(path)
        }

        fn create_dir(&self, path: &Path, mode: u32) -> Result<()> {
            self.record("create_dir");
            self.inner.create_dir(path, mode)
        }

        fn create_dir_all(&self, path: &Path, mode: u32) -> Result<()> {
            self.record("create_dir_all");
            self.inner.create_dir_all(path, mode)
        }
    }

    /// A [`Context`] plus handles on its recording doubles.
    #[derive(Debug)]
    pub struct TestContext {
        pub ctx: Context,
        pub log: Arc<RecordingLog>,
        pub fs: Arc<CountingFileSystemOps>,
        pub exec: Arc<RecordingExecutor>,
    }

    /// Build a context over `root` whose action set matches `mode`, wrapped in
    /// a [`CountingFileSystemOps`], with a [`RecordingExecutor`] in place of
    /// real processes.
    #[must_use]
    pub fn test_context(mode: ExecutionMode, root: &Path) -> TestContext {
        test_context_with_executor(mode, root, RecordingExecutor::default())
    }

    /// Like [`test_context`], with a caller-supplied executor.
    #[must_use]
    pub fn test_context_with_executor(
        mode: ExecutionMode,
        root: &Path,
        executor: RecordingExecutor,
    ) -> TestContext {
        let log = Arc::new(RecordingLog::default());
        let root = SystemRoot::new(root).expect("test root must be absolute");
        let ctx = Context::new(mode, root, Arc::clone(&log) as Arc<dyn Log>);
        let fs = Arc::new(CountingFileSystemOps::new(Arc::clone(&ctx.fs_ops)));
        let exec = Arc::new(executor);
        let ctx = ctx
            .with_fs_ops(Arc::clone(&fs) as Arc<dyn FileSystemOps>)
            .with_executor(Arc::clone(&exec) as Arc<dyn Executor>);
        TestContext { ctx, log, fs, exec }
    }
}
