use std::sync::Arc;

use crate::cli::Cli;
use crate::error::InstallError;
use crate::logging::Log;
use crate::root::{SystemRoot, set_chroot};
use crate::stages::{Context, ExecutionMode, StageRegistry, run_stages};

/// Run the stages named on the command line with the built-in registry.
///
/// # Errors
///
/// See [`run_with_registry`].
pub fn run(cli: &Cli, log: Arc<dyn Log>) -> Result<(), InstallError> {
    run_with_registry(cli, &StageRegistry::builtin(), log)
}

/// Validate the root, chroot, build the context, parse the stage arguments
/// against `registry`, then run the stages in order.
///
/// Nothing is mutated until every stage has parsed and validated.
///
/// # Errors
///
/// Returns [`InstallError::Setup`] for a relative root or failed chroot,
/// [`InstallError::Parse`] for bad stage arguments (including a help
/// request), or [`InstallError::Stage`] when a stage fails.
pub fn run_with_registry(
    cli: &Cli,
    registry: &StageRegistry,
    log: Arc<dyn Log>,
) -> Result<(), InstallError> {
    log.debug(&format!("vai-installer {}", super::version()));

    let root = SystemRoot::new(&cli.root)?;
    set_chroot(&cli.chroot_path())?;

    let mode = ExecutionMode::from_dry_run(cli.dry_run);
    log.debug(&format!("mode: {mode}, root: {}", root.path().display()));
    let ctx = Context::new(mode, root, log);

    let stages = registry.parse(&cli.stages)?;
    run_stages(&stages, &ctx)?;
    Ok(())
}
