use std::path::PathBuf;

use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser};

/// Top-level CLI entry point for the installer.
///
/// Global flags come first; everything from the first positional on is a
/// sequence of stage names, each followed by its own flags.
#[derive(Parser, Debug)]
#[command(
    name = "vai-installer",
    about = "Staged, idempotent system provisioning",
    version = crate::commands::version()
)]
pub struct Cli {
    /// Chroot to this directory before any stage runs
    #[arg(short = 'C', long, value_name = "PATH")]
    pub chroot: Option<PathBuf>,

    /// Report actions instead of performing them (-D=false to apply)
    #[arg(
        short = 'D',
        long,
        env = "VAI_DRY_RUN",
        value_name = "BOOL",
        num_args = 0..=1,
        require_equals = true,
        default_value_t = true,
        default_missing_value = "true",
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new()
    )]
    pub dry_run: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Absolute path provisioning paths are resolved under
    #[arg(short, long, env = "VAI_ROOT", value_name = "PATH", default_value = "/")]
    pub root: PathBuf,

    /// Stages to run, each followed by its own flags ("default" if omitted)
    #[arg(value_name = "STAGE", trailing_var_arg = true)]
    pub stages: Vec<String>,
}

impl Cli {
    /// The chroot target, with an unset flag read as the empty path.
    #[must_use]
    pub fn chroot_path(&self) -> PathBuf {
        self.chroot.clone().unwrap_or_default()
    }
}
