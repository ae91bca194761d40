//! `get-address`: obtain a DHCP lease with dhcpcd.
use std::path::Path;

use anyhow::Result;
use clap::{ArgMatches, Args, Command, FromArgMatches as _};

use super::{Context, Stage};
use crate::duration::{Seconds, SignedDuration};
use crate::resources::ensure_symlink;

/// dhcpcd hook that lets it manage `/etc/resolv.conf`.
const HOOK_TARGET: &str = "/usr/libexec/dhcpcd-hooks/20-resolv.conf";

/// Directory dhcpcd scans for enabled hooks.
const HOOK_DIR: &str = "/usr/lib/dhcpcd/dhcpcd-hooks";

const HOOK_NAME: &str = "20-resolv.conf";

/// Options for [`GetAddress`].
#[derive(Debug, Clone, Default, Args)]
pub struct GetAddressOpts {
    /// How long dhcpcd may wait for a lease, e.g. 30s or 1m30s
    #[arg(
        short = 't',
        long,
        value_name = "DURATION",
        default_value = "0s",
        allow_hyphen_values = true
    )]
    pub timeout: SignedDuration,
}

/// Enable the resolv.conf hook and run dhcpcd in the foreground until it
/// has an address.
#[derive(Debug, Default)]
pub struct GetAddress {
    opts: GetAddressOpts,
}

impl GetAddress {
    /// Registry name.
    pub const NAME: &'static str = "get-address";

    /// Build the stage with explicit options.
    #[must_use]
    pub const fn new(opts: GetAddressOpts) -> Self {
        Self { opts }
    }

    /// The loaded options.
    #[must_use]
    pub const fn opts(&self) -> &GetAddressOpts {
        &self.opts
    }
}

impl Stage for GetAddress {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn configure(&self, flags: Command) -> Command {
        GetAddressOpts::augment_args(flags)
    }

    fn load(&mut self, matches: &ArgMatches) -> Result<()> {
        self.opts = GetAddressOpts::from_arg_matches(matches)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.opts.timeout.is_negative() {
            anyhow::bail!("timeout ({}) may not be < 0", self.opts.timeout);
        }
        Ok(())
    }

    fn run(&self, ctx: &Context) -> Result<()> {
        let hook_dir = ctx.in_root(HOOK_DIR);
        ctx.fs_ops.create_dir_all(&hook_dir, 0o755)?;
        ensure_symlink(ctx, Path::new(HOOK_TARGET), &hook_dir.join(HOOK_NAME), true)?;

        let timeout = Seconds(self.opts.timeout).to_string();
        ctx.executor
            .run("dhcpcd", &["-w", "--timeout", &timeout])?;
        Ok(())
    }
}
