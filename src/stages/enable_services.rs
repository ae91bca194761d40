//! `enable-services`: link runit services into the default runlevel.
use std::path::{Component, Path};

use anyhow::{Context as _, Result};
use clap::{ArgMatches, Args, Command, FromArgMatches as _};

use super::{Context, Stage};
use crate::resources::enable_service;

/// Options for [`EnableServices`].
#[derive(Debug, Clone, Default, Args)]
pub struct EnableServicesOpts {
    /// Service to enable; repeat the flag or separate names with commas
    #[arg(short = 's', long = "service", value_name = "NAME", value_delimiter = ',')]
    pub services: Vec<String>,
}

/// Enable the runit services named on the command line.
#[derive(Debug, Default)]
pub struct EnableServices {
    opts: EnableServicesOpts,
}

impl EnableServices {
    /// Registry name.
    pub const NAME: &'static str = "enable-services";

    /// Build the stage with explicit options.
    #[must_use]
    pub const fn new(opts: EnableServicesOpts) -> Self {
        Self { opts }
    }
}

/// A service name must be exactly one normal path component.
fn is_service_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !name.contains('/')
}

impl Stage for EnableServices {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn configure(&self, flags: Command) -> Command {
        EnableServicesOpts::augment_args(flags)
    }

    fn load(&mut self, matches: &ArgMatches) -> Result<()> {
        self.opts = EnableServicesOpts::from_arg_matches(matches)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.opts.services.is_empty() {
            anyhow::bail!("at least one service is required (-s NAME)");
        }
        if let Some(bad) = self.opts.services.iter().find(|s| !is_service_name(s)) {
            anyhow::bail!("invalid service name {bad:?}");
        }
        Ok(())
    }

    fn run(&self, ctx: &Context) -> Result<()> {
        for service in &self.opts.services {
            enable_service(ctx, service)
                .with_context(|| format!("enabling service {service:?}"))?;
        }
        Ok(())
    }
}
