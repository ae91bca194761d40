//! Stage lookup by name and the command-line tokenizer that builds a stage
//! sequence.
use std::collections::BTreeMap;
use std::fmt;

use anyhow::Result;
use clap::error::ErrorKind;
use clap::{Arg, Command};

use super::enable_services::EnableServices;
use super::get_address::GetAddress;
use super::{DEFAULT_STAGES, Stage};
use crate::error::ParseError;

/// Hidden positional that swallows the next stage name and everything after
/// it, so each stage's flags stop at the first non-flag token.
const REMAINING: &str = "REMAINING";

type StageFactory = Box<dyn Fn() -> Result<Box<dyn Stage>> + Send + Sync>;

/// Name → factory mapping for every known stage.
pub struct StageRegistry {
    factories: BTreeMap<&'static str, StageFactory>,
}

impl fmt::Debug for StageRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageRegistry")
            .field("stages", &self.names())
            .finish()
    }
}

impl Default for StageRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl StageRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// A registry holding every stage shipped with the installer.
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(GetAddress::NAME, || Ok(Box::new(GetAddress::default())));
        registry.register(EnableServices::NAME, || {
            Ok(Box::new(EnableServices::default()))
        });
        registry
    }

    /// Register `factory` under `name`, replacing any previous entry.
    pub fn register<F>(&mut self, name: &'static str, factory: F)
    where
        F: Fn() -> Result<Box<dyn Stage>> + Send + Sync + 'static,
    {
        self.factories.insert(name, Box::new(factory));
    }

    /// Registered stage names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.factories.keys().copied().collect()
    }

    /// Construct a fresh stage.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::UnknownStage`] for an unregistered name, or
    /// [`ParseError::Construct`] if the factory fails.
    pub fn create(&self, name: &str) -> Result<Box<dyn Stage>, ParseError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| ParseError::UnknownStage {
                stage: name.to_string(),
            })?;
        factory().map_err(|e| ParseError::Construct {
            stage: name.to_string(),
            reason: format!("{e:#}"),
        })
    }

    /// Turn stage arguments into a validated stage sequence.
    ///
    /// No arguments, or exactly `default`, selects [`DEFAULT_STAGES`].
    /// Otherwise each stage name is followed by that stage's own flags, which
    /// end at the next positional token; that token starts the next stage.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] naming the first stage that is unknown, fails
    /// to construct, has bad flags or fails validation, or
    /// [`ParseError::HelpRequested`] if a stage was given `-h`/`--help`.
    pub fn parse<S: AsRef<str>>(&self, args: &[S]) -> Result<Vec<Box<dyn Stage>>, ParseError> {
        let mut remaining: Vec<String> = match args {
            [] => DEFAULT_STAGES.iter().map(ToString::to_string).collect(),
            [only] if only.as_ref() == "default" => {
                DEFAULT_STAGES.iter().map(ToString::to_string).collect()
            }
            _ => args.iter().map(|a| a.as_ref().to_string()).collect(),
        };

        let mut stages = Vec::new();
        while !remaining.is_empty() {
            let name = remaining.remove(0);
            let mut stage = self.create(&name)?;

            let matches = match stage_command(stage.as_ref()).try_get_matches_from(&remaining) {
                Ok(matches) => matches,
                Err(e)
                    if matches!(
                        e.kind(),
                        ErrorKind::DisplayHelp
                            | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                    ) =>
                {
                    return Err(ParseError::HelpRequested {
                        stage: name,
                        usage: e.render().to_string(),
                    });
                }
                Err(e) => return Err(ParseError::arguments(&name, e)),
            };

            let invalid = |e: anyhow::Error| ParseError::Invalid {
                stage: name.clone(),
                reason: format!("{e:#}"),
            };
            stage.load(&matches).map_err(invalid)?;
            stage.validate().map_err(invalid)?;

            remaining = matches
                .get_many::<String>(REMAINING)
                .map(|rest| rest.cloned().collect())
                .unwrap_or_default();
            stages.push(stage);
        }
        Ok(stages)
    }
}

/// The private flag namespace for `stage`.
fn stage_command(stage: &dyn Stage) -> Command {
    let flags = Command::new(stage.name())
        .no_binary_name(true)
        .disable_version_flag(true)
        .arg(
            Arg::new(REMAINING)
                .num_args(1..)
                .trailing_var_arg(true)
                .hide(true),
        );
    stage.configure(flags)
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;
    use crate::stages::Context;
    use clap::{ArgMatches, Args, FromArgMatches as _};

    #[derive(Debug, Clone, Default, Args)]
    struct XOpts {
        #[arg(short = 'x')]
        x: Option<String>,
    }

    #[derive(Debug, Clone, Default, Args)]
    struct YOpts {
        #[arg(short = 'y')]
        y: Option<String>,
    }

    #[derive(Debug, Default)]
    struct StageA {
        opts: XOpts,
    }

    impl Stage for StageA {
        fn name(&self) -> &'static str {
            "a"
        }
        fn configure(&self, flags: Command) -> Command {
            XOpts::augment_args(flags)
        }
        fn load(&mut self, matches: &ArgMatches) -> Result<()> {
            self.opts = XOpts::from_arg_matches(matches)?;
            Ok(())
        }
        fn run(&self, _ctx: &Context) -> Result<()> {
            Ok(())
        }
    }

    #[derive(Debug, Default)]
    struct StageB {
        opts: YOpts,
    }

    impl Stage for StageB {
        fn name(&self) -> &'static str {
            "b"
        }
        fn configure(&self, flags: Command) -> Command {
            YOpts::augment_args(flags)
        }
        fn load(&mut self, matches: &ArgMatches) -> Result<()> {
            self.opts = YOpts::from_arg_matches(matches)?;
            Ok(())
        }
        fn validate(&self) -> Result<()> {
            if self.opts.y.as_deref() == Some("bad") {
                anyhow::bail!("y may not be bad");
            }
            Ok(())
        }
        fn run(&self, _ctx: &Context) -> Result<()> {
            Ok(())
        }
    }

    fn test_registry() -> StageRegistry {
        let mut registry = StageRegistry::new();
        registry.register("a", || Ok(Box::new(StageA::default())));
        registry.register("b", || Ok(Box::new(StageB::default())));
        registry.register("broken", || anyhow::bail!("no hardware"));
        registry
    }

    /// Stages are trait objects; their loaded options are visible through `Debug`.
    fn debug_of(stage: &dyn Stage) -> String {
        format!("{stage:?}")
    }

    #[test]
    fn groups_flags_by_stage() {
        let stages = test_registry()
            .parse(&["a", "-x", "1", "b", "-y", "2"])
            .unwrap();

        assert_eq!(stages.len(), 2);
        assert_eq!(stages[0].name(), "a");
        assert!(debug_of(stages[0].as_ref()).contains("x: Some(\"1\")"));
        assert_eq!(stages[1].name(), "b");
        assert!(debug_of(stages[1].as_ref()).contains("y: Some(\"2\")"));
    }

    #[test]
    fn same_stage_may_repeat() {
        let stages = test_registry()
            .parse(&["a", "-x", "1", "a", "-x", "2"])
            .unwrap();
        assert_eq!(stages.len(), 2);
        assert!(debug_of(stages[1].as_ref()).contains("x: Some(\"2\")"));
    }

    #[test]
    fn stage_without_flags_is_followed_directly() {
        let stages = test_registry().parse(&["a", "b"]).unwrap();
        let names: Vec<_> = stages.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn unknown_stage_is_rejected() {
        let err = test_registry().parse(&["a", "nope"]).unwrap_err();
        assert!(matches!(err, ParseError::UnknownStage { stage } if stage == "nope"));
    }

    #[test]
    fn factory_failure_names_stage() {
        let err = test_registry().parse(&["broken"]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "unable to create stage \"broken\": no hardware"
        );
    }

    #[test]
    fn bad_flag_names_stage() {
        let err = test_registry().parse(&["a", "-z"]).unwrap_err();
        assert!(matches!(&err, ParseError::Arguments { stage, .. } if stage == "a"));
        assert!(err.to_string().starts_with("error parsing \"a\" arguments: "));
    }

    #[test]
    fn validation_failure_names_stage() {
        let err = test_registry().parse(&["a", "b", "-y", "bad"]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "unable to configure stage \"b\": y may not be bad"
        );
    }

    #[test]
    fn help_carries_stage_usage() {
        let err = test_registry().parse(&["a", "b", "-h"]).unwrap_err();
        match err {
            ParseError::HelpRequested { stage, usage } => {
                assert_eq!(stage, "b");
                assert!(usage.contains("-y"), "usage should list b's flags: {usage}");
            }
            other => panic!("expected help, got {other:?}"),
        }
    }

    #[test]
    fn empty_and_default_expand_to_default_stages() {
        let registry = StageRegistry::builtin();
        let none: &[&str] = &[];
        let default: &[&str] = &["default"];
        for args in [none, default] {
            let stages = registry.parse(args).unwrap();
            let names: Vec<_> = stages.iter().map(|s| s.name()).collect();
            assert_eq!(names, DEFAULT_STAGES);
        }
    }

    #[test]
    fn default_is_only_special_when_alone() {
        let err = StageRegistry::builtin()
            .parse(&["get-address", "default"])
            .unwrap_err();
        assert!(matches!(err, ParseError::UnknownStage { stage } if stage == "default"));
    }

    #[test]
    fn builtin_names() {
        insta::assert_snapshot!(StageRegistry::builtin().names().join("\n"), @r"
        enable-services
        get-address
        ");
    }

    #[test]
    fn stages_are_fresh_per_occurrence() {
        let stages = test_registry().parse(&["a", "-x", "1", "a"]).unwrap();
        assert_eq!(
            debug_of(stages[1].as_ref()),
            "StageA { opts: XOpts { x: None } }"
        );
    }
}
