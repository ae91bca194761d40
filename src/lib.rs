//! Staged, idempotent system provisioning.
//!
//! Runs a named sequence of installation stages against a target root
//! filesystem, either for real or as a dry run that only reports what it
//! would do.
//!
//! The public API is organised into layers:
//!
//! - **[`operations`]** / **[`exec`]**: the action layer, with live and
//!   dry-run implementations
//! - **[`resources`]**: idempotent `check + apply` primitives (symlinks,
//!   runit services)
//! - **[`stages`]**: the stage contract, the registry that parses stage
//!   arguments, and the runner
//! - **[`commands`]**: top-level orchestration driven by [`cli`]
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod cli;
pub mod commands;
pub mod duration;
pub mod error;
pub mod exec;
pub mod logging;
pub mod operations;
pub mod resources;
pub mod root;
pub mod stages;
