//! Top-level command orchestration.
pub mod install;

/// Version string stamped by `build.rs`, falling back to the crate version.
#[must_use]
pub fn version() -> &'static str {
    option_env!("VAI_INSTALLER_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"))
}
