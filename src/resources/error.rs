//! Typed error variants for resource operations.
//!
//! Resource code returns these through [`anyhow::Error`]; tests downcast to
//! match on the variant.

use std::path::PathBuf;

use thiserror::Error;

use crate::operations::EntryKind;

/// Errors that arise while ensuring a resource.
#[derive(Error, Debug)]
pub enum ResourceError {
    /// A non-symlink occupies the link path and replacement was not forced.
    #[error("{} exists and is a {kind}, not a symlink", .path.display())]
    Conflict {
        /// The occupied link path.
        path: PathBuf,
        /// What occupies it.
        kind: EntryKind,
    },

    /// The service definition directory does not exist.
    #[error("service {service:?} not found at {}", .path.display())]
    ServiceNotFound {
        /// Requested service name.
        service: String,
        /// Where the definition was looked for.
        path: PathBuf,
    },

    /// A path that must be a directory is something else.
    #[error("{} is a {kind}, not a directory", .path.display())]
    NotADirectory {
        /// The offending path.
        path: PathBuf,
        /// What it actually is.
        kind: EntryKind,
    },
}
