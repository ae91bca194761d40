//! Idempotent resource primitives (check + apply pattern).
//!
//! Every resource first inspects the filesystem through the context's
//! [`FileSystemOps`](crate::operations::FileSystemOps) and only mutates when
//! the observed state differs from the desired one, so re-running a stage
//! after a partial failure is safe.
pub mod error;
pub mod service;
pub mod symlink;

use std::path::PathBuf;

use crate::operations::EntryKind;

pub use error::ResourceError;
pub use service::enable_service;
pub use symlink::{SymlinkResource, ensure_symlink};

/// Observed state of a resource.
///
/// # Examples
///
/// ```
/// use vai_installer::operations::EntryKind;
/// use vai_installer::resources::ResourceState;
///
/// let missing = ResourceState::Missing;
/// let wrong = ResourceState::Incorrect { current: "/other".into() };
/// let blocked = ResourceState::Occupied { kind: EntryKind::File };
///
/// assert_ne!(missing, ResourceState::Correct);
/// assert!(wrong.needs_change());
/// assert!(!blocked.needs_change());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceState {
    /// Nothing exists at the path.
    Missing,
    /// The resource exists and matches the desired state.
    Correct,
    /// A symlink exists but points somewhere else.
    Incorrect {
        /// Where the existing link points.
        current: PathBuf,
    },
    /// Something other than a symlink occupies the path.
    Occupied {
        /// What is there instead.
        kind: EntryKind,
    },
}

impl ResourceState {
    /// Whether applying can proceed without displacing a foreign entry.
    #[must_use]
    pub const fn needs_change(&self) -> bool {
        matches!(self, Self::Missing | Self::Incorrect { .. })
    }
}

/// Result of ensuring a resource.
///
/// # Examples
///
/// ```
/// use vai_installer::resources::ResourceChange;
///
/// assert_ne!(ResourceChange::Applied, ResourceChange::AlreadyCorrect);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceChange {
    /// The resource was created or updated (or, in a dry run, would have been).
    Applied,
    /// The resource already matched; nothing was done.
    AlreadyCorrect,
}
