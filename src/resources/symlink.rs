//! Idempotent symlink resource.
use anyhow::{Context as _, Result};
use std::io;
use std::path::{Path, PathBuf};

use super::{ResourceChange, ResourceError, ResourceState};
use crate::operations::{EntryKind, FileSystemOps};
use crate::stages::Context;

/// A symlink at `link` that should point to `target`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymlinkResource {
    /// What the link should point to, stored verbatim as the link contents.
    pub target: PathBuf,
    /// Where the link lives.
    pub link: PathBuf,
    /// Remove a non-symlink occupying `link` instead of failing.
    pub force: bool,
}

impl SymlinkResource {
    /// Create a new symlink resource.
    #[must_use]
    pub fn new(target: impl Into<PathBuf>, link: impl Into<PathBuf>, force: bool) -> Self {
        Self {
            target: target.into(),
            link: link.into(),
            force,
        }
    }

    /// Human-readable description of this resource.
    #[must_use]
    pub fn description(&self) -> String {
        format!("{} -> {}", self.link.display(), self.target.display())
    }

    /// Inspect `link` without following it.
    ///
    /// # Errors
    ///
    /// Returns an error if `link` cannot be examined for any reason other than
    /// not existing.
    pub fn current_state(&self, fs_ops: &dyn FileSystemOps) -> Result<ResourceState> {
        let kind = match fs_ops.entry_kind(&self.link) {
            Ok(kind) => kind,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(ResourceState::Missing),
            Err(e) => {
                return Err(e).with_context(|| format!("checking {}", self.link.display()));
            }
        };

        if kind != EntryKind::Symlink {
            return Ok(ResourceState::Occupied { kind });
        }

        let current = fs_ops
            .read_link(&self.link)
            .with_context(|| format!("reading link {}", self.link.display()))?;
        if current == self.target {
            Ok(ResourceState::Correct)
        } else {
            Ok(ResourceState::Incorrect { current })
        }
    }

    /// Bring `link` into the desired state, mutating only when needed.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::Conflict`] when a non-symlink occupies `link`
    /// and `force` is unset, or any error from inspecting, removing or
    /// creating the link.
    pub fn ensure(&self, ctx: &Context) -> Result<ResourceChange> {
        let fs_ops = ctx.fs_ops.as_ref();
        match self.current_state(fs_ops)? {
            ResourceState::Correct => {
                ctx.log
                    .debug(&format!("ok: {} (already linked)", self.description()));
                return Ok(ResourceChange::AlreadyCorrect);
            }
            ResourceState::Missing => {}
            ResourceState::Incorrect { current } => {
                ctx.log.debug(&format!(
                    "relinking {} (currently -> {})",
                    self.link.display(),
                    current.display()
                ));
            }
            ResourceState::Occupied { kind } if self.force => {
                ctx.log
                    .debug(&format!("replacing {kind} at {}", self.link.display()));
                fs_ops.remove(&self.link)?;
            }
            ResourceState::Occupied { kind } => {
                return Err(ResourceError::Conflict {
                    path: self.link.clone(),
                    kind,
                }
                .into());
            }
        }

        fs_ops.symlink(&self.target, &self.link)?;
        ctx.log.debug(&format!("linked {}", self.description()));
        Ok(ResourceChange::Applied)
    }
}

/// Ensure a symlink at `link` points to `target`.
///
/// Shorthand for [`SymlinkResource::ensure`].
///
/// # Errors
///
/// See [`SymlinkResource::ensure`].
pub fn ensure_symlink(
    ctx: &Context,
    target: &Path,
    link: &Path,
    force: bool,
) -> Result<ResourceChange> {
    SymlinkResource::new(target, link, force).ensure(ctx)
}
