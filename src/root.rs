//! The system root stages provision into, and the optional chroot that
//! precedes them.
use std::path::{Path, PathBuf};

use crate::error::SetupError;

/// Absolute path under which every provisioning path is resolved.
///
/// Fixed once at startup; stages only ever read it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemRoot(PathBuf);

impl SystemRoot {
    /// Wrap `path` as the system root.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::RelativeRoot`] if `path` is not absolute.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, SetupError> {
        let path = path.into();
        if !path.is_absolute() {
            return Err(SetupError::RelativeRoot(path));
        }
        Ok(Self(path))
    }

    /// The root itself.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.0
    }

    /// Resolve an in-system path (`/etc/sv`) beneath the root.
    ///
    /// A leading `/` is stripped first so the result stays under the root
    /// instead of replacing it.
    #[must_use]
    pub fn join(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        self.0.join(path.strip_prefix("/").unwrap_or(path))
    }
}

impl Default for SystemRoot {
    fn default() -> Self {
        Self(PathBuf::from("/"))
    }
}

/// Change the process root to `path` and move into the new `/`.
///
/// An empty path means no chroot was requested and is not an error.
///
/// # Errors
///
/// Returns [`SetupError::Chroot`] if either system call fails (typically
/// because the process lacks `CAP_SYS_CHROOT`).
pub fn set_chroot(path: &Path) -> Result<(), SetupError> {
    if path.as_os_str().is_empty() {
        return Ok(());
    }
    let chroot_err = |source| SetupError::Chroot {
        path: path.to_path_buf(),
        source,
    };
    std::os::unix::fs::chroot(path).map_err(chroot_err)?;
    std::env::set_current_dir("/").map_err(chroot_err)
}
