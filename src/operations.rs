//! Filesystem side of the action layer.
//!
//! [`FileSystemOps`] is the seam between provisioning logic and the real
//! filesystem.  [`SystemFileSystemOps`] performs every operation;
//! [`DryRunFileSystemOps`] answers queries from the real filesystem but only
//! reports mutations through the logger.  Which one a run uses is decided
//! once, when the [`Context`](crate::stages::Context) is built.

use anyhow::{Context as _, Result};
use std::fmt;
use std::fs::{self, DirBuilder};
use std::io;
use std::os::unix::fs::DirBuilderExt as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::logging::Log;

/// What occupies a path, as reported by `lstat` (symlinks are not followed).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// A symbolic link (possibly dangling).
    Symlink,
    /// A directory.
    Directory,
    /// A regular file.
    File,
    /// A socket, FIFO or device node.
    Other,
}

impl EntryKind {
    /// Classify a file type obtained without following symlinks.
    #[must_use]
    pub fn from_file_type(file_type: fs::FileType) -> Self {
        if file_type.is_symlink() {
            Self::Symlink
        } else if file_type.is_dir() {
            Self::Directory
        } else if file_type.is_file() {
            Self::File
        } else {
            Self::Other
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Symlink => write!(f, "symlink"),
            Self::Directory => write!(f, "directory"),
            Self::File => write!(f, "regular file"),
            Self::Other => write!(f, "special file"),
        }
    }
}

/// Filesystem operations used by stages and resources.
///
/// Queries return raw [`io::Result`]s so callers can tell `NotFound` apart
/// from other failures; mutations return [`anyhow::Result`] with the path
/// attached.
pub trait FileSystemOps: Send + Sync + fmt::Debug {
    /// Report what occupies `path` without following a final symlink.
    ///
    /// # Errors
    ///
    /// Returns [`io::ErrorKind::NotFound`] if nothing is there, or any other
    /// error `lstat` reports.
    fn entry_kind(&self, path: &Path) -> io::Result<EntryKind>;

    /// Read the target of the symbolic link at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if `path` is not a symlink or cannot be read.
    fn read_link(&self, path: &Path) -> io::Result<PathBuf>;

    /// Create a symlink at `link` pointing to `target`, replacing an existing
    /// symlink at `link`.
    ///
    /// # Errors
    ///
    /// Returns an error if the link cannot be created, including when a
    /// non-symlink already occupies `link`.
    fn symlink(&self, target: &Path, link: &Path) -> Result<()>;

    /// Remove the file, symlink or empty directory at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if removal fails.
    fn remove(&self, path: &Path) -> Result<()>;

    /// Create a single directory with permission bits `mode`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory exists or its parent is missing.
    fn create_dir(&self, path: &Path, mode: u32) -> Result<()>;

    /// Create a directory and any missing ancestors with permission bits `mode`.
    ///
    /// # Errors
    ///
    /// Returns an error if any component cannot be created.
    fn create_dir_all(&self, path: &Path, mode: u32) -> Result<()>;
}

fn lstat(path: &Path) -> io::Result<EntryKind> {
    fs::symlink_metadata(path).map(|meta| EntryKind::from_file_type(meta.file_type()))
}

/// Production [`FileSystemOps`] implementation that delegates to [`std::fs`].
#[derive(Debug, Default)]
pub struct SystemFileSystemOps;

impl FileSystemOps for SystemFileSystemOps {
    fn entry_kind(&self, path: &Path) -> io::Result<EntryKind> {
        lstat(path)
    }

    fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
        fs::read_link(path)
    }

    fn symlink(&self, target: &Path, link: &Path) -> Result<()> {
        match std::os::unix::fs::symlink(target, link) {
            Ok(()) => Ok(()),
            Err(e)
                if e.kind() == io::ErrorKind::AlreadyExists
                    && matches!(lstat(link), Ok(EntryKind::Symlink)) =>
            {
                replace_symlink(target, link)
            }
            Err(e) => Err(e).with_context(|| {
                format!(
                    "creating symlink {} -> {}",
                    link.display(),
                    target.display()
                )
            }),
        }
    }

    fn remove(&self, path: &Path) -> Result<()> {
        if lstat(path)
            .with_context(|| format!("reading metadata: {}", path.display()))?
            == EntryKind::Directory
        {
            fs::remove_dir(path).with_context(|| format!("removing directory: {}", path.display()))
        } else {
            fs::remove_file(path).with_context(|| format!("removing file: {}", path.display()))
        }
    }

    fn create_dir(&self, path: &Path, mode: u32) -> Result<()> {
        DirBuilder::new()
            .mode(mode)
            .create(path)
            .with_context(|| format!("creating directory: {}", path.display()))
    }

    fn create_dir_all(&self, path: &Path, mode: u32) -> Result<()> {
        DirBuilder::new()
            .recursive(true)
            .mode(mode)
            .create(path)
            .with_context(|| format!("creating directory tree: {}", path.display()))
    }
}

/// Sibling path used to stage a replacement symlink before renaming it over
/// the old one, so `link` is never absent.
fn staging_path(link: &Path) -> PathBuf {
    let name = link
        .file_name()
        .map_or_else(|| "link".into(), |n| n.to_string_lossy().into_owned());
    link.with_file_name(format!(".{name}.vai-tmp"))
}

/// Atomically replace the symlink at `link` with one pointing to `target`.
fn replace_symlink(target: &Path, link: &Path) -> Result<()> {
    let staged = staging_path(link);

    // Leftover from an interrupted run.
    if let Err(e) = fs::remove_file(&staged)
        && e.kind() != io::ErrorKind::NotFound
    {
        return Err(e).with_context(|| format!("removing stale {}", staged.display()));
    }

    std::os::unix::fs::symlink(target, &staged).with_context(|| {
        format!(
            "creating symlink {} -> {}",
            staged.display(),
            target.display()
        )
    })?;

    if let Err(e) = fs::rename(&staged, link) {
        let _ = fs::remove_file(&staged);
        return Err(e)
            .with_context(|| format!("rename {} to {}", staged.display(), link.display()));
    }
    Ok(())
}

/// Dry-run [`FileSystemOps`]: queries hit the real filesystem, mutations are
/// only reported.
pub struct DryRunFileSystemOps {
    log: Arc<dyn Log>,
}

impl DryRunFileSystemOps {
    /// Create a dry-run implementation that reports through `log`.
    #[must_use]
    pub fn new(log: Arc<dyn Log>) -> Self {
        Self { log }
    }
}

impl fmt::Debug for DryRunFileSystemOps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DryRunFileSystemOps")
            .field("log", &"<dyn Log>")
            .finish()
    }
}

impl FileSystemOps for DryRunFileSystemOps {
    fn entry_kind(&self, path: &Path) -> io::Result<EntryKind> {
        lstat(path)
    }

    fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
        fs::read_link(path)
    }

    fn symlink(&self, target: &Path, link: &Path) -> Result<()> {
        self.log
            .dry_run(&format!("symlink {target:?} -> {link:?}"));
        Ok(())
    }

    fn remove(&self, path: &Path) -> Result<()> {
        self.log.dry_run(&format!("rm {path:?}"));
        Ok(())
    }

    fn create_dir(&self, path: &Path, mode: u32) -> Result<()> {
        self.log.dry_run(&format!("mkdir {path:?} [{mode:04o}]"));
        Ok(())
    }

    fn create_dir_all(&self, path: &Path, mode: u32) -> Result<()> {
        self.log.dry_run(&format!("mkdir -p {path:?} [{mode:04o}]"));
        Ok(())
    }
}
