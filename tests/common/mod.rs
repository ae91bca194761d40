// Shared helpers for integration tests.
//
// Provides a temporary system root and a fluent builder so each integration
// test can lay out the files a stage expects without repeating filesystem
// boilerplate.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// An isolated system root backed by a [`tempfile::TempDir`].
///
/// The directory is deleted when dropped.
pub struct TestRoot {
    /// Temporary directory standing in for `/`.
    pub dir: tempfile::TempDir,
}

impl TestRoot {
    /// Create an empty root.
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create temp dir"),
        }
    }

    /// Path to the root.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path to the root as a command-line argument.
    pub fn arg(&self) -> &str {
        self.dir.path().to_str().expect("temp dir is valid UTF-8")
    }

    /// Resolve an in-system path (`/etc/sv`) beneath the root.
    pub fn join(&self, path: &str) -> PathBuf {
        self.dir.path().join(path.trim_start_matches('/'))
    }

    /// Number of entries directly under the root.
    pub fn entry_count(&self) -> usize {
        std::fs::read_dir(self.path()).expect("read root").count()
    }
}

/// Fluent builder for [`TestRoot`].
pub struct TestRootBuilder {
    root: TestRoot,
}

impl TestRootBuilder {
    /// Begin building an empty root.
    pub fn new() -> Self {
        Self {
            root: TestRoot::new(),
        }
    }

    /// Add a runit service definition directory at `/etc/sv/<name>`.
    pub fn with_service(self, name: &str) -> Self {
        std::fs::create_dir_all(self.root.join("/etc/sv").join(name))
            .expect("create service dir");
        self
    }

    /// Write `content` to the in-system path `path`, creating parents.
    pub fn with_file(self, path: &str, content: &str) -> Self {
        let full = self.root.join(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).expect("create file parent");
        }
        std::fs::write(full, content).expect("write file");
        self
    }

    /// Finish building and return the root.
    pub fn build(self) -> TestRoot {
        self.root
    }
}

/// Run the installer binary with `args`, isolated from the caller's
/// `VAI_*` environment.
pub fn run_installer(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_vai-installer"))
        .args(args)
        .env_remove("VAI_DRY_RUN")
        .env_remove("VAI_ROOT")
        .env_remove("VAI_LOG")
        .output()
        .expect("spawn vai-installer")
}

/// Captured stdout as text.
pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}
