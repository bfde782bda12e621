//! Sidecar store layout
//!
//! A sidecar lives next to the user's working tree:
//! ```text
//! <work-tree>/
//!   scratch/                  files eligible for snapshots
//!   .git-scratch/             sidecar store (git dir)
//!     HEAD
//!     info/exclude            deny-all, allow scratch
//!     .sidesnap.lock/         present while an operation holds the lock
//!     .sidesnap-watch.pid     present while a watch session runs
//! ```

use crate::path::to_posix;
use std::path::{Path, PathBuf};

pub const DEFAULT_SCRATCH_DIR: &str = "scratch";
pub const DEFAULT_GIT_DIR: &str = ".git-scratch";
pub const LOCK_DIR_NAME: &str = ".sidesnap.lock";
pub const WATCH_PID_FILE: &str = ".sidesnap-watch.pid";

/// Work tree + sidecar store + scratch directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    /// Root of the user's working tree
    work_tree: PathBuf,
    /// Sidecar git directory (absolute)
    git_dir: PathBuf,
    /// Scratch directory name, relative to the work tree, `/`-separated
    scratch_dir: String,
}

impl Workspace {
    /// Describe a sidecar; a relative `git_dir` is resolved against `work_tree`
    pub fn new(work_tree: impl Into<PathBuf>, git_dir: impl AsRef<Path>, scratch_dir: &str) -> Self {
        let work_tree = work_tree.into();
        let git_dir = git_dir.as_ref();
        let git_dir = if git_dir.is_absolute() {
            git_dir.to_path_buf()
        } else {
            work_tree.join(git_dir)
        };
        let scratch_dir = to_posix(scratch_dir).trim_end_matches('/').to_string();

        Self {
            work_tree,
            git_dir,
            scratch_dir,
        }
    }

    /// Sidecar with the default store and scratch names
    pub fn with_defaults(work_tree: impl Into<PathBuf>) -> Self {
        Self::new(work_tree, DEFAULT_GIT_DIR, DEFAULT_SCRATCH_DIR)
    }

    pub fn work_tree(&self) -> &Path {
        &self.work_tree
    }

    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    pub fn scratch_dir(&self) -> &str {
        &self.scratch_dir
    }

    /// Absolute path of the scratch directory
    pub fn scratch_root(&self) -> PathBuf {
        self.work_tree.join(&self.scratch_dir)
    }

    /// Store marker; its presence means the sidecar is initialized
    pub fn head_path(&self) -> PathBuf {
        self.git_dir.join("HEAD")
    }

    pub fn is_initialized(&self) -> bool {
        self.head_path().exists()
    }

    pub fn lock_dir(&self) -> PathBuf {
        self.git_dir.join(LOCK_DIR_NAME)
    }

    pub fn watch_pid_path(&self) -> PathBuf {
        self.git_dir.join(WATCH_PID_FILE)
    }

    pub fn sidecar_exclude_path(&self) -> PathBuf {
        self.git_dir.join("info").join("exclude")
    }

    /// Store directory as written into the host exclude file (`.git-scratch/`)
    ///
    /// Falls back to the absolute path when the store lives outside the work
    /// tree.
    pub fn git_dir_exclude_entry(&self) -> String {
        let relative = self
            .git_dir
            .strip_prefix(&self.work_tree)
            .ok()
            .filter(|rel| !rel.as_os_str().is_empty())
            .unwrap_or(&self.git_dir);
        let entry = to_posix(&relative.to_string_lossy());
        if entry.ends_with('/') {
            entry
        } else {
            format!("{}/", entry)
        }
    }

    /// Absolute path of a sanitized, store-relative path
    pub fn absolute(&self, store_relative: &str) -> PathBuf {
        self.work_tree.join(store_relative)
    }
}
