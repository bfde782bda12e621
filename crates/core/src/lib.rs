//! Sidesnap Core - sidecar store primitives
//!
//! This crate provides the layer every sidesnap operation sits on:
//! - Error taxonomy and stable exit codes
//! - Path sanitizer (the only way user paths reach the store)
//! - Git subprocess client
//! - Store lock and watch singleton
//! - Idempotent bootstrap (`ensure`)

pub mod ensure;
pub mod error;
pub mod git;
pub mod gitdir;
pub mod lock;
pub mod path;
pub mod workspace;

// Re-export main types for convenience
pub use ensure::{ensure_sidecar, EnsureReport};
pub use error::{Error, ExitCode, GitError, Result};
pub use git::GitClient;
pub use lock::{AcquireOptions, LockManager, WatchPidLock};
pub use path::{resolve_snap_target, resolve_user_path, sanitize_target_path, SanitizedPath};
pub use workspace::Workspace;
