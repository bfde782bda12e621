//! Snapshot history for the sidecar store
//!
//! This crate provides the operations that read or rewrite the store:
//! - Snapshot commits (single path or whole scratch directory)
//! - Atomic history truncation (prune)
//! - Restore, log / timeline, diff and status

pub mod diff;
pub mod log;
pub mod prune;
pub mod restore;
pub mod snap;
pub mod status;
pub mod timeline;

// Re-exports
pub use diff::{diff, DiffReport, DiffRequest, NumstatEntry};
pub use log::{log, LogEntry, LogReport, LogRequest};
pub use prune::{prune, prune_with, ArtifactBuilder, PruneReport, ShallowClone};
pub use restore::{restore, RestoreReport};
pub use snap::{snap, SnapReport, SnapRequest, SnapTarget};
pub use status::{parse_git_status, status, ExcludeStatus, StatusChanges, StatusReport};
pub use timeline::{Timeline, TimelineBar, TimelineEntry, TimelineSummary};
