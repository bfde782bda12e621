//! File watching for sidesnap
//!
//! This crate turns filesystem activity under the scratch directory into
//! ordered snapshot jobs:
//! - Glob patterns compiled to anchored regexes
//! - Per-path debouncing (500ms default, configurable)
//! - A single serial queue so commits never overlap
//! - A notify-backed observer behind an async trait

pub mod debounce;
pub mod observer;
pub mod pattern;
pub mod queue;

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

pub use debounce::DebounceScheduler;
pub use observer::{NotifyObserver, Observer, ObserverOptions};
pub use pattern::{resolve_pattern, watch_root, Pattern};
pub use queue::{JobOutcome, JobRunner, QueueEvent, SerialQueue};

/// Default debounce window
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Default watch pattern for a scratch directory
pub fn default_pattern(scratch_dir: &str) -> String {
    format!("{}/**/*.md", scratch_dir.trim_end_matches('/'))
}

/// What a fired timer asks the snapshot operation to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchAction {
    /// Snapshot the current content
    Update,
    /// Record the removal
    Delete,
}

impl WatchAction {
    pub fn as_str(self) -> &'static str {
        match self {
            WatchAction::Update => "update",
            WatchAction::Delete => "delete",
        }
    }
}

impl fmt::Display for WatchAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw observer notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObservedEvent {
    Added(PathBuf),
    Changed(PathBuf),
    Removed(PathBuf),
    /// Initial scan finished
    Ready,
    /// Runtime error from the underlying watcher
    Error(String),
}

impl ObservedEvent {
    /// Path and action for file events
    pub fn classify(&self) -> Option<(&PathBuf, WatchAction)> {
        match self {
            ObservedEvent::Added(path) | ObservedEvent::Changed(path) => {
                Some((path, WatchAction::Update))
            }
            ObservedEvent::Removed(path) => Some((path, WatchAction::Delete)),
            ObservedEvent::Ready | ObservedEvent::Error(_) => None,
        }
    }
}

/// Unit of work for the serial queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapJob {
    /// Sanitized, store-relative path
    pub path: String,
    pub action: WatchAction,
}
