//! Per-path debouncing with async timers
//!
//! Each path has at most one pending timer. A new event for the path aborts
//! the old timer and starts a fresh window with the new action; the last
//! action wins. When a window expires the job goes straight to the serial
//! queue.
//!
//! Example: if a file is saved 100 times in one second, a single job is
//! queued one window after the last save.

use crate::{SnapJob, WatchAction};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::trace;

/// Pending timer for one path
#[derive(Debug)]
struct Pending {
    action: WatchAction,
    /// Distinguishes this timer from one that replaced it
    generation: u64,
    handle: JoinHandle<()>,
}

/// Debounce scheduler keyed by sanitized path
pub struct DebounceScheduler {
    pending: Arc<DashMap<String, Pending>>,
    window: Duration,
    next_generation: AtomicU64,
    jobs: mpsc::UnboundedSender<SnapJob>,
}

impl DebounceScheduler {
    /// Fired jobs are sent to `jobs`
    pub fn new(window: Duration, jobs: mpsc::UnboundedSender<SnapJob>) -> Self {
        Self {
            pending: Arc::new(DashMap::new()),
            window,
            next_generation: AtomicU64::new(0),
            jobs,
        }
    }

    /// Start or restart the window for `path`
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule(&self, path: &str, action: WatchAction) {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);

        let pending = Arc::clone(&self.pending);
        let jobs = self.jobs.clone();
        let window = self.window;
        let key = path.to_string();

        // Holding the entry keeps the timer from removing itself before it
        // has been recorded
        let entry = self.pending.entry(key.clone());
        let handle = tokio::spawn(async move {
            sleep(window).await;
            let fired = pending.remove_if(&key, |_, p| p.generation == generation);
            if let Some((path, p)) = fired {
                trace!(path = %path, action = %p.action, "debounce window expired");
                let _ = jobs.send(SnapJob {
                    path,
                    action: p.action,
                });
            }
        });

        let next = Pending {
            action,
            generation,
            handle,
        };
        match entry {
            Entry::Occupied(mut occupied) => {
                let previous = occupied.insert(next);
                previous.handle.abort();
            }
            Entry::Vacant(vacant) => {
                vacant.insert(next);
            }
        }
    }

    /// Drop the pending timer for `path`, if any
    pub fn cancel(&self, path: &str) -> bool {
        match self.pending.remove(path) {
            Some((_, p)) => {
                p.handle.abort();
                true
            }
            None => false,
        }
    }

    /// Drop every pending timer
    pub fn cancel_all(&self) {
        let keys: Vec<String> = self.pending.iter().map(|e| e.key().clone()).collect();
        for key in keys {
            self.cancel(&key);
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Action currently pending for `path`
    pub fn pending_action(&self, path: &str) -> Option<WatchAction> {
        self.pending.get(path).map(|p| p.action)
    }
}

impl Drop for DebounceScheduler {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
