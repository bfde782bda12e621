//! Cross-process locking for the sidecar store
//!
//! Two independent gatekeepers live inside the store directory:
//! - `.sidesnap.lock/`: general mutual exclusion, taken by every mutating
//!   operation for as long as it runs. Acquired with an atomic `mkdir`.
//! - `.sidesnap-watch.pid`: at most one watch session per store, held for the
//!   whole session. Acquired with an exclusive create.

use crate::error::{Error, Result};
use crate::workspace::{LOCK_DIR_NAME, WATCH_PID_FILE};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Once, OnceLock};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5_000);
pub const DEFAULT_RETRY: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcquireOptions {
    /// Give up once this much time has passed
    pub timeout: Duration,
    /// Pause between attempts
    pub retry: Duration,
}

impl Default for AcquireOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            retry: DEFAULT_RETRY,
        }
    }
}

impl AcquireOptions {
    pub fn from_millis(timeout_ms: u64, retry_ms: u64) -> Self {
        Self {
            timeout: Duration::from_millis(timeout_ms),
            retry: Duration::from_millis(retry_ms.max(1)),
        }
    }
}

/// General store lock
///
/// Dropping a held manager releases the lock.
#[derive(Debug)]
pub struct LockManager {
    lock_dir: PathBuf,
    handle_signals: bool,
    held: bool,
}

impl LockManager {
    /// Lock for `git_dir`; registered for signal cleanup while held
    pub fn new(git_dir: &Path) -> Self {
        Self::with_signal_handling(git_dir, true)
    }

    /// `handle_signals = false` leaves SIGINT/SIGTERM to the caller
    pub fn with_signal_handling(git_dir: &Path, handle_signals: bool) -> Self {
        Self {
            lock_dir: git_dir.join(LOCK_DIR_NAME),
            handle_signals,
            held: false,
        }
    }

    pub fn lock_dir(&self) -> &Path {
        &self.lock_dir
    }

    pub fn is_held(&self) -> bool {
        self.held
    }

    pub async fn acquire(&mut self, opts: AcquireOptions) -> Result<()> {
        if self.held {
            return Ok(());
        }

        let deadline = Instant::now() + opts.timeout;
        loop {
            match fs::create_dir(&self.lock_dir) {
                Ok(()) => {
                    self.held = true;
                    if self.handle_signals {
                        signals::register(&self.lock_dir);
                    }
                    debug!(lock = %self.lock_dir.display(), "lock acquired");
                    return Ok(());
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if Instant::now() >= deadline {
                        return Err(Error::locked());
                    }
                    debug!(lock = %self.lock_dir.display(), "lock busy, retrying");
                    tokio::time::sleep(opts.retry).await;
                }
                // The store is missing, or is being swapped by prune
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    return Err(Error::NotInitialized(format!(
                        "sidecar store {} does not exist",
                        self.lock_dir.parent().unwrap_or(&self.lock_dir).display()
                    )));
                }
                Err(e) => return Err(Error::io("create", &self.lock_dir, e)),
            }
        }
    }

    /// Remove the lock directory if this manager holds it
    pub fn release(&mut self) {
        if !self.held {
            return;
        }
        self.held = false;
        if self.handle_signals {
            signals::unregister(&self.lock_dir);
        }
        match fs::remove_dir_all(&self.lock_dir) {
            Ok(()) => debug!(lock = %self.lock_dir.display(), "lock released"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(lock = %self.lock_dir.display(), error = %e, "failed to remove lock"),
        }
    }
}

impl Drop for LockManager {
    fn drop(&mut self) {
        self.release();
    }
}

/// Watch session singleton
#[derive(Debug)]
pub struct WatchPidLock {
    pid_path: PathBuf,
    held: bool,
}

impl WatchPidLock {
    pub fn new(git_dir: &Path) -> Self {
        Self {
            pid_path: git_dir.join(WATCH_PID_FILE),
            held: false,
        }
    }

    pub fn pid_path(&self) -> &Path {
        &self.pid_path
    }

    pub fn is_held(&self) -> bool {
        self.held
    }

    /// Claim the singleton or fail immediately with `Locked`
    pub fn acquire(&mut self) -> Result<()> {
        if self.held {
            return Ok(());
        }
        if let Some(parent) = self.pid_path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::io("create", parent, e))?;
        }

        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.pid_path)
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(Error::Locked("another watch process is running".to_string()));
            }
            Err(e) => return Err(Error::io("create", &self.pid_path, e)),
        };
        self.held = true;

        writeln!(file, "{}", std::process::id())
            .map_err(|e| Error::io("write", &self.pid_path, e))?;
        Ok(())
    }

    pub fn release(&mut self) {
        if !self.held {
            return;
        }
        self.held = false;
        match fs::remove_file(&self.pid_path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.pid_path.display(), error = %e, "failed to remove pid file"),
        }
    }
}

impl Drop for WatchPidLock {
    fn drop(&mut self) {
        self.release();
    }
}

/// Process-wide cleanup of held lock directories on SIGINT / SIGTERM
mod signals {
    use super::*;
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    static HELD: OnceLock<Mutex<HashSet<PathBuf>>> = OnceLock::new();
    static INSTALL: Once = Once::new();

    fn held() -> &'static Mutex<HashSet<PathBuf>> {
        HELD.get_or_init(|| Mutex::new(HashSet::new()))
    }

    pub(super) fn register(lock_dir: &Path) {
        held().lock().insert(lock_dir.to_path_buf());
        INSTALL.call_once(install);
    }

    pub(super) fn unregister(lock_dir: &Path) {
        held().lock().remove(lock_dir);
    }

    fn install() {
        let mut signals = match Signals::new([SIGINT, SIGTERM]) {
            Ok(signals) => signals,
            Err(e) => {
                warn!(error = %e, "failed to install lock cleanup handler");
                return;
            }
        };

        let spawned = std::thread::Builder::new()
            .name("sidesnap-lock-signals".to_string())
            .spawn(move || {
                if let Some(signal) = signals.forever().next() {
                    for dir in held().lock().drain() {
                        let _ = fs::remove_dir_all(&dir);
                    }
                    std::process::exit(128 + signal);
                }
            });
        if let Err(e) = spawned {
            warn!(error = %e, "failed to spawn lock cleanup thread");
        }
    }
}
