//! Watch session lifecycle
//!
//! Startup: validate pattern and debounce, claim the watch singleton,
//! bootstrap the store, start the observer. Any failure releases the
//! singleton before returning.
//!
//! Shutdown (cancellation, SIGINT or SIGTERM): cancel pending timers, close
//! the observer, drain the snapshot queue, release the singleton. In that
//! order, so every job that fired before the stop is committed.

use crate::output::Output;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;
use sidesnap_core::path::{sanitize_target_path, to_posix};
use sidesnap_core::{ensure_sidecar, AcquireOptions, Error, ExitCode, GitClient, WatchPidLock, Workspace};
use sidesnap_history::{parse_git_status, snap, SnapRequest};
use sidesnap_watcher::{
    default_pattern, resolve_pattern, DebounceScheduler, JobOutcome, JobRunner, ObservedEvent,
    Observer, ObserverOptions, Pattern, QueueEvent, SerialQueue, SnapJob, WatchAction,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Watch session settings
#[derive(Debug, Clone)]
pub struct WatchOptions {
    pub pattern: Option<String>,
    /// Milliseconds; negative values are rejected
    pub debounce_ms: i64,
    pub include_delete: bool,
    pub initial_snap: bool,
    /// Stop on SIGINT / SIGTERM
    pub handle_signals: bool,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            pattern: None,
            debounce_ms: 500,
            include_delete: false,
            initial_snap: true,
            handle_signals: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WatchReport {
    pub snaps_count: usize,
    pub pattern: String,
    pub debounce_ms: u64,
}

/// Commits each job through the snapshot operation
pub struct SnapRunner {
    ws: Workspace,
    lock: AcquireOptions,
}

impl SnapRunner {
    pub fn new(ws: Workspace, lock: AcquireOptions) -> Self {
        Self { ws, lock }
    }
}

#[async_trait]
impl JobRunner for SnapRunner {
    async fn run(&self, job: &SnapJob) -> Result<JobOutcome, Error> {
        let prefix = format!("{}/", self.ws.scratch_dir());
        let relative = job.path.strip_prefix(&prefix).unwrap_or(&job.path);

        let mut req = SnapRequest::path(job.path.clone()).message(format!("auto: {}", relative));
        req.allow_missing = job.action == WatchAction::Delete;
        req.handle_signals = false;
        req.lock = self.lock;

        let report = snap(&self.ws, req).await?;
        Ok(match report.commit {
            Some(commit) => JobOutcome::Committed {
                commit,
                path: report.path.unwrap_or_else(|| job.path.clone()),
                bytes: report.bytes,
            },
            None => JobOutcome::NoChanges,
        })
    }
}

/// Event routing shared by the session loop
struct Router<'a> {
    ws: &'a Workspace,
    pattern: &'a Pattern,
    scheduler: &'a DebounceScheduler,
    include_delete: bool,
}

impl Router<'_> {
    fn sanitize(&self, path: &Path) -> Option<String> {
        let normalized = to_posix(&path.to_string_lossy());
        let work_tree = self.ws.work_tree();
        let scratch = self.ws.scratch_dir();

        sanitize_target_path(&normalized, work_tree, scratch)
            .or_else(|| {
                if path.is_absolute() {
                    None
                } else {
                    let prefixed = format!("{}/{}", scratch, normalized);
                    sanitize_target_path(&prefixed, work_tree, scratch)
                }
            })
            .map(|p| p.into_string())
    }

    fn route(&self, path: &Path, action: WatchAction) {
        let Some(sanitized) = self.sanitize(path) else {
            tracing::debug!(path = %path.display(), "ignored non-scratch path");
            return;
        };
        if !self.pattern.matches(&sanitized) {
            return;
        }
        if action == WatchAction::Delete && !self.include_delete {
            self.scheduler.cancel(&sanitized);
            return;
        }
        self.scheduler.schedule(&sanitized, action);
    }

    /// Tracked files already missing when the session starts
    async fn schedule_initial_deletions(&self) -> Result<(), Error> {
        let output = GitClient::for_workspace(self.ws).status_porcelain().await?;
        for deleted in parse_git_status(&output, self.ws.scratch_dir()).deleted {
            self.route(Path::new(&deleted), WatchAction::Delete);
        }
        Ok(())
    }
}

/// Run a watch session until cancelled or signalled
pub async fn run_watch(
    ws: &Workspace,
    opts: &WatchOptions,
    observer: &mut dyn Observer,
    runner: Arc<dyn JobRunner>,
    out: &Output,
    cancel: CancellationToken,
) -> Result<WatchReport> {
    let raw_pattern = opts
        .pattern
        .clone()
        .unwrap_or_else(|| default_pattern(ws.scratch_dir()));
    let resolved = resolve_pattern(&raw_pattern, ws.work_tree(), ws.scratch_dir())?;
    if opts.debounce_ms < 0 {
        return Err(Error::invalid_args("--debounce must be >= 0").into());
    }
    let debounce_ms = opts.debounce_ms as u64;
    let pattern = Pattern::new(&resolved)?;

    let mut pid_lock = WatchPidLock::new(ws.git_dir());
    pid_lock.acquire()?;

    // Dropping the pid lock on an early return releases it
    ensure_sidecar(ws).await?;

    let watch_root = watch_root_dir(ws, &pattern);
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let observer_opts = ObserverOptions {
        ignore_initial: !opts.initial_snap,
    };
    if let Err(e) = observer.start(&watch_root, observer_opts, events_tx).await {
        let _ = observer.close().await;
        return Err(e.context("Failed to start watcher"));
    }

    let (queue, mut queue_events) = SerialQueue::spawn(runner);
    let scheduler = DebounceScheduler::new(Duration::from_millis(debounce_ms), queue.sender());
    let router = Router {
        ws,
        pattern: &pattern,
        scheduler: &scheduler,
        include_delete: opts.include_delete,
    };

    out.event("started", &json!({ "pattern": resolved, "debounce": debounce_ms }));
    out.info(format!("watching {} (debounce {}ms)", resolved, debounce_ms));
    tracing::info!(pattern = %resolved, debounce_ms, "watch session started");

    let signals = shutdown_signal(opts.handle_signals);
    tokio::pin!(signals);
    let mut observer_open = true;

    let reason = loop {
        tokio::select! {
            _ = cancel.cancelled() => break "cancelled",
            reason = &mut signals => break reason,
            event = events_rx.recv(), if observer_open => match event {
                Some(ObservedEvent::Ready) => {
                    if opts.include_delete && opts.initial_snap {
                        if let Err(e) = router.schedule_initial_deletions().await {
                            out.error_event(e.code(), &e.to_string());
                        }
                    }
                }
                Some(ObservedEvent::Error(message)) => out.error_event(ExitCode::Failure, &message),
                Some(event) => {
                    if let Some((path, action)) = event.classify() {
                        router.route(path, action);
                    }
                }
                None => observer_open = false,
            },
            Some(event) = queue_events.recv() => report_queue_event(out, event),
        }
    };

    scheduler.cancel_all();
    if let Err(e) = observer.close().await {
        out.error_event(ExitCode::Failure, &format!("{:#}", e));
    }
    let snaps_count = queue.drain().await;
    while let Ok(event) = queue_events.try_recv() {
        report_queue_event(out, event);
    }
    pid_lock.release();

    out.event("stopped", &json!({ "reason": reason, "snaps_count": snaps_count }));
    out.info(format!("watch stopped ({} snaps)", snaps_count));
    tracing::info!(reason, snaps_count, "watch session stopped");

    Ok(WatchReport {
        snaps_count,
        pattern: resolved,
        debounce_ms,
    })
}

/// Directory handed to the observer; falls back to the scratch root when the
/// pattern's literal prefix is not a directory
fn watch_root_dir(ws: &Workspace, pattern: &Pattern) -> PathBuf {
    let root = ws.work_tree().join(pattern.watch_root());
    if root.is_dir() {
        root
    } else {
        ws.scratch_root()
    }
}

fn report_queue_event(out: &Output, event: QueueEvent) {
    match event {
        QueueEvent::Committed {
            commit,
            path,
            bytes,
            ..
        } => {
            out.event(
                "snap",
                &json!({ "commit": commit, "path": path, "bytes": bytes }),
            );
            out.info(format!("snap stored {} at {}", path, commit));
        }
        QueueEvent::Failed { job, error } => {
            tracing::warn!(path = %job.path, error = %error, "snapshot failed");
            out.error_event(error.code(), &error.to_string());
        }
    }
}

/// Resolves with the name of the first shutdown signal received
async fn shutdown_signal(enabled: bool) -> &'static str {
    if !enabled {
        return std::future::pending().await;
    }
    match wait_for_signal().await {
        Ok(name) => name,
        Err(e) => {
            tracing::warn!(error = %e, "failed to install signal handlers");
            std::future::pending().await
        }
    }
}

#[cfg(unix)]
async fn wait_for_signal() -> Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to install SIGINT handler")?;
    tokio::select! {
        _ = sigint.recv() => Ok("SIGINT"),
        _ = sigterm.recv() => Ok("SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> Result<&'static str> {
    tokio::signal::ctrl_c().await.context("Failed to install Ctrl-C handler")?;
    Ok("SIGINT")
}
