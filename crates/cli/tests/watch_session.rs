//! Watch session lifecycle with a scripted observer and a recording runner

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use sidesnap_cli::exit_code_for;
use sidesnap_cli::output::Output;
use sidesnap_cli::watch::{run_watch, WatchOptions};
use sidesnap_core::git::git_available;
use sidesnap_core::{Error, ExitCode, WatchPidLock, Workspace};
use sidesnap_history::{snap, SnapRequest};
use sidesnap_watcher::{
    JobOutcome, JobRunner, ObservedEvent, Observer, ObserverOptions, SnapJob, WatchAction,
};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Sends a fixed list of events on start, then stays quiet
struct ScriptedObserver {
    events: Vec<ObservedEvent>,
    sink: Option<mpsc::UnboundedSender<ObservedEvent>>,
    closed: Arc<AtomicBool>,
}

impl ScriptedObserver {
    fn new(events: Vec<ObservedEvent>) -> Self {
        Self {
            events,
            sink: None,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }
}

#[async_trait]
impl Observer for ScriptedObserver {
    async fn start(
        &mut self,
        _root: &Path,
        _options: ObserverOptions,
        sink: mpsc::UnboundedSender<ObservedEvent>,
    ) -> Result<()> {
        for event in self.events.drain(..) {
            let _ = sink.send(event);
        }
        let _ = sink.send(ObservedEvent::Ready);
        self.sink = Some(sink);
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.sink = None;
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
struct RecordingRunner {
    jobs: Mutex<Vec<SnapJob>>,
}

#[async_trait]
impl JobRunner for RecordingRunner {
    async fn run(&self, job: &SnapJob) -> Result<JobOutcome, Error> {
        let mut jobs = self.jobs.lock();
        jobs.push(job.clone());
        Ok(JobOutcome::Committed {
            commit: format!("c{}", jobs.len()),
            path: job.path.clone(),
            bytes: 0,
        })
    }
}

fn workspace(tmp: &TempDir) -> Workspace {
    let ws = Workspace::with_defaults(tmp.path());
    std::fs::create_dir_all(ws.scratch_root()).unwrap();
    ws
}

fn options(debounce_ms: i64) -> WatchOptions {
    WatchOptions {
        debounce_ms,
        handle_signals: false,
        ..WatchOptions::default()
    }
}

fn quiet() -> Output {
    Output::new(false, true)
}

/// Cancels the session after `delay`
fn stop_after(cancel: &CancellationToken, delay: Duration) {
    let cancel = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        cancel.cancel();
    });
}

#[tokio::test]
async fn test_bursts_collapse_into_one_snapshot_per_path() -> Result<()> {
    if !git_available() {
        return Ok(());
    }
    let tmp = TempDir::new()?;
    let ws = workspace(&tmp);
    let a = tmp.path().join("scratch/a.md");
    let b = tmp.path().join("scratch/notes/b.md");

    let mut observer = ScriptedObserver::new(vec![
        ObservedEvent::Added(a.clone()),
        ObservedEvent::Changed(a.clone()),
        ObservedEvent::Changed(a.clone()),
        ObservedEvent::Added(b.clone()),
        ObservedEvent::Changed(tmp.path().join("src/main.rs")),
        ObservedEvent::Changed(tmp.path().join("scratch/image.png")),
    ]);
    let closed = observer.closed.clone();
    let runner = Arc::new(RecordingRunner::default());
    let cancel = CancellationToken::new();
    stop_after(&cancel, Duration::from_millis(1500));

    let report = run_watch(&ws, &options(20), &mut observer, runner.clone(), &quiet(), cancel).await?;

    let mut paths: Vec<String> = runner.jobs.lock().iter().map(|j| j.path.clone()).collect();
    paths.sort();
    assert_eq!(paths, vec!["scratch/a.md", "scratch/notes/b.md"]);
    assert_eq!(report.snaps_count, 2);
    assert_eq!(report.pattern, "scratch/**/*.md");
    assert!(closed.load(Ordering::SeqCst));
    assert!(!ws.watch_pid_path().exists());
    Ok(())
}

#[tokio::test]
async fn test_stop_cancels_pending_timers() -> Result<()> {
    if !git_available() {
        return Ok(());
    }
    let tmp = TempDir::new()?;
    let ws = workspace(&tmp);

    let mut observer =
        ScriptedObserver::new(vec![ObservedEvent::Changed(tmp.path().join("scratch/a.md"))]);
    let runner = Arc::new(RecordingRunner::default());
    let cancel = CancellationToken::new();
    stop_after(&cancel, Duration::from_millis(200));

    let report = run_watch(&ws, &options(10_000), &mut observer, runner.clone(), &quiet(), cancel).await?;

    assert_eq!(report.snaps_count, 0);
    assert!(runner.jobs.lock().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_deletions_cancel_pending_snapshots_by_default() -> Result<()> {
    if !git_available() {
        return Ok(());
    }
    let tmp = TempDir::new()?;
    let ws = workspace(&tmp);
    let a = tmp.path().join("scratch/a.md");

    let mut observer =
        ScriptedObserver::new(vec![ObservedEvent::Changed(a.clone()), ObservedEvent::Removed(a)]);
    let runner = Arc::new(RecordingRunner::default());
    let cancel = CancellationToken::new();
    stop_after(&cancel, Duration::from_millis(1000));

    let report = run_watch(&ws, &options(50), &mut observer, runner.clone(), &quiet(), cancel).await?;

    assert_eq!(report.snaps_count, 0);
    Ok(())
}

#[tokio::test]
async fn test_deletions_are_recorded_when_enabled() -> Result<()> {
    if !git_available() {
        return Ok(());
    }
    let tmp = TempDir::new()?;
    let ws = workspace(&tmp);
    let a = tmp.path().join("scratch/a.md");

    let mut observer =
        ScriptedObserver::new(vec![ObservedEvent::Changed(a.clone()), ObservedEvent::Removed(a)]);
    let runner = Arc::new(RecordingRunner::default());
    let cancel = CancellationToken::new();
    stop_after(&cancel, Duration::from_millis(1000));

    let opts = WatchOptions {
        include_delete: true,
        ..options(50)
    };
    let report = run_watch(&ws, &opts, &mut observer, runner.clone(), &quiet(), cancel).await?;

    let jobs = runner.jobs.lock().clone();
    assert_eq!(report.snaps_count, 1);
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].path, "scratch/a.md");
    assert_eq!(jobs[0].action, WatchAction::Delete);
    Ok(())
}

#[tokio::test]
async fn test_second_session_is_locked_out() -> Result<()> {
    let tmp = TempDir::new()?;
    let ws = workspace(&tmp);
    std::fs::create_dir_all(ws.git_dir())?;
    let mut held = WatchPidLock::new(ws.git_dir());
    held.acquire()?;

    let mut observer = ScriptedObserver::new(Vec::new());
    let runner = Arc::new(RecordingRunner::default());
    let err = run_watch(
        &ws,
        &options(20),
        &mut observer,
        runner,
        &quiet(),
        CancellationToken::new(),
    )
    .await
    .unwrap_err();

    assert_eq!(exit_code_for(&err), ExitCode::Locked);
    assert!(ws.watch_pid_path().exists());
    held.release();
    assert!(!ws.watch_pid_path().exists());
    Ok(())
}

#[tokio::test]
async fn test_invalid_settings_are_rejected_before_locking() -> Result<()> {
    let tmp = TempDir::new()?;
    let ws = workspace(&tmp);
    let runner: Arc<dyn JobRunner> = Arc::new(RecordingRunner::default());

    let mut observer = ScriptedObserver::new(Vec::new());
    let err = run_watch(&ws, &options(-1), &mut observer, runner.clone(), &quiet(), CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(exit_code_for(&err), ExitCode::InvalidArgs);

    let opts = WatchOptions {
        pattern: Some("src/**/*.rs".into()),
        ..options(20)
    };
    let err = run_watch(&ws, &opts, &mut observer, runner, &quiet(), CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(exit_code_for(&err), ExitCode::InvalidArgs);
    assert!(!ws.watch_pid_path().exists());
    Ok(())
}

/// Fails to start, as a watcher would on a missing or unreadable root
struct BrokenObserver {
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl Observer for BrokenObserver {
    async fn start(
        &mut self,
        _root: &Path,
        _options: ObserverOptions,
        _sink: mpsc::UnboundedSender<ObservedEvent>,
    ) -> Result<()> {
        anyhow::bail!("inotify limit reached")
    }

    async fn close(&mut self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn test_observer_start_failure_releases_singleton() -> Result<()> {
    if !git_available() {
        return Ok(());
    }
    let tmp = TempDir::new()?;
    let ws = workspace(&tmp);
    let closed = Arc::new(AtomicBool::new(false));
    let mut observer = BrokenObserver {
        closed: closed.clone(),
    };
    let runner = Arc::new(RecordingRunner::default());

    let err = run_watch(&ws, &options(20), &mut observer, runner, &quiet(), CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(exit_code_for(&err), ExitCode::Failure);
    assert!(format!("{:#}", err).contains("inotify limit reached"));
    assert!(closed.load(Ordering::SeqCst));
    assert!(!ws.watch_pid_path().exists());

    // The singleton is free again
    let mut pid_lock = WatchPidLock::new(ws.git_dir());
    pid_lock.acquire()?;
    Ok(())
}

#[tokio::test]
async fn test_files_deleted_before_start_are_recorded_on_ready() -> Result<()> {
    if !git_available() {
        return Ok(());
    }
    let tmp = TempDir::new()?;
    let ws = workspace(&tmp);
    snap(&ws, SnapRequest::path("gone.md").stdin_content(b"draft\n".to_vec())).await?;
    snap(&ws, SnapRequest::path("kept.md").stdin_content(b"draft\n".to_vec())).await?;
    std::fs::remove_file(ws.scratch_root().join("gone.md"))?;

    let mut observer = ScriptedObserver::new(Vec::new());
    let runner = Arc::new(RecordingRunner::default());
    let cancel = CancellationToken::new();
    stop_after(&cancel, Duration::from_millis(1000));

    let opts = WatchOptions {
        include_delete: true,
        initial_snap: true,
        ..options(20)
    };
    let report = run_watch(&ws, &opts, &mut observer, runner.clone(), &quiet(), cancel).await?;

    let jobs = runner.jobs.lock().clone();
    assert_eq!(report.snaps_count, 1);
    assert_eq!(
        jobs,
        vec![SnapJob {
            path: "scratch/gone.md".into(),
            action: WatchAction::Delete,
        }]
    );
    Ok(())
}

#[tokio::test]
async fn test_initial_deletions_wait_for_initial_snapshots() -> Result<()> {
    if !git_available() {
        return Ok(());
    }
    let tmp = TempDir::new()?;
    let ws = workspace(&tmp);
    snap(&ws, SnapRequest::path("gone.md").stdin_content(b"draft\n".to_vec())).await?;
    std::fs::remove_file(ws.scratch_root().join("gone.md"))?;

    let mut observer = ScriptedObserver::new(Vec::new());
    let runner = Arc::new(RecordingRunner::default());
    let cancel = CancellationToken::new();
    stop_after(&cancel, Duration::from_millis(600));

    let opts = WatchOptions {
        include_delete: true,
        initial_snap: false,
        ..options(20)
    };
    let report = run_watch(&ws, &opts, &mut observer, runner.clone(), &quiet(), cancel).await?;

    assert_eq!(report.snaps_count, 0);
    assert!(runner.jobs.lock().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_runtime_observer_errors_do_not_stop_the_session() -> Result<()> {
    if !git_available() {
        return Ok(());
    }
    let tmp = TempDir::new()?;
    let ws = workspace(&tmp);
    let a = tmp.path().join("scratch/a.md");

    let mut observer = ScriptedObserver::new(vec![
        ObservedEvent::Error("watch descriptor lost".into()),
        ObservedEvent::Changed(a),
        ObservedEvent::Error("queue overflow".into()),
    ]);
    let closed = observer.closed.clone();
    let runner = Arc::new(RecordingRunner::default());
    let cancel = CancellationToken::new();
    stop_after(&cancel, Duration::from_millis(1000));

    let report = run_watch(&ws, &options(20), &mut observer, runner.clone(), &quiet(), cancel).await?;

    assert_eq!(report.snaps_count, 1);
    assert_eq!(runner.jobs.lock()[0].path, "scratch/a.md");
    assert!(closed.load(Ordering::SeqCst));
    Ok(())
}
