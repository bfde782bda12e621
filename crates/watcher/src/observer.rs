//! Filesystem observers
//!
//! The [`Observer`] trait is the seam between the watch session and the
//! platform: production code uses [`NotifyObserver`] (inotify, FSEvents or
//! ReadDirectoryChangesW through `notify`), tests drive the session with
//! scripted events.

use crate::ObservedEvent;
use anyhow::{Context, Result};
use async_trait::async_trait;
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::debug;
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, Default)]
pub struct ObserverOptions {
    /// Skip `Added` events for files present at startup
    pub ignore_initial: bool,
}

#[async_trait]
pub trait Observer: Send {
    /// Begin observing `root`, sending events to `sink`
    ///
    /// Emits `Ready` once the initial scan is done. An error aborts startup.
    async fn start(
        &mut self,
        root: &Path,
        options: ObserverOptions,
        sink: mpsc::UnboundedSender<ObservedEvent>,
    ) -> Result<()>;

    /// Stop observing; no events are sent afterwards
    async fn close(&mut self) -> Result<()>;
}

/// Recursive `notify` watcher
#[derive(Default)]
pub struct NotifyObserver {
    watcher: Option<RecommendedWatcher>,
}

impl NotifyObserver {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Observer for NotifyObserver {
    async fn start(
        &mut self,
        root: &Path,
        options: ObserverOptions,
        sink: mpsc::UnboundedSender<ObservedEvent>,
    ) -> Result<()> {
        let event_sink = sink.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            match res {
                Ok(event) => {
                    for observed in convert_event(event) {
                        let _ = event_sink.send(observed);
                    }
                }
                Err(e) => {
                    let _ = event_sink.send(ObservedEvent::Error(e.to_string()));
                }
            }
        })
        .context("Failed to create file watcher")?;

        watcher
            .watch(root, RecursiveMode::Recursive)
            .with_context(|| format!("Failed to watch {}", root.display()))?;
        self.watcher = Some(watcher);
        debug!(root = %root.display(), "observer started");

        if !options.ignore_initial {
            let root = root.to_path_buf();
            let files = tokio::task::spawn_blocking(move || initial_files(&root))
                .await
                .context("Initial scan panicked")??;
            for file in files {
                let _ = sink.send(ObservedEvent::Added(file));
            }
        }
        let _ = sink.send(ObservedEvent::Ready);
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        // Dropping the watcher stops the backend thread
        if self.watcher.take().is_some() {
            debug!("observer closed");
        }
        Ok(())
    }
}

fn initial_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
        let entry = entry.context("Initial scan failed")?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Map a notify event onto zero or more observed events
pub fn convert_event(event: Event) -> Vec<ObservedEvent> {
    let Event { kind, paths, .. } = event;
    match kind {
        EventKind::Create(_) => paths
            .into_iter()
            .filter(|p| !p.is_dir())
            .map(ObservedEvent::Added)
            .collect(),
        EventKind::Remove(_) => paths.into_iter().map(ObservedEvent::Removed).collect(),
        EventKind::Modify(ModifyKind::Name(mode)) => convert_rename(mode, paths),
        EventKind::Modify(_) => paths
            .into_iter()
            .filter(|p| !p.is_dir())
            .map(ObservedEvent::Changed)
            .collect(),
        EventKind::Access(_) | EventKind::Any | EventKind::Other => Vec::new(),
    }
}

fn convert_rename(mode: RenameMode, paths: Vec<PathBuf>) -> Vec<ObservedEvent> {
    match mode {
        RenameMode::From => paths.into_iter().map(ObservedEvent::Removed).collect(),
        RenameMode::To => paths
            .into_iter()
            .filter(|p| !p.is_dir())
            .map(ObservedEvent::Added)
            .collect(),
        RenameMode::Both => {
            let mut iter = paths.into_iter();
            let mut out = Vec::new();
            if let Some(from) = iter.next() {
                out.push(ObservedEvent::Removed(from));
            }
            out.extend(iter.filter(|p| !p.is_dir()).map(ObservedEvent::Added));
            out
        }
        // Backends that cannot tell the direction
        _ => paths
            .into_iter()
            .map(|p| {
                if p.exists() {
                    ObservedEvent::Added(p)
                } else {
                    ObservedEvent::Removed(p)
                }
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, RemoveKind};
    use std::time::Duration;

    fn event(kind: EventKind, paths: &[&str]) -> Event {
        let mut event = Event::new(kind);
        for p in paths {
            event = event.add_path(PathBuf::from(p));
        }
        event
    }

    #[test]
    fn converts_basic_kinds() {
        assert_eq!(
            convert_event(event(EventKind::Create(CreateKind::File), &["/nope/a.md"])),
            vec![ObservedEvent::Added(PathBuf::from("/nope/a.md"))]
        );
        assert_eq!(
            convert_event(event(
                EventKind::Modify(ModifyKind::Data(DataChange::Content)),
                &["/nope/a.md"]
            )),
            vec![ObservedEvent::Changed(PathBuf::from("/nope/a.md"))]
        );
        assert_eq!(
            convert_event(event(EventKind::Remove(RemoveKind::File), &["/nope/a.md"])),
            vec![ObservedEvent::Removed(PathBuf::from("/nope/a.md"))]
        );
        assert!(convert_event(event(EventKind::Any, &["/nope/a.md"])).is_empty());
    }

    #[test]
    fn rename_both_removes_source_and_adds_target() {
        let converted = convert_event(event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            &["/nope/old.md", "/nope/new.md"],
        ));
        assert_eq!(
            converted,
            vec![
                ObservedEvent::Removed(PathBuf::from("/nope/old.md")),
                ObservedEvent::Added(PathBuf::from("/nope/new.md")),
            ]
        );
    }

    #[tokio::test]
    async fn initial_scan_then_ready() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        std::fs::create_dir_all(dir.path().join("sub"))?;
        std::fs::write(dir.path().join("a.md"), "a")?;
        std::fs::write(dir.path().join("sub/b.md"), "b")?;

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut observer = NotifyObserver::new();
        observer.start(dir.path(), ObserverOptions::default(), tx).await?;

        let mut initial = Vec::new();
        loop {
            match tokio::time::timeout(Duration::from_secs(5), rx.recv()).await? {
                Some(ObservedEvent::Added(p)) => initial.push(p),
                Some(ObservedEvent::Ready) => break,
                Some(_) => {}
                None => anyhow::bail!("observer channel closed"),
            }
        }
        initial.sort();
        assert_eq!(initial, vec![dir.path().join("a.md"), dir.path().join("sub/b.md")]);

        observer.close().await?;
        Ok(())
    }

    #[tokio::test]
    async fn ignore_initial_only_sends_ready() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join("a.md"), "a")?;

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut observer = NotifyObserver::new();
        observer
            .start(dir.path(), ObserverOptions { ignore_initial: true }, tx)
            .await?;
        assert_eq!(rx.recv().await, Some(ObservedEvent::Ready));
        observer.close().await?;
        Ok(())
    }
}
