//! Atomic history truncation
//!
//! The truncated store is built next to the live one and only swapped in once
//! it is complete and verified. A failure at any point before the swap leaves
//! the live store exactly as it was.

use async_trait::async_trait;
use serde::Serialize;
use sidesnap_core::{
    ensure_sidecar, AcquireOptions, Error, ExitCode, GitClient, LockManager, Result, Workspace,
};
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PruneReport {
    pub kept: usize,
    pub removed: usize,
    /// Dropped commits, oldest first
    pub removed_commits: Vec<String>,
}

impl PruneReport {
    pub fn exit_code(&self) -> ExitCode {
        if self.removed == 0 {
            ExitCode::NoChanges
        } else {
            ExitCode::Ok
        }
    }
}

/// Produces the truncated store inside a scratch directory
#[async_trait]
pub trait ArtifactBuilder: Send + Sync {
    /// Build a store holding the newest `keep` commits of `source` and return
    /// its git directory, somewhere under `work_dir`
    async fn build(&self, source: &Path, work_dir: &Path, keep: usize) -> Result<PathBuf>;
}

/// Shallow `file://` clone of the live store
#[derive(Debug, Clone, Copy, Default)]
pub struct ShallowClone;

#[async_trait]
impl ArtifactBuilder for ShallowClone {
    async fn build(&self, source: &Path, work_dir: &Path, keep: usize) -> Result<PathBuf> {
        let clone_root = work_dir.join("clone");
        GitClient::clone_shallow(source, &clone_root, keep).await?;

        let artifact = clone_root.join(".git");
        GitClient::new(&artifact, &clone_root)
            .exec(&["remote", "remove", "origin"])
            .await?;
        Ok(artifact)
    }
}

pub async fn prune(ws: &Workspace, keep: usize, lock_opts: AcquireOptions) -> Result<PruneReport> {
    prune_with(ws, keep, lock_opts, &ShallowClone).await
}

pub async fn prune_with(
    ws: &Workspace,
    keep: usize,
    lock_opts: AcquireOptions,
    builder: &dyn ArtifactBuilder,
) -> Result<PruneReport> {
    if keep < 1 {
        return Err(Error::invalid_args("--keep must be >= 1"));
    }

    if !ws.git_dir().is_dir() {
        ensure_sidecar(ws).await?;
    }
    let mut lock = LockManager::new(ws.git_dir());
    lock.acquire(lock_opts).await?;
    ensure_sidecar(ws).await?;

    let git = GitClient::for_workspace(ws);
    let commits = git.rev_list_oldest_first().await?;
    if commits.len() <= keep {
        return Ok(PruneReport {
            kept: commits.len(),
            ..PruneReport::default()
        });
    }

    let removed_commits = commits[..commits.len() - keep].to_vec();

    let parent = ws.git_dir().parent().unwrap_or(ws.work_tree());
    let staging = tempfile::Builder::new()
        .prefix(".sidesnap-prune-")
        .tempdir_in(parent)
        .map_err(|e| Error::io("create temp dir in", parent, e))?;

    let artifact = builder.build(ws.git_dir(), staging.path(), keep).await?;
    prepare_artifact(ws, &artifact)?;
    verify_artifact(ws, &artifact, keep).await?;

    swap_store(staging, ws.git_dir(), &artifact, |from, to| fs::rename(from, to))?;

    git.reset_hard().await?;
    info!(kept = keep, removed = removed_commits.len(), "pruned snapshot history");

    // The lock directory moved with the swap; release removes the new one
    drop(lock);

    Ok(PruneReport {
        kept: keep,
        removed: removed_commits.len(),
        removed_commits,
    })
}

/// Carry the sidecar state the clone does not copy
fn prepare_artifact(ws: &Workspace, artifact: &Path) -> Result<()> {
    let exclude_src = ws.sidecar_exclude_path();
    let exclude_dst = artifact.join("info").join("exclude");
    if let Some(parent) = exclude_dst.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io("create", parent, e))?;
    }
    fs::copy(&exclude_src, &exclude_dst).map_err(|e| Error::io("copy", &exclude_src, e))?;

    let pid_src = ws.watch_pid_path();
    if let Some(name) = pid_src.file_name() {
        match fs::copy(&pid_src, artifact.join(name)) {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(Error::io("copy", &pid_src, e)),
        }
    }

    if let Some(name) = ws.lock_dir().file_name() {
        let lock_dst = artifact.join(name);
        fs::create_dir_all(&lock_dst).map_err(|e| Error::io("create", &lock_dst, e))?;
    }
    Ok(())
}

async fn verify_artifact(ws: &Workspace, artifact: &Path, keep: usize) -> Result<()> {
    let client = GitClient::new(artifact, ws.work_tree());
    if client.head().await.is_none() {
        return Err(Error::PreconditionFailed("pruned store has no HEAD".to_string()));
    }
    let count = client.commit_count().await?;
    if count != keep {
        return Err(Error::PreconditionFailed(format!(
            "pruned store holds {} commits, expected {}",
            count, keep
        )));
    }
    Ok(())
}

/// Rename the live store aside and the artifact into place
///
/// The old store ends up in `staging` and is deleted with it. If the artifact
/// cannot be moved in and the old store cannot be moved back, `staging` is
/// kept on disk so the history survives, and the error names its location.
fn swap_store<F>(staging: TempDir, live: &Path, artifact: &Path, rename: F) -> Result<()>
where
    F: Fn(&Path, &Path) -> io::Result<()>,
{
    let aside = staging.path().join("previous");
    rename(live, &aside).map_err(|e| Error::io("move aside", live, e))?;

    let Err(e) = rename(artifact, live) else {
        return Ok(());
    };
    match rename(&aside, live) {
        Ok(()) => Err(Error::io("move into place", artifact, e)),
        Err(rollback) => {
            let previous = staging.keep().join("previous");
            warn!(
                error = %rollback,
                store = %live.display(),
                previous = %previous.display(),
                "failed to restore original store"
            );
            Err(Error::Io {
                context: format!(
                    "failed to move {} into place ({}); previous store kept at {}",
                    artifact.display(),
                    e,
                    previous.display()
                ),
                source: rollback,
            })
        }
    }
}
