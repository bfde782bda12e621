//! Snapshot commits

use serde::Serialize;
use sidesnap_core::path::{resolve_snap_target, sanitize_target_path};
use sidesnap_core::{
    ensure_sidecar, AcquireOptions, Error, ExitCode, GitClient, LockManager, Result, Workspace,
};
use std::fs;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapTarget {
    /// One path, resolved against the scratch directory
    Path(String),
    /// Everything under the scratch directory
    All,
}

#[derive(Debug, Clone)]
pub struct SnapRequest {
    pub target: SnapTarget,
    pub message: Option<String>,
    /// Written to the target before staging
    pub stdin_content: Option<Vec<u8>>,
    pub space: Option<String>,
    /// A missing target stages its removal instead of creating it
    pub allow_missing: bool,
    /// Register the lock for SIGINT/SIGTERM cleanup
    pub handle_signals: bool,
    pub lock: AcquireOptions,
}

impl SnapRequest {
    pub fn path(path: impl Into<String>) -> Self {
        Self::new(SnapTarget::Path(path.into()))
    }

    pub fn all() -> Self {
        Self::new(SnapTarget::All)
    }

    fn new(target: SnapTarget) -> Self {
        Self {
            target,
            message: None,
            stdin_content: None,
            space: None,
            allow_missing: false,
            handle_signals: true,
            lock: AcquireOptions::default(),
        }
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn stdin_content(mut self, content: Vec<u8>) -> Self {
        self.stdin_content = Some(content);
        self
    }

    pub fn space(mut self, space: impl Into<String>) -> Self {
        self.space = Some(space.into());
        self
    }
}

/// Result of a snapshot; `commit` is `None` when nothing was staged
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SnapReport {
    pub commit: Option<String>,
    pub path: Option<String>,
    pub paths: Vec<String>,
    pub files_count: usize,
    pub bytes: u64,
}

impl SnapReport {
    pub fn is_committed(&self) -> bool {
        self.commit.is_some()
    }

    pub fn exit_code(&self) -> ExitCode {
        if self.is_committed() {
            ExitCode::Ok
        } else {
            ExitCode::NoChanges
        }
    }
}

pub async fn snap(ws: &Workspace, req: SnapRequest) -> Result<SnapReport> {
    if req.target == SnapTarget::All && req.space.is_some() {
        return Err(Error::invalid_args("--space cannot be combined with --all"));
    }

    if !ws.git_dir().is_dir() {
        ensure_sidecar(ws).await?;
    }
    let mut lock = LockManager::with_signal_handling(ws.git_dir(), req.handle_signals);
    lock.acquire(req.lock).await?;

    ensure_sidecar(ws).await?;
    let git = GitClient::for_workspace(ws);

    let (target_path, staged) = match &req.target {
        SnapTarget::All => {
            git.exec(&["add", "-f", ws.scratch_dir()]).await?;
            let staged = git.staged_paths().await?;
            if staged.is_empty() {
                debug!(scratch = ws.scratch_dir(), "no pending changes");
                return Ok(SnapReport::default());
            }
            (None, staged)
        }
        SnapTarget::Path(path) => {
            let resolved = resolve_snap_target(path, ws.scratch_dir(), req.space.as_deref());
            let sanitized = sanitize_target_path(&resolved, ws.work_tree(), ws.scratch_dir())
                .ok_or_else(|| Error::invalid_args("path must be within scratch directory"))?
                .into_string();

            stage_path(ws, &git, &sanitized, &req).await?;

            let staged: Vec<String> = git
                .staged_paths()
                .await?
                .into_iter()
                .filter(|entry| *entry == sanitized)
                .collect();
            if staged.is_empty() {
                debug!(path = %sanitized, "no changes");
                return Ok(SnapReport {
                    path: Some(sanitized),
                    ..SnapReport::default()
                });
            }
            (Some(sanitized), staged)
        }
    };

    let bytes = staged
        .iter()
        .filter_map(|path| fs::metadata(ws.absolute(path)).ok())
        .filter(|meta| meta.is_file())
        .map(|meta| meta.len())
        .sum();

    let message = commit_message(&req, target_path.as_deref());
    let commit = git.commit(&message).await?;
    info!(commit = %commit, files = staged.len(), "snapshot stored");

    Ok(SnapReport {
        commit: Some(commit),
        path: target_path,
        files_count: staged.len(),
        paths: staged,
        bytes,
    })
}

async fn stage_path(ws: &Workspace, git: &GitClient, sanitized: &str, req: &SnapRequest) -> Result<()> {
    let abs = ws.absolute(sanitized);

    if let Some(content) = &req.stdin_content {
        create_parent(&abs)?;
        fs::write(&abs, content).map_err(|e| Error::io("write", &abs, e))?;
    } else if !abs.exists() {
        if req.allow_missing {
            git.exec(&["rm", "--cached", "--ignore-unmatch", "--quiet", "--", sanitized])
                .await?;
            return Ok(());
        }
        create_parent(&abs)?;
        fs::write(&abs, b"").map_err(|e| Error::io("create", &abs, e))?;
    }

    git.exec(&["add", "-f", "--", sanitized]).await.map(drop)
}

fn create_parent(path: &std::path::Path) -> Result<()> {
    match path.parent() {
        Some(parent) => fs::create_dir_all(parent).map_err(|e| Error::io("create", parent, e)),
        None => Ok(()),
    }
}

fn commit_message(req: &SnapRequest, target: Option<&str>) -> String {
    let base = match (&req.message, target) {
        (Some(message), _) => message.clone(),
        (None, Some(path)) => format!("snap: {}", path),
        (None, None) => "snap: all".to_string(),
    };
    match &req.space {
        Some(space) => format!("[space:{}] {}", space, base),
        None => base,
    }
}
