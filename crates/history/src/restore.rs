//! Restore a file from a snapshot

use serde::Serialize;
use sidesnap_core::{
    ensure_sidecar, resolve_user_path, AcquireOptions, Error, GitClient, LockManager, Result, Workspace,
};
use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestoreReport {
    pub path: String,
    pub bytes: u64,
    pub revision: String,
    /// Where the previous content was moved, if the file existed
    pub backup: Option<PathBuf>,
}

pub async fn restore(
    ws: &Workspace,
    revision: &str,
    path: &str,
    lock_opts: AcquireOptions,
) -> Result<RestoreReport> {
    let sanitized = resolve_user_path(path, ws.work_tree(), ws.scratch_dir())?.into_string();

    ensure_sidecar(ws).await?;
    let mut lock = LockManager::new(ws.git_dir());
    lock.acquire(lock_opts).await?;

    let git = GitClient::for_workspace(ws);
    let spec = format!("{}:{}", revision, sanitized);
    let blob = git
        .exec_raw(&["show", spec.as_str()])
        .await
        .map_err(|_| Error::invalid_args(format!("unknown revision or path: {}", revision)))?;

    let abs = ws.absolute(&sanitized);
    let backup = if abs.exists() {
        let mut name = abs.clone().into_os_string();
        name.push(format!(".sidesnap.bak.{}", unix_millis()));
        let backup = PathBuf::from(name);
        fs::rename(&abs, &backup).map_err(|e| Error::io("back up", &abs, e))?;
        Some(backup)
    } else {
        if let Some(parent) = abs.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::io("create", parent, e))?;
        }
        None
    };

    fs::write(&abs, &blob).map_err(|e| Error::io("write", &abs, e))?;
    info!(path = %sanitized, revision, "restored file");

    Ok(RestoreReport {
        path: sanitized,
        bytes: blob.len() as u64,
        revision: revision.to_string(),
        backup,
    })
}

fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}
