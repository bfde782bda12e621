//! Idempotent sidecar bootstrap

use crate::error::{Error, Result};
use crate::git::GitClient;
use crate::gitdir::find_host_git_dir;
use crate::workspace::Workspace;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Outcome of [`ensure_sidecar`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnsureReport {
    /// The store was created by this call
    pub initialized: bool,
    pub git_dir: PathBuf,
    pub scratch_dir: String,
    /// Files under the scratch directory, `<scratch>/`-prefixed and sorted
    pub files: Vec<String>,
}

/// Make sure the store, the scratch directory and both exclude files exist
///
/// Safe to run before every operation. Does not take the store lock.
pub async fn ensure_sidecar(ws: &Workspace) -> Result<EnsureReport> {
    let git = GitClient::for_workspace(ws);

    let initialized = if ws.is_initialized() {
        false
    } else {
        fs::create_dir_all(ws.git_dir()).map_err(|e| Error::io("create", ws.git_dir(), e))?;
        git.init().await?;
        info!(git_dir = %ws.git_dir().display(), "initialized sidecar store");
        true
    };

    let scratch_root = ws.scratch_root();
    fs::create_dir_all(&scratch_root).map_err(|e| Error::io("create", &scratch_root, e))?;

    if let Some(host) = find_host_git_dir(ws.work_tree()) {
        let entries = [format!("{}/", ws.scratch_dir()), ws.git_dir_exclude_entry()];
        append_missing_lines(&host.join("info").join("exclude"), &entries)?;
    } else {
        debug!(work_tree = %ws.work_tree().display(), "no host repository found");
    }

    let scratch = ws.scratch_dir();
    let sidecar_entries = [
        "*".to_string(),
        format!("!{}/", scratch),
        format!("!{}/**", scratch),
    ];
    append_missing_lines(&ws.sidecar_exclude_path(), &sidecar_entries)?;

    let files = list_files(&scratch_root)?
        .into_iter()
        .map(|file| format!("{}/{}", scratch, file))
        .collect();

    Ok(EnsureReport {
        initialized,
        git_dir: ws.git_dir().to_path_buf(),
        scratch_dir: scratch.to_string(),
        files,
    })
}

/// Append the entries not already present as a trimmed line
///
/// Existing content is kept verbatim; a newline is inserted first when the
/// file does not end with one. Returns whether the file changed.
pub fn append_missing_lines(path: &Path, entries: &[String]) -> Result<bool> {
    let current = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(Error::io("read", path, e)),
    };

    let missing: Vec<&str> = entries
        .iter()
        .map(String::as_str)
        .filter(|entry| !contains_line(&current, entry))
        .fold(Vec::new(), |mut acc, entry| {
            if !acc.contains(&entry) {
                acc.push(entry);
            }
            acc
        });
    if missing.is_empty() {
        return Ok(false);
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io("create", parent, e))?;
    }

    let mut content = current;
    if !content.is_empty() && !content.ends_with('\n') {
        content.push('\n');
    }
    for entry in missing {
        content.push_str(entry);
        content.push('\n');
    }
    fs::write(path, content).map_err(|e| Error::io("write", path, e))?;
    debug!(path = %path.display(), "updated exclude file");
    Ok(true)
}

/// Whether `content` has a line equal to `entry` once trimmed
pub fn contains_line(content: &str, entry: &str) -> bool {
    content.lines().any(|line| line.trim() == entry)
}

/// Files under `root`, relative, `/`-separated and sorted
///
/// A missing root yields an empty list.
pub fn list_files(root: &Path) -> Result<Vec<String>> {
    if !root.exists() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).min_depth(1) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            Error::io("walk", path, e.into())
        })?;
        if entry.file_type().is_dir() {
            continue;
        }
        if let Ok(relative) = entry.path().strip_prefix(root) {
            let segments: Vec<String> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            files.push(segments.join("/"));
        }
    }
    files.sort();
    Ok(files)
}
