//! Read-only store status

use serde::Serialize;
use sidesnap_core::ensure::contains_line;
use sidesnap_core::gitdir::find_host_git_dir;
use sidesnap_core::{GitClient, Result, Workspace};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HostExclude {
    pub git_dir: bool,
    pub scratch_dir: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SidecarExclude {
    pub wildcard: bool,
    pub scratch_dir: bool,
    pub scratch_glob: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExcludeStatus {
    pub main: HostExclude,
    pub sidecar: SidecarExclude,
}

/// Working-tree changes under the scratch directory
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusChanges {
    pub added: Vec<String>,
    pub modified: Vec<String>,
    pub deleted: Vec<String>,
}

impl StatusChanges {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub initialized: bool,
    pub locked: bool,
    pub git_dir: PathBuf,
    pub scratch_dir: String,
    pub exclude: ExcludeStatus,
    pub changes: StatusChanges,
}

/// Inspect the sidecar without creating or locking anything
pub async fn status(ws: &Workspace) -> Result<StatusReport> {
    let initialized = ws.is_initialized();
    let locked = ws.lock_dir().exists();

    let host = find_host_git_dir(ws.work_tree())
        .map(|dir| read_exclude(&dir.join("info").join("exclude")))
        .unwrap_or_default();
    let sidecar = read_exclude(&ws.sidecar_exclude_path());
    let scratch = ws.scratch_dir();

    let exclude = ExcludeStatus {
        main: HostExclude {
            git_dir: contains_line(&host, &ws.git_dir_exclude_entry()),
            scratch_dir: contains_line(&host, &format!("{}/", scratch)),
        },
        sidecar: SidecarExclude {
            wildcard: contains_line(&sidecar, "*"),
            scratch_dir: contains_line(&sidecar, &format!("!{}/", scratch)),
            scratch_glob: contains_line(&sidecar, &format!("!{}/**", scratch)),
        },
    };

    let changes = if initialized {
        let output = GitClient::for_workspace(ws).status_porcelain().await?;
        parse_git_status(&output, scratch)
    } else {
        StatusChanges::default()
    };

    Ok(StatusReport {
        initialized,
        locked,
        git_dir: ws.git_dir().to_path_buf(),
        scratch_dir: scratch.to_string(),
        exclude,
        changes,
    })
}

fn read_exclude(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_default()
}

/// Classify `git status --porcelain` lines under `scratch_dir`
///
/// Untracked and added entries are `added`; renames and copies report their
/// destination as `added`.
pub fn parse_git_status(output: &str, scratch_dir: &str) -> StatusChanges {
    let prefix = format!("{}/", scratch_dir.trim_end_matches('/'));
    let mut changes = StatusChanges::default();

    for line in output.lines() {
        if line.len() < 4 {
            continue;
        }
        let (code, rest) = line.split_at(2);
        let raw = rest.trim_start();
        let path = match raw.rsplit_once(" -> ") {
            Some((_, dest)) => dest,
            None => raw,
        };
        let path = unquote(path);
        if !path.starts_with(&prefix) {
            continue;
        }

        let mut flags = code.chars();
        let index = flags.next().unwrap_or(' ');
        let worktree = flags.next().unwrap_or(' ');
        let bucket = if code == "??" || index == 'A' || index == 'R' || index == 'C' {
            &mut changes.added
        } else if index == 'D' || worktree == 'D' {
            &mut changes.deleted
        } else {
            &mut changes.modified
        };
        bucket.push(path);
    }
    changes
}

fn unquote(path: &str) -> String {
    path.strip_prefix('"')
        .and_then(|p| p.strip_suffix('"'))
        .unwrap_or(path)
        .to_string()
}
