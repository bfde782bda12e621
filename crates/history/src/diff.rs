//! Diffs between snapshots and the working tree

use crate::timeline::parse_numstat_line;
use serde::Serialize;
use sidesnap_core::{ensure_sidecar, resolve_user_path, Error, GitClient, Result, Workspace};

#[derive(Debug, Clone, Default)]
pub struct DiffRequest {
    pub path: Option<String>,
    /// Compare the working tree against `HEAD`
    pub current: bool,
    /// Compare `HEAD~N` against `HEAD`
    pub since: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffBasis {
    /// Store has no commits
    None,
    Current,
    LatestPair,
    Since,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NumstatEntry {
    pub path: String,
    pub additions: u64,
    pub deletions: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffReport {
    pub basis: DiffBasis,
    pub base: Option<String>,
    pub target: String,
    pub patch: String,
    pub stats: Vec<NumstatEntry>,
}

impl DiffReport {
    fn empty(basis: DiffBasis, base: Option<String>, target: impl Into<String>) -> Self {
        Self {
            basis,
            base,
            target: target.into(),
            patch: String::new(),
            stats: Vec::new(),
        }
    }
}

pub async fn diff(ws: &Workspace, req: DiffRequest) -> Result<DiffReport> {
    if req.current && req.since.is_some() {
        return Err(Error::invalid_args("--current cannot be combined with --since"));
    }
    if req.since == Some(0) {
        return Err(Error::invalid_args("--since must be >= 1"));
    }
    let path = req
        .path
        .as_deref()
        .map(|p| resolve_user_path(p, ws.work_tree(), ws.scratch_dir()))
        .transpose()?;

    ensure_sidecar(ws).await?;
    let git = GitClient::for_workspace(ws);

    let Some(head) = git.head().await else {
        return Ok(DiffReport::empty(DiffBasis::None, None, "HEAD"));
    };

    let (basis, base, target, range): (DiffBasis, Option<String>, String, Vec<String>) =
        if req.current {
            (
                DiffBasis::Current,
                Some(head.clone()),
                "working-tree".to_string(),
                vec!["HEAD".to_string()],
            )
        } else {
            let (basis, rev) = match req.since {
                Some(n) => (DiffBasis::Since, format!("HEAD~{}", n)),
                None => (DiffBasis::LatestPair, "HEAD^".to_string()),
            };
            let Some(base) = git.rev_parse_verify(&rev).await else {
                return Ok(DiffReport::empty(basis, None, head));
            };
            (basis, Some(base.clone()), head.clone(), vec![base, head])
        };

    let mut patch_args: Vec<&str> = vec!["diff"];
    patch_args.extend(range.iter().map(String::as_str));
    let mut stat_args: Vec<&str> = vec!["diff", "--numstat"];
    stat_args.extend(range.iter().map(String::as_str));
    if let Some(path) = &path {
        patch_args.extend(["--", path.as_str()]);
        stat_args.extend(["--", path.as_str()]);
    }

    let patch = git.exec(&patch_args).await?;
    let stats = parse_diff_numstat(&git.exec(&stat_args).await?);

    Ok(DiffReport {
        basis,
        base,
        target,
        patch,
        stats,
    })
}

pub fn parse_diff_numstat(output: &str) -> Vec<NumstatEntry> {
    output
        .lines()
        .filter_map(parse_numstat_line)
        .map(|(additions, deletions, path)| NumstatEntry {
            path: path.to_string(),
            additions,
            deletions,
        })
        .collect()
}
