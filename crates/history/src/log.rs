//! Snapshot log and per-file timeline

use crate::timeline::{parse_numstat, Timeline, TimelineBar, BAR_SCALE, TIMELINE_FORMAT};
use serde::Serialize;
use sidesnap_core::{ensure_sidecar, resolve_user_path, Error, GitClient, Result, Workspace};

const FIELD_SEP: char = '\u{1f}';
const LOG_FORMAT: &str = "--pretty=%H%x1f%ad%x1f%s";

#[derive(Debug, Clone, Default)]
pub struct LogRequest {
    pub path: Option<String>,
    /// Limit to the newest N commits
    pub since: Option<usize>,
    pub timeline: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub commit: String,
    pub timestamp: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LogReport {
    pub entries: Vec<LogEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeline: Option<Timeline>,
}

pub async fn log(ws: &Workspace, req: LogRequest) -> Result<LogReport> {
    if req.timeline && req.path.is_none() {
        return Err(Error::invalid_args("timeline mode requires a path"));
    }
    let path = req
        .path
        .as_deref()
        .map(|p| resolve_user_path(p, ws.work_tree(), ws.scratch_dir()))
        .transpose()?;

    ensure_sidecar(ws).await?;
    let git = GitClient::for_workspace(ws);
    if git.head().await.is_none() {
        return Ok(LogReport::default());
    }

    let limit = req.since.filter(|n| *n > 0).map(|n| format!("-{}", n));

    if let (true, Some(sanitized)) = (req.timeline, &path) {
        let mut args = vec!["log", "--follow", "--date=iso-strict", TIMELINE_FORMAT, "--numstat"];
        if let Some(limit) = &limit {
            args.push(limit.as_str());
        }
        args.extend(["--", sanitized.as_str()]);
        let output = git.exec(&args).await?;

        let (entries, summary) = parse_numstat(&output, sanitized.as_str());
        let bars = TimelineBar::compute(entries.len(), BAR_SCALE, entries.len());
        return Ok(LogReport {
            entries: Vec::new(),
            timeline: Some(Timeline {
                path: sanitized.to_string(),
                summary,
                bars,
                entries,
            }),
        });
    }

    let mut args = vec!["log", "--date=iso-strict", LOG_FORMAT, "--name-only"];
    if let Some(limit) = &limit {
        args.push(limit.as_str());
    }
    if let Some(path) = &path {
        args.extend(["--", path.as_str()]);
    }
    let output = git.exec(&args).await?;

    Ok(LogReport {
        entries: parse_log(&output, path.as_ref().map(|p| p.as_str())),
        timeline: None,
    })
}

/// Parse `%H<US>%ad<US>%s` headers followed by `--name-only` file lists
///
/// Each entry takes the first file listed under it, or `fallback`.
pub fn parse_log(output: &str, fallback: Option<&str>) -> Vec<LogEntry> {
    let mut entries: Vec<LogEntry> = Vec::new();
    for line in output.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }
        if line.contains(FIELD_SEP) {
            let mut fields = line.splitn(3, FIELD_SEP);
            let commit = fields.next().unwrap_or_default();
            let timestamp = fields.next().unwrap_or_default();
            let message = fields.next().unwrap_or_default();
            if commit.is_empty() || timestamp.is_empty() {
                continue;
            }
            entries.push(LogEntry {
                commit: commit.to_string(),
                timestamp: timestamp.to_string(),
                message: message.to_string(),
                path: None,
            });
        } else if let Some(entry) = entries.last_mut() {
            if entry.path.is_none() {
                entry.path = Some(line.to_string());
            }
        }
    }

    for entry in &mut entries {
        if entry.path.is_none() {
            entry.path = fallback.map(str::to_string);
        }
    }
    entries
}
