//! Per-file change timeline built from `git log --numstat`

use serde::Serialize;

/// Number of cells in the activity bar
pub const BAR_SCALE: u32 = 10;
/// Highlights kept per entry
pub const MAX_HIGHLIGHTS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HighlightKind {
    Add,
    Del,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Highlight {
    #[serde(rename = "type")]
    pub kind: HighlightKind,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelineEntry {
    pub commit: String,
    pub timestamp: String,
    pub message: String,
    pub additions: u64,
    pub deletions: u64,
    pub highlights: Vec<Highlight>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TimelineSummary {
    pub commits: usize,
    pub total_additions: u64,
    pub total_deletions: u64,
    pub net: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimelineBar {
    pub scale: u32,
    pub filled: u32,
}

impl TimelineBar {
    /// Fraction of `max_commits` drawn over `scale` cells
    pub fn compute(commits: usize, scale: u32, max_commits: usize) -> Self {
        let scale = scale.max(1);
        let max_commits = max_commits.max(1);
        let ratio = (commits as f64 / max_commits as f64).min(1.0);
        let filled = (ratio * scale as f64).round() as u32;
        Self {
            scale,
            filled: filled.min(scale),
        }
    }

    /// `[#####.....]`
    pub fn render(&self) -> String {
        let filled = self.filled as usize;
        let empty = self.scale.saturating_sub(self.filled) as usize;
        format!("[{}{}]", "#".repeat(filled), ".".repeat(empty))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Timeline {
    pub path: String,
    pub summary: TimelineSummary,
    pub bars: TimelineBar,
    pub entries: Vec<TimelineEntry>,
}

/// Log format consumed by [`parse_numstat`]
pub const TIMELINE_FORMAT: &str = "--pretty=commit %H%ndate %ad%nmessage %s";

/// Parse `git log --numstat` output, counting only lines for `target`
pub fn parse_numstat(output: &str, target: &str) -> (Vec<TimelineEntry>, TimelineSummary) {
    let mut entries: Vec<TimelineEntry> = Vec::new();
    let mut total_additions = 0u64;
    let mut total_deletions = 0u64;

    for line in output.lines() {
        if line.trim().is_empty() {
            continue;
        }
        if let Some(commit) = line.strip_prefix("commit ") {
            entries.push(TimelineEntry {
                commit: commit.trim().to_string(),
                timestamp: String::new(),
                message: String::new(),
                additions: 0,
                deletions: 0,
                highlights: Vec::new(),
            });
            continue;
        }
        let Some(current) = entries.last_mut() else {
            continue;
        };
        if let Some(date) = line.strip_prefix("date ") {
            current.timestamp = date.to_string();
            continue;
        }
        if let Some(message) = line.strip_prefix("message ") {
            current.message = message.to_string();
            continue;
        }

        let Some((additions, deletions, file)) = parse_numstat_line(line) else {
            continue;
        };
        if file != target {
            continue;
        }
        current.additions += additions;
        current.deletions += deletions;
        total_additions += additions;
        total_deletions += deletions;
        if additions > 0 {
            current.highlights.push(Highlight {
                kind: HighlightKind::Add,
                text: format!("+{} lines", additions),
            });
        }
        if deletions > 0 {
            current.highlights.push(Highlight {
                kind: HighlightKind::Del,
                text: format!("-{} lines", deletions),
            });
        }
    }

    let entries: Vec<TimelineEntry> = entries
        .into_iter()
        .filter(|e| e.additions > 0 || e.deletions > 0 || !e.message.is_empty())
        .map(|mut e| {
            e.highlights.truncate(MAX_HIGHLIGHTS);
            e
        })
        .collect();

    let summary = TimelineSummary {
        commits: entries.len(),
        total_additions,
        total_deletions,
        net: total_additions as i64 - total_deletions as i64,
    };
    (entries, summary)
}

/// `<added>\t<deleted>\t<file>`; binary files report `-`, counted as 0
pub fn parse_numstat_line(line: &str) -> Option<(u64, u64, &str)> {
    let mut parts = line.splitn(3, '\t');
    let additions = parse_count(parts.next()?)?;
    let deletions = parse_count(parts.next()?)?;
    let file = parts.next().filter(|f| !f.is_empty())?;
    Some((additions, deletions, file))
}

fn parse_count(field: &str) -> Option<u64> {
    if field == "-" {
        Some(0)
    } else {
        field.parse().ok()
    }
}
