//! Glob patterns for the watch engine
//!
//! Supported syntax, matched against `/`-separated paths:
//! - `*` any run of characters except `/`
//! - `**/` zero or more whole directories
//! - `**` any run of characters including `/`
//! - `?` one character except `/`

use regex::Regex;
use sidesnap_core::path::{normalize_lexically, to_posix};
use sidesnap_core::{Error, Result};
use std::path::Path;

/// Compiled watch pattern
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    pub fn new(pattern: &str) -> Result<Self> {
        let source = to_posix(pattern);
        let regex = Regex::new(&glob_to_regex(&source))
            .map_err(|e| Error::invalid_args(format!("invalid pattern {}: {}", pattern, e)))?;
        Ok(Self { source, regex })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, candidate: &str) -> bool {
        self.regex.is_match(&to_posix(candidate))
    }

    /// Directory to hand to the observer
    pub fn watch_root(&self) -> &str {
        watch_root(&self.source)
    }
}

/// Translate a glob into an anchored regex
pub fn glob_to_regex(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len() * 2 + 2);
    out.push('^');

    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '*' => {
                let mut stars = 1;
                while chars.get(i + stars) == Some(&'*') {
                    stars += 1;
                }
                i += stars;
                if stars == 1 {
                    out.push_str("[^/]*");
                } else if chars.get(i) == Some(&'/') {
                    out.push_str("(?:.*/)?");
                    i += 1;
                } else {
                    out.push_str(".*");
                }
            }
            '?' => {
                out.push_str("[^/]");
                i += 1;
            }
            c => {
                let mut buf = [0u8; 4];
                out.push_str(&regex::escape(c.encode_utf8(&mut buf)));
                i += 1;
            }
        }
    }

    out.push('$');
    out
}

/// Leading segments without wildcards, or the whole pattern when there are none
pub fn watch_root(pattern: &str) -> &str {
    let mut end = 0;
    for (idx, segment) in split_with_offsets(pattern) {
        if segment.contains('*') || segment.contains('?') {
            break;
        }
        end = idx + segment.len();
    }
    if end == 0 {
        pattern
    } else {
        &pattern[..end]
    }
}

fn split_with_offsets(value: &str) -> impl Iterator<Item = (usize, &str)> {
    let mut offset = 0;
    value.split('/').map(move |segment| {
        let start = offset;
        offset += segment.len() + 1;
        (start, segment)
    })
}

/// Validate a user pattern and make it relative to the work tree
pub fn resolve_pattern(pattern: &str, work_tree: &Path, scratch_dir: &str) -> Result<String> {
    let normalized = to_posix(pattern);
    if normalized.split('/').any(|segment| segment == "..") {
        return Err(Error::invalid_args(
            "pattern must not traverse outside the working tree",
        ));
    }

    let resolved = if Path::new(&normalized).is_absolute() {
        let work_root = normalize_lexically(work_tree);
        let rel = Path::new(&normalized)
            .strip_prefix(&work_root)
            .ok()
            .map(|rel| to_posix(&rel.to_string_lossy()))
            .filter(|rel| !rel.is_empty())
            .ok_or_else(|| Error::invalid_args("pattern must be within the working tree"))?;
        rel
    } else {
        normalized
    };

    if resolved.trim().is_empty() {
        return Err(Error::invalid_args("pattern is required"));
    }

    let scratch = scratch_dir.trim_end_matches('/');
    if resolved != scratch && !resolved.starts_with(&format!("{}/", scratch)) {
        return Err(Error::invalid_args("pattern must target the scratch directory"));
    }
    Ok(resolved)
}
