//! Path sanitizer - the only way user input becomes a store-relative path
//!
//! Every command and the watch engine pass candidate paths through
//! [`sanitize_target_path`]. The result is guaranteed to live strictly inside
//! the scratch directory and is expressed with `/` separators, which is the
//! form the store expects in pathspecs and `rev:path` lookups.

use crate::error::{Error, Result};
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// A store-relative path of the form `<scratch>/<suffix>`
///
/// Never equal to the scratch root itself and never contains `..` or empty
/// segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SanitizedPath(String);

impl SanitizedPath {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for SanitizedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SanitizedPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Replace platform separators with `/`
pub fn to_posix(value: &str) -> String {
    value.replace('\\', "/")
}

/// Lexically normalize a path: drop `.` and fold `..` into its parent
///
/// No filesystem access; symlinks are not resolved.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(prefix) => out.push(prefix.as_os_str()),
            Component::RootDir => out.push(Component::RootDir.as_os_str()),
            Component::CurDir => {}
            // Popping past the root is a no-op
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            Component::Normal(part) => out.push(part),
        }
    }
    out
}

fn resolve_against(base: &Path, candidate: &Path) -> PathBuf {
    if candidate.is_absolute() {
        normalize_lexically(candidate)
    } else {
        normalize_lexically(&base.join(candidate))
    }
}

/// Sanitize a user-supplied path against the scratch directory
///
/// Relative candidates resolve against `work_tree`. Returns `None` when the
/// candidate is the scratch root itself or escapes it.
pub fn sanitize_target_path(
    candidate: &str,
    work_tree: &Path,
    scratch_dir: &str,
) -> Option<SanitizedPath> {
    let work_root = normalize_lexically(work_tree);
    let scratch_root = resolve_against(&work_root, Path::new(scratch_dir));
    let target = resolve_against(&work_root, Path::new(candidate));

    let rel = target.strip_prefix(&scratch_root).ok()?;

    let mut segments = Vec::new();
    for component in rel.components() {
        match component {
            Component::Normal(part) => {
                let segment = part.to_str()?;
                if segment.is_empty() || segment == ".." {
                    return None;
                }
                segments.push(segment);
            }
            _ => return None,
        }
    }

    if segments.is_empty() {
        return None;
    }

    let scratch = to_posix(scratch_dir);
    let scratch = scratch.trim_end_matches('/');
    Some(SanitizedPath(format!("{}/{}", scratch, segments.join("/"))))
}

/// Map a snap argument to a candidate path before sanitizing
///
/// Bare names land inside the scratch directory (or inside `space` below it);
/// paths that already name the scratch directory, and absolute paths, are
/// returned unchanged.
pub fn resolve_snap_target(path: &str, scratch_dir: &str, space: Option<&str>) -> String {
    if Path::new(path).is_absolute() {
        return path.to_string();
    }

    let normalized = to_posix(path);
    let scratch = to_posix(scratch_dir);
    let scratch_prefix = format!("{}/", scratch);
    if normalized == scratch || normalized.starts_with(&scratch_prefix) {
        return normalized;
    }

    let joined = match space {
        Some(space) => format!("{}/{}/{}", scratch, space, normalized),
        None => format!("{}/{}", scratch, normalized),
    };
    posix_normalize(&joined)
}

/// Resolve and sanitize a path argument given to a read or write command
///
/// Bare names are taken relative to the scratch directory, as `snap` does.
pub fn resolve_user_path(path: &str, work_tree: &Path, scratch_dir: &str) -> Result<SanitizedPath> {
    let resolved = resolve_snap_target(path, scratch_dir, None);
    sanitize_target_path(&resolved, work_tree, scratch_dir)
        .ok_or_else(|| Error::invalid_args("path must be within scratch directory"))
}

/// Collapse `.` and `..` segments of an already-posix path
fn posix_normalize(value: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for segment in value.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if parts.last().is_some_and(|last| *last != "..") {
                    parts.pop();
                } else {
                    parts.push("..");
                }
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}
