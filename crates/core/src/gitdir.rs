//! Host repository discovery

use std::fs;
use std::path::{Path, PathBuf};

/// Find the git directory of the repository enclosing `start`
///
/// Walks upward looking for `.git`. A directory is returned as-is; a file
/// (worktrees, submodules) is followed through its `gitdir:` line, resolved
/// relative to the file's directory.
pub fn find_host_git_dir(start: &Path) -> Option<PathBuf> {
    let mut current = Some(start);
    while let Some(dir) = current {
        let candidate = dir.join(".git");
        if candidate.is_dir() {
            return Some(candidate);
        }
        if candidate.is_file() {
            if let Some(target) = read_gitdir_file(&candidate) {
                return Some(target);
            }
        }
        current = dir.parent();
    }
    None
}

fn read_gitdir_file(file: &Path) -> Option<PathBuf> {
    let content = fs::read_to_string(file).ok()?;
    let base = file.parent()?;
    parse_gitdir_line(&content).map(|target| base.join(target))
}

/// Extract the target of a `gitdir: <path>` line
pub fn parse_gitdir_line(content: &str) -> Option<&str> {
    content
        .lines()
        .filter_map(|line| line.trim().strip_prefix("gitdir:"))
        .map(str::trim)
        .find(|target| !target.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_gitdir_pointer() {
        assert_eq!(parse_gitdir_line("gitdir: ../.git/worktrees/x\n"), Some("../.git/worktrees/x"));
        assert_eq!(parse_gitdir_line("something else\n"), None);
        assert_eq!(parse_gitdir_line("gitdir:   \n"), None);
    }

    #[test]
    fn finds_directory_above_start() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        fs::create_dir_all(root.path().join(".git"))?;
        let nested = root.path().join("a/b");
        fs::create_dir_all(&nested)?;

        assert_eq!(find_host_git_dir(&nested), Some(root.path().join(".git")));
        Ok(())
    }

    #[test]
    fn follows_gitdir_file() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let real = root.path().join("main/.git/worktrees/feature");
        fs::create_dir_all(&real)?;
        let tree = root.path().join("feature");
        fs::create_dir_all(&tree)?;
        fs::write(tree.join(".git"), "gitdir: ../main/.git/worktrees/feature\n")?;

        let found = find_host_git_dir(&tree).expect("git dir");
        assert_eq!(found, tree.join("../main/.git/worktrees/feature"));
        assert!(found.is_dir());
        Ok(())
    }
}
