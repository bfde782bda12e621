//! Store client: `git` driven as a subprocess
//!
//! Every invocation pins the store and the work tree explicitly, both on the
//! command line and through `GIT_DIR` / `GIT_WORK_TREE`, so an enclosing host
//! repository is never picked up.

use crate::error::{Error, GitError, Result};
use crate::workspace::Workspace;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

const FALLBACK_NAME: &str = "user.name=sidesnap";
const FALLBACK_EMAIL: &str = "user.email=sidesnap@localhost";

/// Per-call options
#[derive(Debug, Clone, Copy)]
pub struct ExecOptions {
    /// Trim a single trailing newline from stdout
    pub trim: bool,
}

impl Default for ExecOptions {
    fn default() -> Self {
        Self { trim: true }
    }
}

/// Captured output of a successful invocation
#[derive(Debug, Clone, Default)]
pub struct GitOutput {
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Clone)]
pub struct GitClient {
    git_dir: PathBuf,
    work_tree: PathBuf,
}

impl GitClient {
    pub fn new(git_dir: impl Into<PathBuf>, work_tree: impl Into<PathBuf>) -> Self {
        Self {
            git_dir: git_dir.into(),
            work_tree: work_tree.into(),
        }
    }

    pub fn for_workspace(ws: &Workspace) -> Self {
        Self::new(ws.git_dir(), ws.work_tree())
    }

    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    pub fn work_tree(&self) -> &Path {
        &self.work_tree
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new("git");
        cmd.arg("--git-dir")
            .arg(&self.git_dir)
            .arg("--work-tree")
            .arg(&self.work_tree)
            .args(args)
            .env("GIT_DIR", &self.git_dir)
            .env("GIT_WORK_TREE", &self.work_tree)
            .current_dir(&self.work_tree)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    async fn run(&self, args: &[&str]) -> Result<(Vec<u8>, String)> {
        debug!(args = ?args, "git");
        let output = self
            .command(args)
            .output()
            .await
            .map_err(|e| Error::io("spawn git in", &self.work_tree, e))?;

        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if !output.status.success() {
            return Err(GitError {
                args: args.iter().map(|a| a.to_string()).collect(),
                exit_code: output.status.code(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr,
            }
            .into());
        }
        Ok((output.stdout, stderr))
    }

    /// Run git and decode stdout as UTF-8, trimming one trailing newline
    pub async fn exec(&self, args: &[&str]) -> Result<String> {
        Ok(self.exec_with(args, ExecOptions::default()).await?.stdout)
    }

    pub async fn exec_with(&self, args: &[&str], opts: ExecOptions) -> Result<GitOutput> {
        let (stdout, stderr) = self.run(args).await?;
        let mut stdout = String::from_utf8_lossy(&stdout).into_owned();
        if opts.trim && stdout.ends_with('\n') {
            stdout.pop();
            if stdout.ends_with('\r') {
                stdout.pop();
            }
        }
        Ok(GitOutput { stdout, stderr })
    }

    /// Run git and return stdout untouched
    pub async fn exec_raw(&self, args: &[&str]) -> Result<Vec<u8>> {
        Ok(self.run(args).await?.0)
    }

    pub async fn init(&self) -> Result<()> {
        self.exec(&["init", "--quiet"]).await.map(drop)
    }

    /// Resolve `HEAD`; `None` on a store without commits
    pub async fn head(&self) -> Option<String> {
        self.rev_parse_verify("HEAD").await
    }

    /// `rev-parse --verify`; a failure is treated as an absent revision
    pub async fn rev_parse_verify(&self, rev: &str) -> Option<String> {
        self.exec(&["rev-parse", "--verify", "--quiet", rev])
            .await
            .ok()
            .filter(|s| !s.is_empty())
    }

    /// Commits reachable from `HEAD`, oldest first
    pub async fn rev_list_oldest_first(&self) -> Result<Vec<String>> {
        if self.head().await.is_none() {
            return Ok(Vec::new());
        }
        let out = self.exec(&["rev-list", "--reverse", "HEAD"]).await?;
        Ok(lines(&out))
    }

    pub async fn commit_count(&self) -> Result<usize> {
        let out = self.exec(&["rev-list", "--count", "HEAD"]).await?;
        out.trim()
            .parse()
            .map_err(|_| Error::PreconditionFailed(format!("unexpected commit count: {}", out)))
    }

    pub async fn staged_paths(&self) -> Result<Vec<String>> {
        let out = self.exec(&["diff", "--cached", "--name-only"]).await?;
        Ok(lines(&out))
    }

    pub async fn status_porcelain(&self) -> Result<String> {
        self.exec_with(&["status", "--porcelain"], ExecOptions { trim: false })
            .await
            .map(|o| o.stdout)
    }

    /// Commit the index and return the new `HEAD`
    ///
    /// A machine without a configured identity commits as `sidesnap`.
    pub async fn commit(&self, message: &str) -> Result<String> {
        let has_identity = self.exec(&["config", "--get", "user.email"]).await.is_ok();
        if has_identity {
            self.exec(&["commit", "--quiet", "-m", message]).await?;
        } else {
            self.exec(&[
                "-c",
                FALLBACK_NAME,
                "-c",
                FALLBACK_EMAIL,
                "commit",
                "--quiet",
                "-m",
                message,
            ])
            .await?;
        }
        self.exec(&["rev-parse", "HEAD"]).await
    }

    pub async fn reset_hard(&self) -> Result<()> {
        self.exec(&["reset", "--hard", "--quiet"]).await.map(drop)
    }

    /// `git clone --depth <depth> --no-checkout file://<source> <dest>`
    ///
    /// The `file://` form is what makes git honour `--depth` for a local
    /// source.
    pub async fn clone_shallow(source: &Path, dest: &Path, depth: usize) -> Result<()> {
        let url = format!("file://{}", source.display());
        let depth = depth.to_string();
        let dest_str = dest.to_string_lossy();
        let args = [
            "clone",
            "--quiet",
            "--depth",
            depth.as_str(),
            "--no-checkout",
            url.as_str(),
            dest_str.as_ref(),
        ];
        debug!(args = ?args, "git");

        let parent = dest.parent().unwrap_or(dest);
        let output = Command::new("git")
            .args(args)
            .env_remove("GIT_DIR")
            .env_remove("GIT_WORK_TREE")
            .current_dir(parent)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| Error::io("spawn git in", parent, e))?;

        if !output.status.success() {
            return Err(GitError {
                args: args.iter().map(|a| a.to_string()).collect(),
                exit_code: output.status.code(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            }
            .into());
        }
        Ok(())
    }
}

/// Non-empty lines of a git listing
pub fn lines(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim_end)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// Whether a `git` binary can be spawned
pub fn git_available() -> bool {
    std::process::Command::new("git")
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_skips_blanks() {
        assert_eq!(lines("a\n\nb\r\n"), vec!["a".to_string(), "b".to_string()]);
        assert!(lines("").is_empty());
    }

    #[tokio::test]
    async fn failed_invocation_carries_arguments() -> anyhow::Result<()> {
        if !git_available() {
            return Ok(());
        }
        let dir = tempfile::tempdir()?;
        let client = GitClient::new(dir.path().join(".git-scratch"), dir.path());
        let err = client.exec(&["rev-list", "HEAD"]).await.unwrap_err();
        match err {
            Error::Git(git) => {
                assert_eq!(git.args, vec!["rev-list".to_string(), "HEAD".to_string()]);
                assert_ne!(git.exit_code, Some(0));
            }
            other => panic!("unexpected error: {other}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn head_is_absent_on_fresh_store() -> anyhow::Result<()> {
        if !git_available() {
            return Ok(());
        }
        let dir = tempfile::tempdir()?;
        let client = GitClient::new(dir.path().join(".git-scratch"), dir.path());
        client.init().await?;
        assert!(client.head().await.is_none());
        assert!(client.rev_list_oldest_first().await?.is_empty());
        Ok(())
    }
}
