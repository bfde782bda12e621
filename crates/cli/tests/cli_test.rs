//! End-to-end runs of the `sidesnap` binary

use anyhow::Result;
use serde_json::Value;
use sidesnap_core::git::git_available;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

/// Runs the binary in `dir` with a private config home
fn sidesnap(dir: &Path, args: &[&str]) -> Result<Output> {
    let output = Command::new(env!("CARGO_BIN_EXE_sidesnap"))
        .args(args)
        .current_dir(dir)
        .env("HOME", dir)
        .env("XDG_CONFIG_HOME", dir.join(".config"))
        .env_remove("SIDESNAP_WORK_TREE")
        .env_remove("SIDESNAP_SCRATCH")
        .env_remove("SIDESNAP_GIT_DIR")
        .env_remove("RUST_LOG")
        .output()?;
    Ok(output)
}

fn stdout_json(output: &Output) -> Result<Value> {
    let text = String::from_utf8(output.stdout.clone())?;
    Ok(serde_json::from_str(text.trim())?)
}

#[test]
fn test_prompt_mentions_core_commands() -> Result<()> {
    let tmp = TempDir::new()?;
    let output = sidesnap(tmp.path(), &["prompt"])?;

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("sidesnap ensure --json"));
    assert!(stdout.contains("sidesnap snap"));
    assert!(stdout.contains("Exit code 10"));
    Ok(())
}

#[test]
fn test_prompt_json_envelope() -> Result<()> {
    let tmp = TempDir::new()?;
    let output = sidesnap(tmp.path(), &["prompt", "--json"])?;

    let value = stdout_json(&output)?;
    assert_eq!(value["status"], "ok");
    assert_eq!(value["code"], 0);
    assert!(value["data"]["prompt"].as_str().unwrap().contains("sidesnap"));
    Ok(())
}

#[test]
fn test_snap_lifecycle_exit_codes() -> Result<()> {
    if !git_available() {
        return Ok(());
    }
    let tmp = TempDir::new()?;
    let dir = tmp.path();

    let ensure = sidesnap(dir, &["ensure", "--json"])?;
    assert_eq!(ensure.status.code(), Some(0));
    assert_eq!(stdout_json(&ensure)?["data"]["initialized"], true);
    assert!(dir.join(".git-scratch/HEAD").exists());

    fs::write(dir.join("scratch/notes.md"), "first\n")?;
    let first = sidesnap(dir, &["snap", "scratch/notes.md", "-m", "outline: first", "--json"])?;
    assert_eq!(first.status.code(), Some(0));
    let value = stdout_json(&first)?;
    assert_eq!(value["data"]["path"], "scratch/notes.md");
    assert!(value["data"]["commit"].is_string());

    let again = sidesnap(dir, &["snap", "scratch/notes.md", "--json"])?;
    assert_eq!(again.status.code(), Some(10));
    assert_eq!(stdout_json(&again)?["code"], 10);

    let log = sidesnap(dir, &["log", "--json"])?;
    let entries = stdout_json(&log)?["data"]["entries"].clone();
    assert_eq!(entries.as_array().map(Vec::len), Some(1));
    assert_eq!(entries[0]["message"], "outline: first");
    Ok(())
}

#[test]
fn test_outside_path_is_invalid() -> Result<()> {
    if !git_available() {
        return Ok(());
    }
    let tmp = TempDir::new()?;
    let output = sidesnap(tmp.path(), &["snap", "../escape.md", "--json"])?;

    assert_eq!(output.status.code(), Some(14));
    let value = stdout_json(&output)?;
    assert_eq!(value["status"], "error");
    assert_eq!(value["code"], 14);
    Ok(())
}

#[test]
fn test_snap_without_target_is_invalid() -> Result<()> {
    let tmp = TempDir::new()?;
    let output = sidesnap(tmp.path(), &["snap"])?;

    assert_eq!(output.status.code(), Some(14));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("snap requires a target path"));
    assert!(output.stdout.is_empty());
    Ok(())
}

#[test]
fn test_scratch_override_from_environment() -> Result<()> {
    if !git_available() {
        return Ok(());
    }
    let tmp = TempDir::new()?;
    let output = Command::new(env!("CARGO_BIN_EXE_sidesnap"))
        .args(["ensure", "--json"])
        .current_dir(tmp.path())
        .env("HOME", tmp.path())
        .env("XDG_CONFIG_HOME", tmp.path().join(".config"))
        .env("SIDESNAP_SCRATCH", "drafts")
        .output()?;

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(stdout_json(&output)?["data"]["scratch_dir"], "drafts");
    assert!(tmp.path().join("drafts").is_dir());
    Ok(())
}

#[test]
fn test_relative_work_tree_resolves_against_cwd() -> Result<()> {
    if !git_available() {
        return Ok(());
    }
    let tmp = TempDir::new()?;
    fs::create_dir_all(tmp.path().join("proj"))?;
    let output = sidesnap(tmp.path(), &["--work-tree", "proj", "ensure", "--json"])?;

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(stdout_json(&output)?["status"], "ok");
    assert!(tmp.path().join("proj/.git-scratch/HEAD").is_file());
    assert!(tmp.path().join("proj/scratch").is_dir());
    assert!(!tmp.path().join(".git-scratch").exists());
    Ok(())
}

#[test]
fn test_bad_keep_values_are_invalid_args() -> Result<()> {
    let tmp = TempDir::new()?;
    for keep in ["-1", "0", "abc"] {
        let output = sidesnap(tmp.path(), &["prune", "--keep", keep, "--json"])?;

        assert_eq!(output.status.code(), Some(14), "--keep {}", keep);
        let value = stdout_json(&output)?;
        assert_eq!(value["status"], "error");
        assert_eq!(value["code"], 14);
        assert!(value["message"].as_str().unwrap().contains("keep"));
    }
    Ok(())
}

#[test]
fn test_unknown_flag_without_json_is_invalid_args() -> Result<()> {
    let tmp = TempDir::new()?;
    let output = sidesnap(tmp.path(), &["status", "--bogus"])?;

    assert_eq!(output.status.code(), Some(14));
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("--bogus"));
    Ok(())
}

#[test]
fn test_no_subcommand_prints_hint() -> Result<()> {
    let tmp = TempDir::new()?;
    let output = sidesnap(tmp.path(), &[])?;

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("sidesnap --help"));
    assert!(stdout.contains("sidesnap prompt"));

    let output = sidesnap(tmp.path(), &["--json"])?;
    assert_eq!(output.status.code(), Some(0));
    let value = stdout_json(&output)?;
    assert_eq!(value["status"], "ok");
    assert!(value["data"]["message"].as_str().unwrap().contains("sidesnap --help"));
    Ok(())
}
