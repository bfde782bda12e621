//! Resolved settings shared by every command

use crate::output::Output;
use crate::system_config::SystemConfig;
use anyhow::Context;
use sidesnap_core::path::normalize_lexically;
use sidesnap_core::{AcquireOptions, Workspace};
use std::path::PathBuf;

/// Command-line overrides applied on top of the system config
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub work_tree: Option<PathBuf>,
    pub scratch_dir: Option<String>,
    pub git_dir: Option<String>,
}

pub struct App {
    pub ws: Workspace,
    pub config: SystemConfig,
    pub out: Output,
}

impl App {
    pub fn new(config: SystemConfig, overrides: Overrides, out: Output) -> anyhow::Result<Self> {
        let cwd = std::env::current_dir().context("Failed to read current directory")?;
        let work_tree = match overrides.work_tree {
            Some(dir) => normalize_lexically(&cwd.join(dir)),
            None => cwd,
        };
        let scratch_dir = overrides.scratch_dir.unwrap_or_else(|| config.scratch_dir.clone());
        let git_dir = overrides.git_dir.unwrap_or_else(|| config.git_dir.clone());
        let ws = Workspace::new(work_tree, &git_dir, &scratch_dir);
        tracing::debug!(
            work_tree = %ws.work_tree().display(),
            git_dir = %ws.git_dir().display(),
            scratch_dir = ws.scratch_dir(),
            "resolved workspace"
        );
        Ok(Self { ws, config, out })
    }

    pub fn lock_options(&self) -> AcquireOptions {
        self.config.lock.acquire_options()
    }
}
