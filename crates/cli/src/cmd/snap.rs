//! Snapshot one path or the whole scratch directory

use crate::app::App;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use sidesnap_core::{Error, ExitCode};
use sidesnap_history::{snap, SnapRequest};
use tokio::io::AsyncReadExt;

pub struct SnapArgs {
    pub path: Option<String>,
    pub message: Option<String>,
    pub all: bool,
    pub stdin: bool,
    pub space: Option<String>,
}

pub async fn run(app: &App, args: SnapArgs) -> Result<ExitCode> {
    let mut req = match (args.all, args.path) {
        (true, Some(_)) => {
            return Err(Error::invalid_args("--all cannot be combined with a path").into())
        }
        (true, None) => SnapRequest::all(),
        (false, Some(path)) => SnapRequest::path(path),
        (false, None) => return Err(Error::invalid_args("snap requires a target path").into()),
    };

    if args.stdin {
        if args.all {
            return Err(Error::invalid_args("--stdin requires a single path").into());
        }
        let mut content = Vec::new();
        tokio::io::stdin()
            .read_to_end(&mut content)
            .await
            .context("Failed to read stdin")?;
        req.stdin_content = Some(content);
    }
    req.message = args.message;
    req.space = args.space;
    req.lock = app.lock_options();

    let all = req.target == sidesnap_history::SnapTarget::All;
    let report = snap(&app.ws, req).await?;

    match &report.commit {
        Some(commit) if all => app.out.success_line(format!(
            "snap stored {} files at {}",
            report.files_count,
            commit.yellow()
        )),
        Some(commit) => app.out.success_line(format!(
            "snap stored {} at {}",
            report.path.as_deref().unwrap_or_default(),
            commit.yellow()
        )),
        None if all => app
            .out
            .info(format!("no pending changes under {}", app.ws.scratch_dir())),
        None => app.out.info(format!(
            "no changes for {}",
            report.path.as_deref().unwrap_or_default()
        )),
    }

    let code = report.exit_code();
    app.out.finish(code, &report);
    Ok(code)
}
