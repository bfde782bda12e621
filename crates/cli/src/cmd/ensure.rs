//! Prepare the sidecar store

use crate::app::App;
use anyhow::Result;
use owo_colors::OwoColorize;
use sidesnap_core::{ensure_sidecar, ExitCode};

pub async fn run(app: &App) -> Result<ExitCode> {
    let report = ensure_sidecar(&app.ws).await?;

    if report.initialized {
        app.out.success_line(format!("initialized {}", report.git_dir.display()));
    } else {
        app.out.info(format!("{} already initialized", report.git_dir.display()));
    }
    app.out.info(format!(
        "scratch dir {} ({} files)",
        report.scratch_dir.cyan(),
        report.files.len()
    ));

    app.out.finish(ExitCode::Ok, &report);
    Ok(ExitCode::Ok)
}
