use crate::app::App;
use anyhow::Result;
use sidesnap_core::{Error, ExitCode};
use sidesnap_history::restore;

pub async fn run(app: &App, revision: &str, path: Option<&str>) -> Result<ExitCode> {
    let path = path.ok_or_else(|| Error::invalid_args("restore requires a path"))?;
    let report = restore(&app.ws, revision, path, app.lock_options()).await?;

    app.out.success_line(format!(
        "restored {} from {} ({} bytes)",
        report.path, report.revision, report.bytes
    ));
    if let Some(backup) = &report.backup {
        app.out.info(format!("previous content saved to {}", backup.display()));
    }

    app.out.finish(ExitCode::Ok, &report);
    Ok(ExitCode::Ok)
}
