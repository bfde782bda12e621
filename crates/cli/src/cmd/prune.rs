//! Keep only the newest snapshots

use crate::app::App;
use anyhow::Result;
use sidesnap_core::{Error, ExitCode};
use sidesnap_history::prune;

pub async fn run(app: &App, keep: Option<i64>) -> Result<ExitCode> {
    let keep = match keep {
        Some(n) => usize::try_from(n)
            .ok()
            .filter(|n| *n >= 1)
            .ok_or_else(|| Error::invalid_args("--keep must be >= 1"))?,
        None => app.config.prune.keep,
    };
    let report = prune(&app.ws, keep, app.lock_options()).await?;

    if report.removed == 0 {
        app.out.info(format!("nothing to prune ({} snapshots kept)", report.kept));
    } else {
        app.out.success_line(format!(
            "pruned {} snapshots, kept {}",
            report.removed, report.kept
        ));
    }

    let code = report.exit_code();
    app.out.finish(code, &report);
    Ok(code)
}
