//! Report store and scratch state

use crate::app::App;
use anyhow::Result;
use owo_colors::OwoColorize;
use sidesnap_core::ExitCode;
use sidesnap_history::status;

pub async fn run(app: &App) -> Result<ExitCode> {
    let report = status(&app.ws).await?;

    if !app.out.is_json() && !app.out.is_quiet() {
        let state = if report.initialized {
            "initialized".green().to_string()
        } else {
            "not initialized".yellow().to_string()
        };
        println!("store    {} ({})", report.git_dir.display(), state);
        println!("scratch  {}", report.scratch_dir);
        if report.locked {
            println!("lock     {}", "held".yellow());
        }
        let main = report.exclude.main;
        if !main.git_dir || !main.scratch_dir {
            println!("{}", "host exclude is missing sidesnap entries; run `sidesnap ensure`".yellow());
        }

        let changes = &report.changes;
        if changes.is_empty() {
            println!("no pending changes");
        }
        for path in &changes.added {
            println!("  {} {}", "added".green(), path);
        }
        for path in &changes.modified {
            println!("  {} {}", "modified".yellow(), path);
        }
        for path in &changes.deleted {
            println!("  {} {}", "deleted".red(), path);
        }
    }

    app.out.finish(ExitCode::Ok, &report);
    Ok(ExitCode::Ok)
}
