use crate::app::App;
use anyhow::Result;
use owo_colors::OwoColorize;
use sidesnap_core::ExitCode;
use sidesnap_history::{diff, DiffRequest};

pub async fn run(app: &App, path: Option<String>, current: bool, since: Option<usize>) -> Result<ExitCode> {
    let report = diff(&app.ws, DiffRequest { path, current, since }).await?;

    if !app.out.is_json() {
        if report.patch.is_empty() {
            app.out.info("no differences");
        } else {
            for line in report.patch.lines() {
                if line.starts_with("+++") || line.starts_with("---") {
                    println!("{}", line.bold());
                } else if line.starts_with('+') {
                    println!("{}", line.green());
                } else if line.starts_with('-') {
                    println!("{}", line.red());
                } else if line.starts_with("@@") {
                    println!("{}", line.cyan());
                } else {
                    println!("{}", line);
                }
            }
        }
    }

    app.out.finish(ExitCode::Ok, &report);
    Ok(ExitCode::Ok)
}
