use crate::app::App;
use anyhow::Result;
use owo_colors::OwoColorize;
use sidesnap_core::ExitCode;
use sidesnap_history::{log, LogReport, LogRequest, Timeline};

pub async fn run(app: &App, path: Option<String>, since: Option<usize>, timeline: bool) -> Result<ExitCode> {
    let report = log(&app.ws, LogRequest { path, since, timeline }).await?;

    if !app.out.is_json() {
        print_report(&report);
    }

    app.out.finish(ExitCode::Ok, &report);
    Ok(ExitCode::Ok)
}

fn print_report(report: &LogReport) {
    if let Some(timeline) = &report.timeline {
        print_timeline(timeline);
        return;
    }
    for entry in &report.entries {
        let short = entry.commit.get(..8).unwrap_or(&entry.commit);
        match &entry.path {
            Some(path) => println!(
                "{} {} {} {}",
                short.yellow(),
                entry.timestamp.dimmed(),
                entry.message,
                path.cyan()
            ),
            None => println!("{} {} {}", short.yellow(), entry.timestamp.dimmed(), entry.message),
        }
    }
}

fn print_timeline(timeline: &Timeline) {
    let summary = &timeline.summary;
    println!(
        "{} {} {} commits, +{} -{} (net {})",
        timeline.path.cyan(),
        timeline.bars.render(),
        summary.commits,
        summary.total_additions,
        summary.total_deletions,
        summary.net
    );
    for entry in &timeline.entries {
        let short = entry.commit.get(..8).unwrap_or(&entry.commit);
        let highlights = entry
            .highlights
            .iter()
            .map(|h| h.text.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        println!(
            "  {} {} {} {}",
            short.yellow(),
            entry.timestamp.dimmed(),
            entry.message,
            highlights.green()
        );
    }
}
