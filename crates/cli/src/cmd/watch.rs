use crate::app::App;
use crate::watch::{run_watch, SnapRunner, WatchOptions};
use anyhow::Result;
use sidesnap_core::ExitCode;
use sidesnap_watcher::NotifyObserver;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub struct WatchArgs {
    pub pattern: Option<String>,
    pub debounce: Option<i64>,
    pub include_delete: bool,
    pub no_initial: bool,
}

pub async fn run(app: &App, args: WatchArgs) -> Result<ExitCode> {
    let config = &app.config.watch;
    let opts = WatchOptions {
        pattern: args.pattern.or_else(|| config.pattern.clone()),
        debounce_ms: args.debounce.unwrap_or(config.debounce_ms as i64),
        include_delete: args.include_delete || config.include_delete,
        initial_snap: config.initial_snap && !args.no_initial,
        handle_signals: true,
    };

    let runner = Arc::new(SnapRunner::new(app.ws.clone(), app.lock_options()));
    let mut observer = NotifyObserver::new();
    let report = run_watch(
        &app.ws,
        &opts,
        &mut observer,
        runner,
        &app.out,
        CancellationToken::new(),
    )
    .await?;

    tracing::debug!(snaps = report.snaps_count, "watch finished");
    Ok(ExitCode::Ok)
}
