//! sidesnap CLI library - exports modules for testing

pub mod app;
pub mod args;
pub mod cmd;
pub mod output;
pub mod system_config;
pub mod watch;

use anyhow::Result;
use app::{App, Overrides};
use args::{Cli, Commands};
use sidesnap_core::ExitCode;

/// One-line description of an argument parsing error
pub fn parse_error_message(err: &clap::Error) -> String {
    let rendered = err.render().to_string();
    let first = rendered.lines().next().unwrap_or_default();
    first.strip_prefix("error: ").unwrap_or(first).trim().to_string()
}

/// Exit code for an error, taken from the first sidesnap error in its chain
pub fn exit_code_for(err: &anyhow::Error) -> ExitCode {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<sidesnap_core::Error>())
        .map(|e| e.code())
        .unwrap_or(ExitCode::Failure)
}

/// Printed when no subcommand is given
pub const DEFAULT_HINT: &str =
    "sidesnap: run `sidesnap --help` for commands or `sidesnap prompt` for agent guidance.";

/// Run one parsed invocation
pub async fn dispatch(cli: Cli, app: &App) -> Result<ExitCode> {
    let Some(command) = cli.command else {
        if app.out.is_json() {
            app.out.finish(ExitCode::Ok, &serde_json::json!({ "message": DEFAULT_HINT }));
        } else {
            println!("{}", DEFAULT_HINT);
        }
        return Ok(ExitCode::Ok);
    };

    match command {
        Commands::Ensure => cmd::ensure::run(app).await,
        Commands::Snap {
            path,
            message,
            all,
            stdin,
            space,
        } => {
            cmd::snap::run(
                app,
                cmd::snap::SnapArgs {
                    path,
                    message,
                    all,
                    stdin,
                    space,
                },
            )
            .await
        }
        Commands::Log { path, timeline, since } => cmd::log::run(app, path, since, timeline).await,
        Commands::Diff { path, current, since } => cmd::diff::run(app, path, current, since).await,
        Commands::Status => cmd::status::run(app).await,
        Commands::Restore { revision, path } => {
            cmd::restore::run(app, &revision, path.as_deref()).await
        }
        Commands::Prune { keep } => cmd::prune::run(app, keep).await,
        Commands::Watch {
            pattern,
            debounce,
            include_delete,
            no_initial,
        } => {
            cmd::watch::run(
                app,
                cmd::watch::WatchArgs {
                    pattern,
                    debounce,
                    include_delete,
                    no_initial,
                },
            )
            .await
        }
        Commands::Prompt => cmd::prompt::run(app),
    }
}

impl Cli {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            work_tree: self.work_tree.clone(),
            scratch_dir: self.scratch.clone(),
            git_dir: self.git_dir.clone(),
        }
    }
}
