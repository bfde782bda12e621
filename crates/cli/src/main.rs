//! sidesnap - sidecar snapshots for scratch drafts

use clap::error::ErrorKind;
use clap::Parser;
use sidesnap_cli::app::App;
use sidesnap_cli::args::Cli;
use sidesnap_cli::output::Output;
use sidesnap_cli::{dispatch, exit_code_for, parse_error_message, system_config};
use sidesnap_core::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => exit_on_parse_error(err),
    };
    init_tracing(cli.debug);

    let out = Output::new(cli.json, cli.quiet);
    let result = async {
        let config = system_config::load()?;
        let app = App::new(config, cli.overrides(), out)?;
        dispatch(cli, &app).await
    }
    .await;

    let code = match result {
        Ok(code) => code,
        Err(err) => {
            let code = exit_code_for(&err);
            tracing::debug!(error = ?err, "command failed");
            out.fail(code, &format!("{:#}", err));
            code
        }
    };
    std::process::exit(code.as_i32());
}

/// Help and version exit 0; every other parse error is invalid arguments
fn exit_on_parse_error(err: clap::Error) -> ! {
    if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) {
        let _ = err.print();
        std::process::exit(0);
    }

    let json = std::env::args().any(|arg| arg == "--json");
    if json {
        Output::new(true, false).fail(ExitCode::InvalidArgs, &parse_error_message(&err));
    } else {
        let _ = err.print();
    }
    std::process::exit(ExitCode::InvalidArgs.as_i32());
}

fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
