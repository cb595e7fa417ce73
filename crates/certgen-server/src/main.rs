//! certgen server entry point.

use std::process::ExitCode;

use clap::Parser;
use tracing::{debug, info, warn};

use certgen_core::{TracingConfig, init_tracing};
use certgen_server::{AppState, Cli, ServerConfig, ServerResult, router, shutdown_signal};

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env before parsing so its values feed the `env` arguments.
    let dotenv = dotenvy::dotenv();
    let cli = Cli::parse();

    if let Err(e) = init_tracing(TracingConfig::from_flags(cli.debug, cli.json_logs)) {
        eprintln!("error: {}", e);
        return ExitCode::FAILURE;
    }
    if let Ok(path) = dotenv {
        debug!(path = %path.display(), "loaded environment file");
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ServerResult<()> {
    let config = ServerConfig::load(cli.config.as_deref())?.with_overrides(cli.overrides());

    for name in config.insecure_defaults() {
        warn!("{} is not configured, using an insecure default", name);
    }
    info!(client_id = %config.canva.client_id, "using Canva client");

    config.ensure_dirs()?;
    let bind = config.bind;
    let state = AppState::new(config)?;

    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(addr = %bind, "listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}
