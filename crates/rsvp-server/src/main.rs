mod error;
mod logging;
mod repository;
mod routes;
mod state;
mod validation;

use anyhow::{Context as _, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{debug, info};

use crate::error::{exit_code_for, report_error};
use crate::state::AppState;
use rsvp_config as config;
use rsvp_store::{paths, Store, StoreOptions};

#[derive(Debug, Parser)]
#[command(name = "rsvp-server", version, about = "RSVP collection API")]
struct Cli {
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    db_path: Option<PathBuf>,
    /// Socket address to listen on, e.g. 127.0.0.1:8001
    #[arg(long)]
    bind: Option<String>,
    #[arg(long, short)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let verbose = cli.verbose;
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report_error(&err, verbose);
            exit_code_for(&err)
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let Cli {
        config: config_path,
        db_path,
        bind,
        verbose,
    } = cli;

    dotenvy::dotenv().ok();
    let mut app_config = config::load(config_path.clone()).with_context(|| "load config")?;
    if let Some(bind) = bind.as_deref() {
        app_config.bind = config::parse_bind(bind).with_context(|| "parse --bind")?;
    }
    if let Some(path) = db_path {
        app_config.db_path = Some(path);
    }

    logging::init_logging(&app_config.logging, verbose);
    match config::resolve_config_path(config_path) {
        Ok(path) if path.exists() => debug!(path = %path.display(), "config resolved"),
        Ok(path) => debug!(path = %path.display(), "config missing, using defaults"),
        Err(err) => debug!(error = %err, "config unavailable"),
    }

    let db_path = paths::resolve_db_path(app_config.db_path.clone())
        .with_context(|| "resolve database path")?;
    debug!(path = %db_path.display(), "database path resolved");

    let store = Store::open_with(
        &db_path,
        StoreOptions {
            busy_timeout: Duration::from_millis(app_config.storage_timeout_ms),
        },
    )
    .with_context(|| format!("open database {}", db_path.display()))?;
    store.migrate().with_context(|| "run migrations")?;
    drop(store);

    let addr = app_config.bind;
    let state = AppState::new(app_config, db_path);
    info!(
        %addr,
        prefix = %state.config.api_prefix,
        audience_baseline = state.config.audience_baseline,
        "starting rsvp api"
    );
    let app = routes::router(state);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .with_context(|| "serve http")?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
