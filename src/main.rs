use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use quern::api::{self, AppState};
use quern::config;
use quern::dispatcher::BookDispatcher;
use quern::instrument::InstrumentRegistry;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "quern", about = "Quern matching engine")]
struct Cli {
    /// TCP port to listen on.
    port: u16,

    /// Path to the JSON instrument file.
    instruments_path: PathBuf,

    /// Path to the optional service config file.
    #[arg(short, long, default_value = "config.toml")]
    config_path: PathBuf,
}

fn init_logging(cfg: &config::AppConfig) {
    match cfg.logger.format {
        config::LogFormat::Json => {
            tracing_subscriber::fmt()
                .json()
                .with_max_level(cfg.logger.level)
                .with_current_span(true)
                .init();
        }
        config::LogFormat::Compact => {
            tracing_subscriber::fmt()
                .compact()
                .with_max_level(cfg.logger.level)
                .init();
        }
    }
}

/// Resolve on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("could not install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("could not install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut cfg = match config::AppConfig::load(&cli.config_path) {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("could not load config: {err}");
            return ExitCode::FAILURE;
        }
    };
    cfg.api.port = cli.port;

    init_logging(&cfg);

    let registry = match InstrumentRegistry::load_from_file(&cli.instruments_path) {
        Ok(registry) => registry,
        Err(err) => {
            error!("could not load instruments: {err}");
            return ExitCode::FAILURE;
        }
    };
    info!(count = registry.count(), "loaded instruments");
    for symbol in registry.all_symbols() {
        info!(symbol, "instrument registered");
    }

    let dispatcher = Arc::new(BookDispatcher::new(&registry));
    let state = AppState {
        registry: Arc::new(registry),
        dispatcher,
    };

    let cancellation_token = CancellationToken::new();
    let signal_token = cancellation_token.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("shutdown signal received, stopping server");
        signal_token.cancel();
    });

    if let Err(err) = api::start(&cfg.api, state, cancellation_token).await {
        error!("server error: {err}");
        return ExitCode::FAILURE;
    }

    info!("server stopped");
    ExitCode::SUCCESS
}
