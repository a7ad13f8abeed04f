//! batchd - batch ingestion daemon
//!
//! CLI entry point: runs the HTTP API alongside the batch processor.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use eyre::{Context, Result};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use batchd::cli::{Cli, Command};
use batchd::config::Config;
use batchd::{AppState, Processor, Store, router};

fn setup_logging(level_str: &str, log_dir: Option<&Path>) -> Result<()> {
    // Note: Can't log here until the subscriber is installed
    let level = match level_str.to_uppercase().as_str() {
        "TRACE" => tracing::Level::TRACE,
        "DEBUG" => tracing::Level::DEBUG,
        "INFO" => tracing::Level::INFO,
        "WARN" | "WARNING" => tracing::Level::WARN,
        "ERROR" => tracing::Level::ERROR,
        _ => {
            eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", level_str);
            tracing::Level::INFO
        }
    };

    let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

    match log_dir {
        Some(dir) => {
            fs::create_dir_all(dir).context("Failed to create log directory")?;
            let log_file = fs::File::create(dir.join("batchd.log")).context("Failed to create log file")?;

            tracing_subscriber::fmt()
                .with_writer(log_file)
                .with_ansi(false)
                .with_env_filter(filter)
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_writer(std::io::stderr)
                .with_env_filter(filter)
                .init();
        }
    }

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    match cli.command {
        Command::Config => {
            print!("{}", config.to_yaml()?);
            Ok(())
        }
        Command::Serve {
            host,
            port,
            no_autostart,
            quiet,
        } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            if no_autostart {
                config.processor.autostart = false;
            }
            if quiet {
                config.processor.quiet_mode = true;
            }

            // CLI --log-level > config file > default (info)
            let level = cli.log_level.as_deref().unwrap_or(&config.log_level);
            setup_logging(level, config.log_dir.as_deref()).context("Failed to setup logging")?;

            cmd_serve(config).await
        }
    }
}

async fn cmd_serve(config: Config) -> Result<()> {
    debug!(?config, "cmd_serve: called");

    let store = Arc::new(Store::new(config.ingest.batch_size));
    let processor = Arc::new(Processor::new(config.processor.clone(), store.clone()));

    if config.processor.autostart {
        processor.start();
    } else {
        info!("Autostart disabled; processor idle");
    }

    let state = AppState::new(store, processor.clone(), config.ingest.clone());
    let app = router(state).layer(TraceLayer::new_for_http()).layer(
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    );

    let addr = config.server.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .context(format!("Failed to bind {}", addr))?;
    info!("batchd listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Daemon shutting down...");
    processor.stop().await;

    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let (Ok(mut sigint), Ok(mut sigterm)) = (signal(SignalKind::interrupt()), signal(SignalKind::terminate()))
        else {
            warn!("Failed to install signal handlers, falling back to ctrl-c");
            let _ = tokio::signal::ctrl_c().await;
            return;
        };

        tokio::select! {
            _ = sigint.recv() => warn!("SIGINT received"),
            _ = sigterm.recv() => warn!("SIGTERM received"),
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
