//! qexec server binary.
//!
//! Serves the execution API over HTTP and runs jobs on a worker pool.
//!
//! # Usage
//!
//! ```bash
//! qexec-server --config qexec.yaml
//! QEXEC_ADDRESS=127.0.0.1:8080 QEXEC_LOG_FORMAT=json qexec-server
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use qexec_service::{Config, ServiceContext, TracingConfig, init_tracing, rest};
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(name = "qexec-server", version, about = "Braket circuit execution service")]
struct Args {
    /// YAML configuration file
    #[arg(short, long, env = "QEXEC_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address, overriding the configuration
    #[arg(short, long)]
    address: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref()).context("loading configuration")?;
    if let Some(address) = args.address {
        config.server.address = address;
    }
    let addr = config.socket_address()?;

    init_tracing(&TracingConfig::from(&config.logging))
        .context("initialising tracing")?;
    info!(version = env!("CARGO_PKG_VERSION"), "Starting qexec server");

    let ctx = Arc::new(
        ServiceContext::build(config)
            .await
            .context("building service context")?,
    );
    let app = rest::router(ctx.clone());

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!("Listening on {addr}");
    info!("CORS origins: {}", ctx.config.server.cors_origins);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP server stopped, draining job queue");
    ctx.shutdown().await;
    info!("qexec server shut down");
    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received SIGINT"),
        () = terminate => info!("Received SIGTERM"),
    }
}
