//! Alerts processor server
//!
//! Receives Alertmanager webhooks and runs each alert through the
//! sanitize -> validate -> enrich -> persist pipeline on a bounded worker pool.

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use alerts_processor::{
    server, AlertsService, ClusterBackend, ClusterClient, Config, InMemoryRepository,
    KubeClusterClient, LogFormat, StubClusterClient,
};

/// Alertmanager webhook receiver - sanitizes, validates, enriches and persists alerts
#[derive(Parser)]
#[command(name = "alerts-processor")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    config: Config,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.config.log_format, cli.verbose);

    let config = cli.config;
    config.validate().context("Invalid configuration")?;

    info!(
        "Starting alerts processor v{}",
        env!("CARGO_PKG_VERSION")
    );
    info!(
        addr = %config.addr,
        max_workers = config.max_workers,
        queue_capacity = config.queue_capacity,
        cluster_backend = ?config.cluster_backend,
        "Configuration loaded"
    );

    let cluster = build_cluster_client(&config).await?;
    let service = AlertsService::new(
        cluster,
        Arc::new(InMemoryRepository::new()),
        &config.receiver(),
    );

    server::run_server(service.clone(), &config.addr, shutdown_signal())
        .await
        .context("Webhook server failed")?;

    // Finish everything already accepted before exiting
    let stats = service.shutdown().await;
    info!(
        submitted = stats.submitted,
        processed = stats.processed,
        invalid = stats.invalid,
        failed = stats.failed,
        rejected = stats.rejected,
        "Alerts processor stopped"
    );

    Ok(())
}

fn init_tracing(format: LogFormat, verbose: bool) {
    let default_directives = if verbose {
        "alerts_processor=debug,tower_http=debug,info"
    } else {
        "alerts_processor=info,tower_http=info,warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives));

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
        LogFormat::Text => registry.with(fmt::layer()).init(),
    }
}

async fn build_cluster_client(config: &Config) -> Result<Arc<dyn ClusterClient>> {
    match config.cluster_backend {
        ClusterBackend::Stub => {
            info!("Using stub cluster client");
            Ok(Arc::new(StubClusterClient::new()))
        }
        ClusterBackend::Kube => {
            let client = KubeClusterClient::try_default(config.cluster_timeout())
                .await
                .context("Failed to connect to Kubernetes")?;
            info!(
                timeout_secs = config.cluster_timeout_secs,
                "Connected to Kubernetes cluster"
            );
            Ok(Arc::new(client))
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C, shutting down gracefully");
        },
        () = terminate => {
            info!("Received SIGTERM, shutting down gracefully");
        },
    }
}
