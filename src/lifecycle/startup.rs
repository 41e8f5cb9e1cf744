//! Startup orchestration.
//!
//! # Responsibilities
//! - Start the metrics exporter when enabled
//! - Build the server and bind its listener
//! - Serve until a shutdown signal, then drain within a deadline
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listeners start last (traffic only when ready)

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::ServiceConfig;
use crate::http::{HttpServer, ServerError};
use crate::lifecycle::{signals, Shutdown};
use crate::observability::metrics;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid metrics address '{0}'")]
    MetricsAddress(String),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Server(#[from] ServerError),

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),

    #[error("server task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Run the service until SIGINT/SIGTERM.
pub async fn run(config: ServiceConfig) -> Result<(), StartupError> {
    if config.observability.metrics_enabled {
        let address = &config.observability.metrics_address;
        let addr: SocketAddr = address
            .parse()
            .map_err(|_| StartupError::MetricsAddress(address.clone()))?;
        metrics::init_metrics(addr);
    }

    let drain_timeout = config.timeouts.drain();
    let address = config.listener.bind_address.clone();
    let server = HttpServer::new(config)?;

    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| StartupError::Bind {
            address: address.clone(),
            source,
        })?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let signal = async {
        if let Err(e) = signals::wait_for_signal().await {
            tracing::error!(error = %e, "Failed to install signal handlers");
            std::future::pending::<()>().await;
        }
    };

    serve(server, listener, signal, drain_timeout).await
}

/// Serve until `signal` resolves, then drain for at most `drain_timeout`.
///
/// Returns early if the server stops by itself.
pub async fn serve<F>(
    server: HttpServer,
    listener: TcpListener,
    signal: F,
    drain_timeout: Duration,
) -> Result<(), StartupError>
where
    F: Future<Output = ()>,
{
    let shutdown = Shutdown::new();
    let mut handle = tokio::spawn(server.run(listener, shutdown.subscribe()));

    tokio::select! {
        result = &mut handle => return Ok(result??),
        _ = signal => {}
    }

    shutdown.trigger();

    match tokio::time::timeout(drain_timeout, &mut handle).await {
        Ok(result) => {
            result??;
            tracing::info!("Shutdown complete");
        }
        Err(_) => {
            tracing::warn!(
                drain_timeout_ms = drain_timeout.as_millis() as u64,
                "Drain deadline exceeded, aborting in-flight requests"
            );
            handle.abort();
        }
    }

    Ok(())
}
