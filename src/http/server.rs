//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Compose the batch service stack from config
//! - Wire up middleware (tracing, body limit, request ID)
//! - Serve on a listener until shutdown, closing admission first

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::config::ServiceConfig;
use crate::fanout::{AdmissionController, DeadlinePropagator, FanOut};
use crate::http::{handlers, request};
use crate::service::{FanOutService, InstrumentingMiddleware, LoggingMiddleware, Pipeline};
use crate::upstream::{Fetcher, HttpFetcher};

pub const HANDLE_URLS_PATH: &str = "/api/v1/handle";
pub const STATUS_PATH: &str = "/status";

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to build upstream client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Pipeline,
    pub max_urls: usize,
}

/// HTTP server for the fan-out service.
pub struct HttpServer {
    router: Router,
    config: ServiceConfig,
    admission: Arc<AdmissionController>,
}

impl HttpServer {
    /// Create a server that fetches over HTTP.
    pub fn new(config: ServiceConfig) -> Result<Self, ServerError> {
        let fetcher = HttpFetcher::new(
            &config.upstream,
            config.timeouts.fetch(),
            config.timeouts.connect(),
        )?;
        Ok(Self::with_fetcher(config, Arc::new(fetcher)))
    }

    /// Create a server around any fetch capability.
    pub fn with_fetcher(config: ServiceConfig, fetcher: Arc<dyn Fetcher>) -> Self {
        let fan_out = FanOut::new(fetcher, config.timeouts.fetch());
        let service = InstrumentingMiddleware::new(LoggingMiddleware::new(FanOutService::new(
            fan_out,
            config.limits.max_urls,
        )));

        let admission = Arc::new(AdmissionController::new(config.limits.admission_capacity));
        let pipeline = Pipeline::new(
            admission.clone(),
            DeadlinePropagator::new(config.timeouts.request()),
            Arc::new(service),
        );

        let state = AppState {
            pipeline,
            max_urls: config.limits.max_urls,
        };

        let router = Self::build_router(&config, state);
        Self {
            router,
            config,
            admission,
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &ServiceConfig, state: AppState) -> Router {
        Router::new()
            .route(HANDLE_URLS_PATH, post(handlers::handle_urls))
            .route(STATUS_PATH, get(handlers::get_status))
            .with_state(state)
            .layer(DefaultBodyLimit::max(config.listener.max_body_size))
            .layer(
                ServiceBuilder::new()
                    .layer(request::set_request_id())
                    .layer(TraceLayer::new_for_http())
                    .layer(request::propagate_request_id()),
            )
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            max_urls = self.config.limits.max_urls,
            admission_capacity = self.config.limits.admission_capacity,
            "HTTP server starting"
        );

        let admission = self.admission.clone();
        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                admission.close();
                tracing::info!("Shutdown signal received, draining in-flight requests");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn admission(&self) -> &Arc<AdmissionController> {
        &self.admission
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }
}
