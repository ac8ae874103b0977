//! Axum HTTP surface for the query builder, report downloads and metadata.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::{DotacionError, Result};
use crate::runtime::QueryService;

mod errors;
mod handlers;

pub use errors::{ApiError, ErrorResponse};

/// Application state shared across handlers
pub struct AppState {
    pub service: QueryService,
    /// Expose database error detail in 5xx responses.
    pub verbose: bool,
}

impl AppState {
    pub fn new(service: QueryService, verbose: bool) -> Self {
        Self { service, verbose }
    }

    fn error(&self, error: DotacionError) -> ApiError {
        ApiError::new(error, self.verbose)
    }
}

/// Build the axum router with all routes
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/query/execute", post(handlers::execute_query))
        .route("/api/query/export", post(handlers::export_query))
        .route("/api/descargas", get(handlers::list_reports))
        .route("/api/descargas/{slug}", get(handlers::run_report))
        .route("/api/meta/tablas", get(handlers::tables))
        .route("/api/meta/columnas", get(handlers::columns))
        .route("/api/meta/ministerios", get(handlers::ministries))
        .route("/api/meta/tablas-disponibles", get(handlers::available_tables))
        .route("/api/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Serve the API until Ctrl+C.
pub async fn serve(state: Arc<AppState>, bind: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!(addr = %listener.local_addr()?, "dotacion API listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
    }
}
