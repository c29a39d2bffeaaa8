//! HTTP server implementation

use axum::{
    routing::{get, post},
    Router,
};
use std::future::Future;
use tower_http::cors::CorsLayer;
use tracing::info;

use super::handlers::{
    cluster_handler, execute_command, persistence_handler, replication_handler, stats_handler,
    AppState,
};
use crate::error::{Error, Result};

/// Build the application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/command", post(execute_command))
        .route("/stats", get(stats_handler))
        .route("/cluster", get(cluster_handler))
        .route("/replication", get(replication_handler))
        .route("/persistence", get(persistence_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve on an already bound listener until `shutdown` resolves
pub async fn serve<F>(listener: tokio::net::TcpListener, state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let local = listener
        .local_addr()
        .map_err(|e| Error::network("web listener", e))?;
    info!("Web interface available at http://{}", local);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| Error::network(local.to_string(), e))
}
