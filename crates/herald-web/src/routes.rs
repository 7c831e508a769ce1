//! Health routes.

use axum::{Json, Router, response::IntoResponse, routing::get};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::info;

/// Errors from the health listener.
#[derive(Debug, Error)]
pub enum WebError {
    /// Could not bind the health port. Fatal at startup.
    #[error("failed to bind health endpoint: {0}")]
    Bind(std::io::Error),

    /// The server loop failed after startup.
    #[error("health server error: {0}")]
    Serve(std::io::Error),
}

/// Create the health router.
pub fn router() -> Router {
    Router::new().route("/health", get(health))
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "alive" }))
}

/// Bind the health listener. Called before task spawn so a bind failure
/// aborts startup instead of dying in a detached task.
pub async fn bind(port: u16) -> Result<TcpListener, WebError> {
    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .map_err(WebError::Bind)?;
    info!(port, "health endpoint listening");
    Ok(listener)
}

/// Serve the health endpoint until shutdown is signalled.
pub async fn serve(
    listener: TcpListener,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Result<(), WebError> {
    axum::serve(listener, router())
        .with_graceful_shutdown(async move {
            while shutdown_rx.changed().await.is_ok() {
                if *shutdown_rx.borrow() {
                    break;
                }
            }
        })
        .await
        .map_err(WebError::Serve)?;

    info!("health endpoint shut down");
    Ok(())
}
