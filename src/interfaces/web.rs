use anyhow::{Context, Result};
use axum::{
    Router,
    body::Bytes,
    extract::{DefaultBodyLimit, State, rejection::BytesRejection},
    http::StatusCode,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

use crate::core::dispatch::{Dispatcher, Outcome};

/// Liveness probe only. Served in stream mode.
pub fn health_router() -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
}

/// Receives events Marathon POSTs to an `eventSubscription` callback.
///
/// Bodies are not size capped: a `deployment_info` carries every target app
/// definition and grows with the cluster.
pub fn webhook_router(dispatcher: Dispatcher) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/events", post(events_handler))
        .layer(DefaultBodyLimit::disable())
        .layer(TraceLayer::new_for_http())
        .with_state(dispatcher)
}

pub async fn bind(listen: &str) -> Result<TcpListener> {
    let listener = TcpListener::bind(listen)
        .await
        .with_context(|| format!("failed to bind {}", listen))?;
    info!(listen = %listen, "listening");
    Ok(listener)
}

pub async fn serve(listener: TcpListener, app: Router) -> Result<()> {
    axum::serve(listener, app)
        .await
        .context("HTTP server crashed")
}

async fn health_handler() -> &'static str {
    "OK\n"
}

// Marathon retries on non-2xx, so kinds we choose not to mirror still get a 200;
// only the body says whether anything happened.
async fn events_handler(
    State(dispatcher): State<Dispatcher>,
    body: Result<Bytes, BytesRejection>,
) -> (StatusCode, String) {
    let body = match body {
        Ok(body) if !body.is_empty() => body,
        _ => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "could not read request body\n".to_string(),
            );
        }
    };

    match dispatcher.dispatch(&body).await {
        Ok(Outcome::Handled(kind)) => {
            debug!(event_kind = %kind, "event applied");
            (StatusCode::OK, "OK\n".to_string())
        }
        Ok(Outcome::Ignored(kind)) => (StatusCode::OK, format!("cannot handle {}\n", kind)),
        Err(e) => {
            error!(error = %e, "body generated error");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("{}\n", e))
        }
    }
}
