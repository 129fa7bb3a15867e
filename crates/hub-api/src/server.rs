//! HTTP server implementation using Axum.

use crate::handlers::{self, handle_health};
use axum::{routing::get, Router};
use hub_core::Hub;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Application state shared across handlers.
pub struct AppState {
    /// Opened and seeded hub
    pub hub: Hub,
}

/// The full router over `hub`.
pub fn router(hub: Hub) -> Router {
    let state = Arc::new(AppState { hub });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .merge(handlers::routes())
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(cors))
        .with_state(state)
}

/// Start the REST server.
///
/// Returns the actual address the server is bound to (useful when port=0).
pub async fn start_server(hub: Hub, host: &str, port: u16) -> anyhow::Result<SocketAddr> {
    let app = router(hub);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    info!("Server listening on {}", actual_addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Server error: {}", e);
        }
    });

    Ok(actual_addr)
}
