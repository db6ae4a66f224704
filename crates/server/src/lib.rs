//! HTTP boundary of the restaurant recommendation agent.
//!
//! | Method | Path | Purpose |
//! |--------|------|---------|
//! | `POST` | `/api/recommend` | Run one orchestration for `{query}` |
//! | `GET` | `/health` | Liveness |
//! | `GET` | `/api/info` | Service description |
//!
//! Every request builds its own orchestration state; handlers share only the
//! stateless [`nodes::Orchestrator`].
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Translates HTTP into orchestrator calls and run
//! outcomes back into the `{success, message, data}` envelope.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use nodes::Orchestrator;
use tower_http::cors::CorsLayer;
use tracing::info;

mod handlers;

pub use handlers::{InfoResponse, RecommendRequest, RecommendResponse};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
        }
    }
}

/// Builds the application router with permissive CORS.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/info", get(handlers::info))
        .route("/api/recommend", post(handlers::recommend))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serves the router on `addr` until Ctrl-C.
pub async fn serve(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "restaurant agent listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // No signal handler available; run until the process is killed.
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
