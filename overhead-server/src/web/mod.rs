//! Web server: read-only axum API over the alert loop's latest state.
//!
//! Handlers never touch the loop; they read the most recent `LiveView`
//! from a watch channel the engine updates once per tick.

use std::sync::Arc;

use axum::Router;
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::engine::LiveView;

pub mod routes;

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

pub struct AppState {
    pub view: watch::Receiver<LiveView>,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/alert", axum::routing::get(routes::api_alert))
        .route("/api/aircraft", axum::routing::get(routes::api_aircraft))
        .route("/api/status", axum::routing::get(routes::api_status))
        .with_state(state)
        .layer(cors)
}

/// Start the web server. Runs until the listener fails.
pub async fn serve(addr: String, view: watch::Receiver<LiveView>) -> std::io::Result<()> {
    let app = build_router(Arc::new(AppState { view }));
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(%addr, "API listening");
    axum::serve(listener, app).await
}
