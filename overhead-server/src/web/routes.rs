//! REST API route handlers.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::web::AppState;

#[derive(Deserialize)]
pub struct AircraftParams {
    limit: Option<usize>,
    /// Only aircraft within this many km of the reference.
    max_km: Option<f64>,
}

/// GET /api/alert: the record most recently published.
pub async fn api_alert(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let view = state.view.borrow();
    match &view.alert {
        Some(alert) => (StatusCode::OK, Json(json!(alert))),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"error": "no alert published yet"})),
        ),
    }
}

/// GET /api/aircraft: tracked aircraft, nearest first.
pub async fn api_aircraft(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AircraftParams>,
) -> impl IntoResponse {
    let view = state.view.borrow();
    let limit = params.limit.unwrap_or(usize::MAX);
    let aircraft: Vec<_> = view
        .aircraft
        .iter()
        .filter(|ac| params.max_km.map_or(true, |max| ac.distance_km <= max))
        .take(limit)
        .collect();
    Json(json!({
        "count": aircraft.len(),
        "aircraft": aircraft,
    }))
}

/// GET /api/status: tick counters and cycle phase.
pub async fn api_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let view = state.view.borrow();
    Json(json!(view.status))
}
