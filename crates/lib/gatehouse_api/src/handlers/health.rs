//! Liveness endpoint.

use axum::Json;
use axum::extract::State;

use crate::AppState;
use crate::models::HealthResponse;

/// `GET /api/health` — version and number of held sessions (including idle
/// ones not yet evicted).
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: gatehouse_core::version().into(),
        active_sessions: state.sessions.store().len(),
    })
}
