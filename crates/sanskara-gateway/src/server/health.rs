//! `GET /health`.

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use super::AppState;

/// Liveness report.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub active_sessions: usize,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "sanskara-gateway",
        active_sessions: state.manager.active_sessions(),
    })
}
