use axum::{extract::State, Json};

use crate::models::health::HealthResponse;
use crate::AppState;

/// Handler for GET /api/health/
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    tracing::debug!("Running upstream health probes");
    Json(state.health.check_health().await)
}
