use crate::{AppState, types::HealthResponse};
use axum::{Json, extract::State};

/// Service health
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse)),
    tag = "health"
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        agents: state.registry.snapshot().len(),
        model: state.orchestrator.matcher().model_name().to_string(),
    })
}
