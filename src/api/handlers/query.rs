use crate::{
    AppState,
    api::routes::MAX_BODY_BYTES,
    agents::FinalResponse,
    types::{AppError, ErrorResponse, QueryRequest, QueryResponse, Result},
};
use axum::{
    Json,
    http::StatusCode,
    extract::{State, rejection::JsonRejection},
};

/// Route a query to the best-suited agent
#[utoipa::path(
    post,
    path = "/query",
    request_body = QueryRequest,
    responses(
        (status = 200, description = "Agent answer", body = QueryResponse),
        (status = 400, description = "Empty or malformed query", body = ErrorResponse),
        (status = 413, description = "Request body too large", body = ErrorResponse),
        (status = 422, description = "No agent matches the query", body = ErrorResponse),
        (status = 502, description = "Agent unreachable or returned an invalid reply", body = ErrorResponse),
        (status = 503, description = "Routing oracle unavailable", body = ErrorResponse),
        (status = 504, description = "Agent timed out", body = ErrorResponse)
    ),
    tag = "query"
)]
pub async fn submit_query(
    State(state): State<AppState>,
    payload: std::result::Result<Json<QueryRequest>, JsonRejection>,
) -> Result<FinalResponse> {
    let Json(payload) = payload.map_err(|rejection| {
        tracing::debug!(status = %rejection.status(), "Rejected request body: {}", rejection.body_text());
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge(format!("Request body exceeds {} bytes.", MAX_BODY_BYTES))
        } else {
            AppError::InvalidInput(
                "Request body must be a JSON object with a string \"query\" field.".to_string(),
            )
        }
    })?;

    state.orchestrator.submit_query(&payload.query).await
}
