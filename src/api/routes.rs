use crate::AppState;
use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;

/// Largest accepted request body.
///
/// Enforced by the body extractors, so an oversized query is rejected with
/// the same error envelope as any other invalid input.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

pub fn create_router() -> Router<AppState> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/query", post(crate::api::handlers::query::submit_query))
        .route("/agents", get(crate::api::handlers::agents::list_agents))
        .route("/agents/{id}", get(crate::api::handlers::agents::get_agent))
        .route("/health", get(crate::api::handlers::health::health))
        .route(
            "/api-docs/openapi.json",
            get(|| async { Json(crate::api::ApiDoc::openapi()) }),
        )
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
