//! HTTP API Handlers and Routes
//!
//! This module exposes the relay over HTTP, built on the Axum web framework.
//!
//! # Module Structure
//!
//! - [`api::handlers`](crate::api::handlers) - Request handlers for each endpoint
//! - [`api::routes`](crate::api::routes) - Route definitions and router configuration
//!
//! # API Endpoints
//!
//! - `POST /query` - Route a query to one agent and return its answer
//! - `GET /agents` - List the agents in the current registry snapshot
//! - `GET /agents/{id}` - Show one agent
//! - `GET /health` - Liveness, agent count and oracle model
//! - `GET /api-docs/openapi.json` - OpenAPI document for the above
//!
//! # Error bodies
//!
//! Every non-2xx answer carries the same envelope:
//! ```text
//! { "error": { "kind": "DispatchFailed", "reason": "Timeout", "agent": "research_agent", "message": "..." } }
//! ```

/// Request and response handlers for all API endpoints.
pub mod handlers;
/// Router configuration and route definitions.
pub mod routes;

use crate::types::{
    AgentInfo, ErrorBody, ErrorKind, ErrorResponse, HealthResponse, QueryRequest, QueryResponse,
};
use utoipa::OpenApi;

/// OpenAPI description of the relay
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::query::submit_query,
        handlers::agents::list_agents,
        handlers::agents::get_agent,
        handlers::health::health,
    ),
    components(schemas(
        QueryRequest,
        QueryResponse,
        ErrorResponse,
        ErrorBody,
        ErrorKind,
        AgentInfo,
        HealthResponse
    )),
    tags(
        (name = "query", description = "Query routing"),
        (name = "agents", description = "Agent registry"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;
