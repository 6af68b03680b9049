use crate::{
    AppState,
    agents::AgentDescriptor,
    types::{AgentInfo, AppError, ErrorResponse, Result},
};
use axum::{
    Json,
    extract::{Path, State},
};

impl From<&AgentDescriptor> for AgentInfo {
    fn from(agent: &AgentDescriptor) -> Self {
        Self {
            id: agent.id.clone(),
            name: agent.name.clone(),
            description: agent.description.clone(),
            endpoint: agent.endpoint.to_string(),
            capabilities: agent.capabilities.clone(),
        }
    }
}

/// List the agents in the current registry snapshot
#[utoipa::path(
    get,
    path = "/agents",
    responses((status = 200, description = "Registered agents", body = [AgentInfo])),
    tag = "agents"
)]
pub async fn list_agents(State(state): State<AppState>) -> Json<Vec<AgentInfo>> {
    let registry = state.registry.snapshot();
    Json(registry.iter().map(AgentInfo::from).collect())
}

/// Show one registered agent
#[utoipa::path(
    get,
    path = "/agents/{id}",
    params(("id" = String, Path, description = "Agent identifier")),
    responses(
        (status = 200, description = "Agent details", body = AgentInfo),
        (status = 404, description = "Unknown agent", body = ErrorResponse)
    ),
    tag = "agents"
)]
pub async fn get_agent(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AgentInfo>> {
    let registry = state.registry.snapshot();
    registry
        .resolve(&id)
        .map(|agent| Json(AgentInfo::from(agent)))
        .ok_or_else(|| AppError::NotFound(format!("agent '{}' is not registered", id)))
}
