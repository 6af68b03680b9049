use crate::{
    agents::{
        dispatch::{AgentReply, DispatchClient, DispatchResult, FailureReason},
        registry::{AgentDescriptor, Registry, RegistryManager},
        router::{CapabilityMatcher, MatchError, RoutingDecision},
        Query,
    },
    types::{ErrorBody, ErrorKind, ErrorResponse, QueryResponse, Result},
};
use axum::{http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;
use uuid::Uuid;

/// Phases of a single request.
///
/// `Received → Matching → Dispatching → Completed`, with `MatchFailed` and
/// `DispatchFailed` as the terminal error phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Received,
    Matching,
    Dispatching,
    Completed,
    MatchFailed,
    DispatchFailed,
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Phase::Completed | Phase::MatchFailed | Phase::DispatchFailed
        )
    }

    /// Whether `next` is a legal successor of this phase
    pub fn can_transition_to(&self, next: Phase) -> bool {
        matches!(
            (self, next),
            (Phase::Received, Phase::Matching)
                | (Phase::Matching, Phase::Dispatching)
                | (Phase::Matching, Phase::MatchFailed)
                | (Phase::Dispatching, Phase::Completed)
                | (Phase::Dispatching, Phase::DispatchFailed)
        )
    }
}

/// Answer for one query, either the agent's payload or a structured failure
#[derive(Debug, Clone, PartialEq)]
pub enum FinalResponse {
    Completed(QueryResponse),
    Failed { status: StatusCode, error: ErrorBody },
}

impl FinalResponse {
    pub fn status_code(&self) -> StatusCode {
        match self {
            FinalResponse::Completed(_) => StatusCode::OK,
            FinalResponse::Failed { status, .. } => *status,
        }
    }

    pub fn error(&self) -> Option<&ErrorBody> {
        match self {
            FinalResponse::Completed(_) => None,
            FinalResponse::Failed { error, .. } => Some(error),
        }
    }
}

impl IntoResponse for FinalResponse {
    fn into_response(self) -> axum::response::Response {
        match self {
            FinalResponse::Completed(body) => (StatusCode::OK, Json(body)).into_response(),
            FinalResponse::Failed { status, error } => {
                (status, Json(ErrorResponse { error })).into_response()
            }
        }
    }
}

/// Per-request record. Lives only as long as the request's execution.
#[derive(Debug)]
pub struct OrchestrationState {
    pub request_id: Uuid,
    phase: Phase,
    query: Query,
    routing_decision: Option<RoutingDecision>,
    dispatch_result: Option<DispatchResult>,
    final_response: Option<FinalResponse>,
}

impl OrchestrationState {
    pub fn new(query: Query) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            phase: Phase::Received,
            query,
            routing_decision: None,
            dispatch_result: None,
            final_response: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn routing_decision(&self) -> Option<&RoutingDecision> {
        self.routing_decision.as_ref()
    }

    pub fn dispatch_result(&self) -> Option<&DispatchResult> {
        self.dispatch_result.as_ref()
    }

    pub fn final_response(&self) -> Option<&FinalResponse> {
        self.final_response.as_ref()
    }

    /// Consume the state, yielding its final response
    pub fn into_final_response(self) -> FinalResponse {
        self.final_response.unwrap_or_else(|| FinalResponse::Failed {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: ErrorBody {
                kind: ErrorKind::Internal,
                reason: None,
                agent: None,
                message: "The request did not reach a final state.".to_string(),
            },
        })
    }

    fn enter(&mut self, next: Phase) {
        debug_assert!(
            self.phase.can_transition_to(next),
            "illegal transition {:?} -> {:?}",
            self.phase,
            next
        );
        tracing::debug!("{:?} -> {:?}", self.phase, next);
        self.phase = next;
    }
}

/// Single-hop orchestrator: match once, dispatch once, answer.
///
/// A failed dispatch is final. The query is never re-matched against the
/// remaining agents, so a request makes at most one oracle call and one
/// agent call.
pub struct Orchestrator {
    registry: Arc<RegistryManager>,
    matcher: CapabilityMatcher,
    dispatcher: DispatchClient,
    dispatch_timeout: Duration,
}

impl Orchestrator {
    pub fn new(
        registry: Arc<RegistryManager>,
        matcher: CapabilityMatcher,
        dispatcher: DispatchClient,
        dispatch_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            matcher,
            dispatcher,
            dispatch_timeout,
        }
    }

    pub fn registry(&self) -> &Arc<RegistryManager> {
        &self.registry
    }

    pub fn matcher(&self) -> &CapabilityMatcher {
        &self.matcher
    }

    /// Route `text` to one agent and return the assembled answer.
    ///
    /// Only blank input is an `Err`; every routing or dispatch failure is a
    /// [`FinalResponse::Failed`].
    pub async fn submit_query(&self, text: &str) -> Result<FinalResponse> {
        let query = Query::new(text)?;
        Ok(self.execute(query).await.into_final_response())
    }

    /// Run the state machine to a terminal phase
    pub async fn execute(&self, query: Query) -> OrchestrationState {
        let mut state = OrchestrationState::new(query);
        let span = tracing::info_span!("query", request_id = %state.request_id);

        async {
            // One snapshot for the whole request, even if the registry reloads meanwhile
            let registry = self.registry.snapshot();
            self.run(&mut state, &registry).await;

            match state.final_response.as_ref().and_then(FinalResponse::error) {
                Some(error) => tracing::warn!(
                    kind = ?error.kind,
                    reason = error.reason.as_deref().unwrap_or(""),
                    "Query failed: {}",
                    error.message
                ),
                None => tracing::info!(
                    agent = state
                        .routing_decision
                        .as_ref()
                        .map(|d| d.agent_id.as_str())
                        .unwrap_or(""),
                    "Query completed"
                ),
            }
        }
        .instrument(span)
        .await;

        state
    }

    async fn run(&self, state: &mut OrchestrationState, registry: &Registry) {
        state.enter(Phase::Matching);

        let decision = match self.matcher.select_agent(&state.query, registry).await {
            Ok(decision) => decision,
            Err(e) => {
                state.enter(Phase::MatchFailed);
                state.final_response = Some(match_failed(&e));
                return;
            }
        };

        let Some(agent) = registry.get(&decision.agent_id) else {
            state.enter(Phase::MatchFailed);
            state.final_response = Some(match_failed(&MatchError::NoMatch {
                reply: decision.agent_id.clone(),
            }));
            return;
        };

        let rationale = decision.rationale.clone();
        state.routing_decision = Some(decision);

        state.enter(Phase::Dispatching);
        let result = self
            .dispatcher
            .dispatch(&agent.endpoint, &state.query, self.dispatch_timeout)
            .await;

        let response = match &result {
            DispatchResult::Success(reply) => {
                state.enter(Phase::Completed);
                FinalResponse::Completed(QueryResponse {
                    response: format_reply(agent, reply),
                    agent: agent.id.clone(),
                    rationale,
                })
            }
            DispatchResult::Failure(failure) => {
                state.enter(Phase::DispatchFailed);
                tracing::warn!(agent = %agent.id, "Dispatch failed: {}", failure);
                dispatch_failed(agent, failure.reason, self.dispatch_timeout)
            }
        };

        state.dispatch_result = Some(result);
        state.final_response = Some(response);
    }
}

/// Format an agent reply for the caller
pub fn format_reply(agent: &AgentDescriptor, reply: &AgentReply) -> String {
    let mut formatted = format!("Response from {}:\n\n{}", agent.name, reply.result);

    if let Some(confidence) = reply.confidence {
        formatted.push_str(&format!("\n\nConfidence: {}", confidence));
    }

    if let Some(metadata) = reply.metadata.as_ref().filter(|m| !m.is_empty()) {
        let lines = metadata
            .iter()
            .map(|(key, value)| match value {
                serde_json::Value::String(s) => format!("- {}: {}", key, s),
                other => format!("- {}: {}", key, other),
            })
            .collect::<Vec<_>>()
            .join("\n");
        formatted.push_str("\n\nAdditional Information:\n");
        formatted.push_str(&lines);
    }

    formatted
}

fn match_failed(error: &MatchError) -> FinalResponse {
    let (status, reason, message) = match error {
        MatchError::NoMatch { .. } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "NoMatch",
            "Could not determine which agent is best suited for this query. \
             Please provide more specific information.",
        ),
        MatchError::Unavailable(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            "MatcherUnavailable",
            "The routing service is currently unavailable. Please try again later.",
        ),
    };

    FinalResponse::Failed {
        status,
        error: ErrorBody {
            kind: ErrorKind::MatchFailed,
            reason: Some(reason.to_string()),
            agent: None,
            message: message.to_string(),
        },
    }
}

fn dispatch_failed(agent: &AgentDescriptor, reason: FailureReason, timeout: Duration) -> FinalResponse {
    let (status, message) = match reason {
        FailureReason::Unreachable => (
            StatusCode::BAD_GATEWAY,
            format!("Failed to communicate with {}: the agent is unreachable.", agent.name),
        ),
        FailureReason::Timeout => (
            StatusCode::GATEWAY_TIMEOUT,
            format!(
                "{} did not respond within {} seconds.",
                agent.name,
                timeout.as_secs_f64()
            ),
        ),
        FailureReason::BadResponse => (
            StatusCode::BAD_GATEWAY,
            format!("{} returned an invalid response.", agent.name),
        ),
    };

    FinalResponse::Failed {
        status,
        error: ErrorBody {
            kind: ErrorKind::DispatchFailed,
            reason: Some(reason.as_str().to_string()),
            agent: Some(agent.id.clone()),
            message,
        },
    }
}
