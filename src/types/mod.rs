use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ============= API Request/Response Types =============

/// Body of `POST /query`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QueryRequest {
    pub query: String,
}

/// Successful answer returned by `POST /query`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct QueryResponse {
    /// Formatted answer assembled from the downstream agent's reply
    pub response: String,
    /// Identifier of the agent that produced the answer
    pub agent: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

/// Structured failure returned by `POST /query`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub kind: ErrorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    pub message: String,
}

/// Top-level failure categories visible to callers.
///
/// `MatchFailed` means no agent could be chosen; `DispatchFailed` means an agent
/// was chosen but did not answer usefully.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum ErrorKind {
    MatchFailed,
    DispatchFailed,
    InvalidInput,
    Internal,
}

/// Registry entry as exposed by `GET /agents`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AgentInfo {
    pub id: String,
    pub name: String,
    pub description: String,
    pub endpoint: String,
    pub capabilities: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub agents: usize,
    pub model: String,
}

// ============= Error Types =============

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, kind, message) = match self {
            AppError::InvalidInput(msg) => (
                axum::http::StatusCode::BAD_REQUEST,
                ErrorKind::InvalidInput,
                msg,
            ),
            AppError::NotFound(msg) => (
                axum::http::StatusCode::NOT_FOUND,
                ErrorKind::InvalidInput,
                msg,
            ),
            AppError::PayloadTooLarge(msg) => (
                axum::http::StatusCode::PAYLOAD_TOO_LARGE,
                ErrorKind::InvalidInput,
                msg,
            ),
        };

        let body = ErrorResponse {
            error: ErrorBody {
                kind,
                reason: None,
                agent: None,
                message,
            },
        };

        (status, axum::Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, response::IntoResponse};

    #[test]
    fn test_app_error_status_codes() {
        let cases = [
            (AppError::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (AppError::PayloadTooLarge("x".into()), StatusCode::PAYLOAD_TOO_LARGE),
        ];

        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }

    #[test]
    fn test_error_body_omits_empty_fields() {
        let body = ErrorResponse {
            error: ErrorBody {
                kind: ErrorKind::MatchFailed,
                reason: Some("NoMatch".to_string()),
                agent: None,
                message: "no agent".to_string(),
            },
        };

        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "error": { "kind": "MatchFailed", "reason": "NoMatch", "message": "no agent" }
            })
        );
    }
}
