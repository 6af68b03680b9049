use crate::{agents::Query, utils::text::excerpt};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Category of a failed dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureReason {
    /// The endpoint could not be reached (refused, DNS, reset before a reply)
    Unreachable,
    /// No complete reply within the dispatch budget
    Timeout,
    /// Non-2xx status or a body that is not `{ "result": <string> }`
    BadResponse,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::Unreachable => "Unreachable",
            FailureReason::Timeout => "Timeout",
            FailureReason::BadResponse => "BadResponse",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{reason}: {detail}")]
pub struct DispatchFailure {
    pub reason: FailureReason,
    pub detail: String,
}

impl DispatchFailure {
    fn new(reason: FailureReason, detail: impl Into<String>) -> Self {
        Self {
            reason,
            detail: detail.into(),
        }
    }
}

/// Body of a successful agent reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentReply {
    pub result: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

/// Outcome of one dispatch attempt. Every failure mode is a value, never a panic.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchResult {
    Success(AgentReply),
    Failure(DispatchFailure),
}

impl DispatchResult {
    pub fn is_success(&self) -> bool {
        matches!(self, DispatchResult::Success(_))
    }

    /// Downstream payload on success
    pub fn payload(&self) -> Option<&str> {
        match self {
            DispatchResult::Success(reply) => Some(&reply.result),
            DispatchResult::Failure(_) => None,
        }
    }

    pub fn failure_reason(&self) -> Option<FailureReason> {
        match self {
            DispatchResult::Success(_) => None,
            DispatchResult::Failure(failure) => Some(failure.reason),
        }
    }
}

#[derive(Serialize)]
struct AgentRequest<'a> {
    query: &'a str,
}

/// HTTP client that forwards a query to an agent endpoint.
///
/// Makes exactly one attempt per call; retry policy is not decided here.
#[derive(Clone)]
pub struct DispatchClient {
    http: reqwest::Client,
}

impl DispatchClient {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// POST `{ "query": ... }` to `endpoint` and wait at most `timeout` for the reply
    pub async fn dispatch(&self, endpoint: &Url, query: &Query, timeout: Duration) -> DispatchResult {
        let exchange = self.exchange(endpoint, query, timeout);

        let outcome = match tokio::time::timeout(timeout, exchange).await {
            Ok(outcome) => outcome,
            Err(_) => Err(DispatchFailure::new(
                FailureReason::Timeout,
                format!("no reply within {}ms", timeout.as_millis()),
            )),
        };

        match outcome {
            Ok(reply) => DispatchResult::Success(reply),
            Err(failure) => {
                tracing::debug!(endpoint = %endpoint, "Dispatch failed: {}", failure);
                DispatchResult::Failure(failure)
            }
        }
    }

    async fn exchange(
        &self,
        endpoint: &Url,
        query: &Query,
        timeout: Duration,
    ) -> Result<AgentReply, DispatchFailure> {
        let response = self
            .http
            .post(endpoint.clone())
            .timeout(timeout)
            .json(&AgentRequest {
                query: query.text(),
            })
            .send()
            .await
            .map_err(|e| transport_failure(e, timeout))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| transport_failure(e, timeout))?;

        if !status.is_success() {
            return Err(DispatchFailure::new(
                FailureReason::BadResponse,
                format!("agent returned HTTP {}: {}", status.as_u16(), excerpt(&body, 200)),
            ));
        }

        serde_json::from_str::<AgentReply>(&body).map_err(|e| {
            DispatchFailure::new(
                FailureReason::BadResponse,
                format!("agent reply is not a valid result body: {}", e),
            )
        })
    }
}

fn transport_failure(err: reqwest::Error, timeout: Duration) -> DispatchFailure {
    if err.is_timeout() {
        DispatchFailure::new(
            FailureReason::Timeout,
            format!("no reply within {}ms", timeout.as_millis()),
        )
    } else if err.is_decode() || err.is_body() {
        DispatchFailure::new(
            FailureReason::BadResponse,
            format!("failed to read agent reply: {}", err.without_url()),
        )
    } else {
        DispatchFailure::new(
            FailureReason::Unreachable,
            format!("could not reach agent: {}", err.without_url()),
        )
    }
}
