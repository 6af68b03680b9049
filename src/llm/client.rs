//! Oracle abstraction and provider selection
//!
//! The router asks an external text-generation model which agent should
//! handle a query. That model is reached through the [`Oracle`] trait so the
//! router can be tested against a deterministic stub:
//! - **Gemini**: Google Generative Language API (`generateContent`)
//! - **OpenAI**: any OpenAI-compatible `chat/completions` endpoint

use crate::utils::{
    text::excerpt,
    toml_config::{OracleConfig, ProviderKind},
};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;

/// Failures of a single oracle call.
///
/// None of these are a routing decision: the router reports all of them as
/// "matcher unavailable" so callers can tell them apart from a genuine no-match.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OracleError {
    #[error("oracle unreachable: {0}")]
    Network(String),

    #[error("oracle did not answer within {0:?}")]
    Timeout(Duration),

    #[error("oracle quota exhausted: {0}")]
    Quota(String),

    #[error("oracle returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("oracle returned no text")]
    EmptyResponse,

    #[error("oracle reply could not be decoded: {0}")]
    Malformed(String),
}

impl OracleError {
    /// Map a non-success HTTP status from a provider API
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let message = excerpt(body, 200);
        if status == StatusCode::TOO_MANY_REQUESTS {
            OracleError::Quota(message)
        } else {
            OracleError::Api {
                status: status.as_u16(),
                message,
            }
        }
    }

    /// Map a transport error from reqwest
    pub fn from_transport(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            OracleError::Timeout(timeout)
        } else {
            OracleError::Network(err.without_url().to_string())
        }
    }
}

/// External semantic-reasoning service used to make routing decisions
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Send a prompt and return the model's text reply
    async fn complete(&self, prompt: &str) -> Result<String, OracleError>;

    /// Get the model name/identifier
    fn model_name(&self) -> &str;
}

/// Provider enum for runtime selection, with the credential already resolved
#[derive(Debug, Clone)]
pub enum Provider {
    /// Google Gemini
    ///
    /// # Example
    /// ```rust,ignore
    /// let provider = Provider::Gemini {
    ///     api_key: "AIza...".to_string(),
    ///     base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
    ///     model: "gemini-pro".to_string(),
    ///     temperature: None,
    ///     timeout: Duration::from_secs(30),
    /// };
    /// ```
    Gemini {
        api_key: String,
        base_url: String,
        model: String,
        temperature: Option<f32>,
        timeout: Duration,
    },

    /// OpenAI or any server speaking the same chat completions API
    OpenAI {
        api_key: String,
        base_url: String,
        model: String,
        temperature: Option<f32>,
        timeout: Duration,
    },
}

impl Provider {
    /// Build a provider from configuration and the credential read at startup
    pub fn from_config(config: &OracleConfig, api_key: String) -> Self {
        let timeout = Duration::from_secs(config.timeout_secs);
        let base_url = config.base_url().trim_end_matches('/').to_string();
        let model = config.model().to_string();

        match config.provider {
            ProviderKind::Gemini => Provider::Gemini {
                api_key,
                base_url,
                model,
                temperature: config.temperature,
                timeout,
            },
            ProviderKind::OpenAI => Provider::OpenAI {
                api_key,
                base_url,
                model,
                temperature: config.temperature,
                timeout,
            },
        }
    }

    /// Create an oracle client for this provider
    pub fn create_oracle(&self, http: reqwest::Client) -> Box<dyn Oracle> {
        match self {
            Provider::Gemini {
                api_key,
                base_url,
                model,
                temperature,
                timeout,
            } => Box::new(super::gemini::GeminiOracle::new(
                http,
                api_key.clone(),
                base_url.clone(),
                model.clone(),
                *temperature,
                *timeout,
            )),
            Provider::OpenAI {
                api_key,
                base_url,
                model,
                temperature,
                timeout,
            } => Box::new(super::openai::OpenAIOracle::new(
                http,
                api_key.clone(),
                base_url.clone(),
                model.clone(),
                *temperature,
                *timeout,
            )),
        }
    }

    /// Get a human-readable name for this provider
    pub fn name(&self) -> &'static str {
        match self {
            Provider::Gemini { .. } => "Gemini",
            Provider::OpenAI { .. } => "OpenAI",
        }
    }

    pub fn model(&self) -> &str {
        match self {
            Provider::Gemini { model, .. } | Provider::OpenAI { model, .. } => model,
        }
    }
}
