//! Oracle provider tests with mocked network responses.
//!
//! wiremock stands in for the Gemini and OpenAI-compatible APIs so the
//! request shape, credential placement and error mapping are checked
//! without network access.

mod common;

use ares_relay::llm::{Oracle, OracleError, Provider};
use ares_relay::utils::toml_config::{OracleConfig, ProviderKind};
use common::{closed_endpoint, test_http_client};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============= Helper Functions =============

fn provider(kind: ProviderKind, base_url: &str, timeout_secs: u64) -> Provider {
    let config = OracleConfig {
        provider: kind,
        model: None,
        api_key_env: None,
        base_url: Some(base_url.to_string()),
        timeout_secs,
        temperature: Some(0.0),
    };
    Provider::from_config(&config, "test-key".to_string())
}

fn gemini_reply(parts: &[&str]) -> serde_json::Value {
    json!({
        "candidates": [{
            "content": {
                "role": "model",
                "parts": parts.iter().map(|text| json!({ "text": text })).collect::<Vec<_>>()
            },
            "finishReason": "STOP"
        }]
    })
}

fn openai_reply(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }]
    })
}

// ============= Gemini =============

#[tokio::test]
async fn test_gemini_generate_content() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/models/gemini-pro:generateContent"))
        .and(header("x-goog-api-key", "test-key"))
        .and(body_partial_json(json!({
            "contents": [{ "role": "user", "parts": [{ "text": "route me" }] }],
            "generationConfig": { "temperature": 0.0 }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_reply(&[
            "AGENT_NAME: research_agent\n",
            "REASON: research request",
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let oracle = provider(ProviderKind::Gemini, &mock_server.uri(), 5)
        .create_oracle(test_http_client());

    let reply = oracle.complete("route me").await.unwrap();

    assert_eq!(reply, "AGENT_NAME: research_agent\nREASON: research request");
    assert_eq!(oracle.model_name(), "gemini-pro");
}

#[tokio::test]
async fn test_gemini_quota_exhausted() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": { "code": 429, "status": "RESOURCE_EXHAUSTED" }
        })))
        .mount(&mock_server)
        .await;

    let oracle = provider(ProviderKind::Gemini, &mock_server.uri(), 5)
        .create_oracle(test_http_client());

    assert!(matches!(
        oracle.complete("route me").await,
        Err(OracleError::Quota(_))
    ));
}

#[tokio::test]
async fn test_gemini_without_candidates_is_empty() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
        .mount(&mock_server)
        .await;

    let oracle = provider(ProviderKind::Gemini, &mock_server.uri(), 5)
        .create_oracle(test_http_client());

    assert_eq!(
        oracle.complete("route me").await,
        Err(OracleError::EmptyResponse)
    );
}

#[tokio::test]
async fn test_gemini_slow_reply_times_out() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(gemini_reply(&["AGENT_NAME: research_agent"]))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&mock_server)
        .await;

    let oracle = provider(ProviderKind::Gemini, &mock_server.uri(), 1)
        .create_oracle(test_http_client());

    assert_eq!(
        oracle.complete("route me").await,
        Err(OracleError::Timeout(Duration::from_secs(1)))
    );
}

// ============= OpenAI-compatible =============

#[tokio::test]
async fn test_openai_chat_completion() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "model": "gpt-4o-mini",
            "messages": [{ "role": "user", "content": "route me" }]
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(openai_reply("AGENT_NAME: content_writing_agent")),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let oracle = provider(ProviderKind::OpenAI, &mock_server.uri(), 5)
        .create_oracle(test_http_client());

    assert_eq!(
        oracle.complete("route me").await.unwrap(),
        "AGENT_NAME: content_writing_agent"
    );
    assert_eq!(oracle.model_name(), "gpt-4o-mini");
}

#[tokio::test]
async fn test_openai_auth_failure_is_api_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": { "message": "Incorrect API key provided" }
        })))
        .mount(&mock_server)
        .await;

    let oracle = provider(ProviderKind::OpenAI, &mock_server.uri(), 5)
        .create_oracle(test_http_client());

    match oracle.complete("route me").await {
        Err(OracleError::Api { status, message }) => {
            assert_eq!(status, 401);
            assert!(message.contains("Incorrect API key"));
        }
        other => panic!("expected API error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_openai_malformed_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&mock_server)
        .await;

    let oracle = provider(ProviderKind::OpenAI, &mock_server.uri(), 5)
        .create_oracle(test_http_client());

    assert!(matches!(
        oracle.complete("route me").await,
        Err(OracleError::Malformed(_))
    ));
}

#[tokio::test]
async fn test_unreachable_oracle_is_network_error() {
    let oracle = provider(ProviderKind::OpenAI, &closed_endpoint(), 5)
        .create_oracle(test_http_client());

    assert!(matches!(
        oracle.complete("route me").await,
        Err(OracleError::Network(_))
    ));
}
