//! Shared helpers for integration tests.

#![allow(dead_code)]

pub mod mocks;

use ares_relay::{
    AppState, CapabilityMatcher, DispatchClient, Oracle, Orchestrator, Registry, RegistryManager,
    app,
    utils::toml_config::RelayConfig,
};
use axum_test::TestServer;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Registry with the research and content writing agents at the given endpoints
pub fn two_agent_registry(research: &str, writer: &str) -> Registry {
    Registry::from_toml_str(&format!(
        r#"
[research_agent]
name = "Research Agent"
description = "Specialized in information retrieval, fact checking and literature review"
endpoint = "{research}"
capabilities = ["information_retrieval", "fact_checking", "literature_review", "source_discovery"]

[content_writing_agent]
name = "Content Writing Agent"
description = "Creates, edits, adapts and summarizes written content"
endpoint = "{writer}"
capabilities = ["content_creation", "editing", "style_adaptation", "summarization"]
"#
    ))
    .expect("test registry should parse")
}

/// Start a mock agent answering every `POST /query` with `reply`
pub async fn mock_agent(reply: serde_json::Value) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(reply))
        .mount(&server)
        .await;
    server
}

/// Start a mock agent that echoes a fixed result string
pub async fn echo_agent(result: &str) -> MockServer {
    mock_agent(json!({ "result": result })).await
}

/// `http://127.0.0.1:<port>/query` for a port nothing listens on
pub fn closed_endpoint() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);
    format!("http://127.0.0.1:{port}/query")
}

/// HTTP client that ignores proxy settings of the test environment
pub fn test_http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .build()
        .expect("build reqwest client")
}

/// Build an orchestrator over `registry` with the given oracle and dispatch budget
pub fn orchestrator(
    registry: Registry,
    oracle: Arc<dyn Oracle>,
    dispatch_timeout: Duration,
) -> Orchestrator {
    Orchestrator::new(
        Arc::new(RegistryManager::from_registry(registry)),
        CapabilityMatcher::new(oracle, Duration::from_secs(5)),
        DispatchClient::new(test_http_client()),
        dispatch_timeout,
    )
}

/// Build an axum-test server over an orchestrator
pub fn test_server(orchestrator: Orchestrator) -> TestServer {
    let registry = orchestrator.registry().clone();
    let state = AppState {
        config: Arc::new(RelayConfig::default()),
        registry,
        orchestrator: Arc::new(orchestrator),
    };
    TestServer::new(app(state)).expect("Failed to create test server")
}
