//! Mock oracles for testing.
//!
//! These stand in for the routing model so tests never reach a real API.
//! `mockall` mocks are used where call counts matter; the hand-written ones
//! below cover the common scripted cases.

use ares_relay::llm::{Oracle, OracleError};
use async_trait::async_trait;
use mockall::mock;
use std::sync::atomic::{AtomicUsize, Ordering};

mock! {
    pub OracleClient {}

    #[async_trait]
    impl Oracle for OracleClient {
        async fn complete(&self, prompt: &str) -> Result<String, OracleError>;
        fn model_name(&self) -> &str;
    }
}

/// Mock oracle with a scripted reply.
///
/// # Examples
///
/// ```ignore
/// // Always name the research agent
/// let oracle = MockOracle::fixed("AGENT_NAME: research_agent\nREASON: research");
///
/// // Route on keywords found in the query line of the prompt
/// let oracle = MockOracle::keywords(&[("summary", "content_writing_agent")]);
///
/// // Simulate an outage
/// let oracle = MockOracle::failing();
/// ```
pub struct MockOracle {
    behaviour: Behaviour,
    calls: AtomicUsize,
}

enum Behaviour {
    Fixed(String),
    Keywords(Vec<(String, String)>),
    Failing(OracleError),
}

impl MockOracle {
    /// Create an oracle that always returns `reply`.
    pub fn fixed(reply: &str) -> Self {
        Self::with(Behaviour::Fixed(reply.to_string()))
    }

    /// Create an oracle that names the agent paired with the first keyword
    /// found in the query, and answers `NONE` otherwise.
    pub fn keywords(rules: &[(&str, &str)]) -> Self {
        Self::with(Behaviour::Keywords(
            rules
                .iter()
                .map(|(keyword, agent)| (keyword.to_lowercase(), agent.to_string()))
                .collect(),
        ))
    }

    /// Create an oracle that always fails with a network error.
    pub fn failing() -> Self {
        Self::with(Behaviour::Failing(OracleError::Network(
            "connection refused".to_string(),
        )))
    }

    /// Number of completed `complete` calls
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn with(behaviour: Behaviour) -> Self {
        Self {
            behaviour,
            calls: AtomicUsize::new(0),
        }
    }
}

/// The query line of a routing prompt
pub fn query_from_prompt(prompt: &str) -> String {
    prompt
        .lines()
        .find_map(|line| line.strip_prefix("User query:"))
        .unwrap_or_default()
        .trim()
        .to_lowercase()
}

#[async_trait]
impl Oracle for MockOracle {
    async fn complete(&self, prompt: &str) -> Result<String, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behaviour {
            Behaviour::Fixed(reply) => Ok(reply.clone()),
            Behaviour::Failing(error) => Err(error.clone()),
            Behaviour::Keywords(rules) => {
                let query = query_from_prompt(prompt);
                let reply = rules
                    .iter()
                    .find(|(keyword, _)| query.contains(keyword.as_str()))
                    .map(|(keyword, agent)| {
                        format!("AGENT_NAME: {agent}\nREASON: the query mentions '{keyword}'")
                    })
                    .unwrap_or_else(|| "AGENT_NAME: NONE".to_string());
                Ok(reply)
            }
        }
    }

    fn model_name(&self) -> &str {
        "mock-oracle"
    }
}
