use crate::{
    agents::{
        registry::{AgentDescriptor, Registry},
        Query,
    },
    llm::{Oracle, OracleError},
};
use std::sync::Arc;
use std::time::Duration;

/// How a [`RoutingDecision`] was reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionSource {
    /// The oracle named the agent
    Oracle,
    /// The oracle was unavailable and the registry has a single agent
    SingleCandidate,
}

/// The agent chosen for one query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingDecision {
    /// Always a key of the registry the decision was made against
    pub agent_id: String,
    pub rationale: Option<String>,
    pub source: DecisionSource,
}

/// Why no agent could be chosen
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MatchError {
    /// The oracle could not be consulted; the caller may retry later
    #[error("routing oracle unavailable: {0}")]
    Unavailable(#[from] OracleError),

    /// The oracle answered but did not name a registered agent
    #[error("oracle reply did not name a registered agent")]
    NoMatch { reply: String },
}

/// Capability matcher that picks exactly one agent for a query.
///
/// Uses an external oracle to compare the query against the name,
/// description and capability tags of every registered agent.
pub struct CapabilityMatcher {
    oracle: Arc<dyn Oracle>,
    timeout: Duration,
}

impl CapabilityMatcher {
    /// Creates a matcher with the given oracle and per-call budget.
    pub fn new(oracle: Arc<dyn Oracle>, timeout: Duration) -> Self {
        Self { oracle, timeout }
    }

    pub fn model_name(&self) -> &str {
        self.oracle.model_name()
    }

    /// Build the routing prompt for a query
    pub fn build_prompt(query: &Query, registry: &Registry) -> String {
        let agent_descriptions = registry
            .iter()
            .map(AgentDescriptor::prompt_line)
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            r#"You are an orchestrator agent that routes queries to specialized agents.

Available agents:
{agent_descriptions}

User query: {query}

Analyze the query and determine which agent is best suited to handle it.
Select exactly one agent from the list above and answer with its identifier
(the text before the first colon on its line).

Output format:
AGENT_NAME: <selected agent>
REASON: <brief explanation for selection>"#,
            query = query.text()
        )
    }

    /// Parse a routing decision from oracle output
    ///
    /// This handles various reply formats:
    /// - Structured: "AGENT_NAME: research_agent\nREASON: ..."
    /// - Markdown emphasis: "**AGENT_NAME:** `research_agent`"
    /// - Bare identifier: "research_agent"
    ///
    /// Returns `None` unless the named agent exists in `registry`.
    pub fn parse_decision(reply: &str, registry: &Registry) -> Option<RoutingDecision> {
        let mut named: Option<&str> = None;
        let mut rationale: Option<String> = None;

        for line in reply.lines() {
            let line = line.trim().trim_start_matches(['*', '#', '-', '`', '>', ' ']);
            if let Some(rest) = strip_label(line, "AGENT_NAME:") {
                named = named.or(Some(clean_value(rest)));
            } else if let Some(rest) = strip_label(line, "REASON:") {
                let rest = clean_value(rest);
                if rationale.is_none() && !rest.is_empty() {
                    rationale = Some(rest.to_string());
                }
            }
        }

        if named.is_none() {
            let bare = clean_value(reply);
            if !bare.is_empty() && !bare.contains(char::is_whitespace) {
                named = Some(bare);
            }
        }

        let agent = resolve_agent(named?, registry)?;
        Some(RoutingDecision {
            agent_id: agent.id.clone(),
            rationale,
            source: DecisionSource::Oracle,
        })
    }

    /// Select the agent that should handle `query`.
    ///
    /// The oracle is always consulted. When it is unavailable and the registry
    /// holds exactly one agent, that agent is returned instead of an error.
    pub async fn select_agent(
        &self,
        query: &Query,
        registry: &Registry,
    ) -> Result<RoutingDecision, MatchError> {
        let prompt = Self::build_prompt(query, registry);

        let reply = match tokio::time::timeout(self.timeout, self.oracle.complete(&prompt)).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => return Self::unavailable(e, registry),
            Err(_) => return Self::unavailable(OracleError::Timeout(self.timeout), registry),
        };

        match Self::parse_decision(&reply, registry) {
            Some(decision) => {
                tracing::debug!(
                    agent = %decision.agent_id,
                    rationale = decision.rationale.as_deref().unwrap_or(""),
                    "Oracle selected agent"
                );
                Ok(decision)
            }
            None => {
                tracing::debug!("Oracle reply '{}' did not name a registered agent", reply);
                Err(MatchError::NoMatch { reply })
            }
        }
    }

    fn unavailable(error: OracleError, registry: &Registry) -> Result<RoutingDecision, MatchError> {
        match registry.single() {
            Some(agent) => {
                tracing::warn!(
                    agent = %agent.id,
                    "Routing oracle unavailable ({}); using the only registered agent",
                    error
                );
                Ok(RoutingDecision {
                    agent_id: agent.id.clone(),
                    rationale: Some("only registered agent".to_string()),
                    source: DecisionSource::SingleCandidate,
                })
            }
            None => Err(MatchError::Unavailable(error)),
        }
    }
}

fn strip_label<'a>(line: &'a str, label: &str) -> Option<&'a str> {
    let head = line.get(..label.len())?;
    if head.eq_ignore_ascii_case(label) {
        Some(&line[label.len()..])
    } else {
        None
    }
}

fn clean_value(value: &str) -> &str {
    value.trim_matches(|c: char| {
        c.is_whitespace() || matches!(c, '*' | '`' | '"' | '\'' | '<' | '>' | '.' | ',')
    })
}

/// Identifier first (exact, then case-insensitive), then a unique display name
fn resolve_agent<'r>(name: &str, registry: &'r Registry) -> Option<&'r AgentDescriptor> {
    registry.resolve(name).or_else(|| {
        let mut by_name = registry
            .iter()
            .filter(|agent| agent.name.eq_ignore_ascii_case(name));
        match (by_name.next(), by_name.next()) {
            (Some(agent), None) => Some(agent),
            _ => None,
        }
    })
}
