//! Routing pipeline
//!
//! A query flows through three components:
//!
//! 1. [`router::CapabilityMatcher`] asks the oracle which registered agent fits
//! 2. [`dispatch::DispatchClient`] forwards the query to that agent's endpoint
//! 3. [`orchestrator::Orchestrator`] sequences both and assembles the answer
//!
//! The [`registry::Registry`] they share is immutable once loaded.

pub mod dispatch;
pub mod orchestrator;
pub mod registry;
pub mod router;

use crate::types::{AppError, Result};

// Re-export commonly used types
pub use dispatch::{DispatchClient, DispatchResult, FailureReason};
pub use orchestrator::{FinalResponse, Orchestrator};
pub use registry::{AgentDescriptor, Registry, RegistryLoadError, RegistryManager, RegistrySource};
pub use router::{CapabilityMatcher, MatchError, RoutingDecision};

/// A single user query. Owned by the request that received it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    text: String,
}

impl Query {
    /// Wrap raw query text; blank text is rejected
    pub fn new(text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(AppError::InvalidInput("query must not be empty".to_string()));
        }
        Ok(Self { text })
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_query_rejected() {
        assert!(Query::new("").is_err());
        assert!(Query::new(" \n\t").is_err());
        assert_eq!(Query::new("hello").unwrap().text(), "hello");
    }
}
