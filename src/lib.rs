//! # A.R.E.S Relay - single-hop agent router
//!
//! A small orchestration server that receives a free-text query, asks a
//! language model which registered agent is best suited to answer it, forwards
//! the query to that agent over HTTP and relays the answer back.
//!
//! ## Overview
//!
//! A.R.E.S Relay can be used in two ways:
//!
//! 1. **As a standalone server** - Run the `ares-relay` binary
//! 2. **As a library** - Embed the routing pipeline in your own service
//!
//! ### Basic Example
//!
//! ```rust,ignore
//! use ares_relay::{
//!     CapabilityMatcher, DispatchClient, Orchestrator, Provider, RegistryManager,
//!     agents::registry::FileRegistrySource, utils::toml_config::RelayConfig,
//! };
//! use std::sync::Arc;
//!
//! let config = RelayConfig::load("relay.toml")?;
//! let http = reqwest::Client::new();
//!
//! let source = Arc::new(FileRegistrySource::new(&config.registry.path));
//! let registry = Arc::new(RegistryManager::load(source).await?);
//!
//! let provider = Provider::from_config(&config.oracle, config.oracle_api_key()?);
//! let matcher = CapabilityMatcher::new(provider.create_oracle(http.clone()).into(), config.oracle.timeout());
//!
//! let orchestrator = Orchestrator::new(registry, matcher, DispatchClient::new(http), config.dispatch.timeout());
//! let answer = orchestrator.submit_query("Research renewable energy trends").await?;
//! ```
//!
//! ## Modules
//!
//! - [`agents`] - Registry, matcher, dispatch client and orchestrator
//! - [`api`] - REST API handlers and routes
//! - [`cli`] - Command line parsing and coloured output
//! - [`llm`] - Oracle clients (Gemini, OpenAI-compatible)
//! - [`types`] - API types and error handling
//! - [`utils`] - Configuration loading and body excerpts

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

/// Query routing pipeline.
pub mod agents;
/// HTTP API handlers and routes.
pub mod api;
/// Command line interface.
pub mod cli;
/// Oracle clients used for routing decisions.
pub mod llm;
/// Core types (requests, responses, errors).
pub mod types;
/// Configuration utilities.
pub mod utils;

// Re-export commonly used types
pub use agents::{
    CapabilityMatcher, DispatchClient, FinalResponse, Orchestrator, Registry, RegistryManager,
};
pub use llm::{Oracle, OracleError, Provider};
pub use types::{AppError, Result};
pub use utils::toml_config::RelayConfig;

use axum::Router;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Server configuration, read once at startup
    pub config: Arc<RelayConfig>,
    /// Agent registry with snapshot-per-request semantics
    pub registry: Arc<RegistryManager>,
    /// Query pipeline
    pub orchestrator: Arc<Orchestrator>,
}

/// Build the HTTP application for the given state
pub fn app(state: AppState) -> Router {
    api::routes::create_router().with_state(state)
}
