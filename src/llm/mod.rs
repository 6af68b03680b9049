//! Oracle clients
//!
//! The router's semantic decision is delegated to an external text-generation
//! model. This module hides the provider behind the [`Oracle`] trait.
//!
//! # Architecture
//!
//! - [`Oracle`] - The trait the router depends on
//! - [`Provider`] - Resolved provider settings, built from `relay.toml`
//! - [`GeminiOracle`](gemini::GeminiOracle) / [`OpenAIOracle`](openai::OpenAIOracle) - HTTP implementations
//!
//! # Example
//!
//! ```ignore
//! use ares_relay::llm::Provider;
//!
//! let provider = Provider::from_config(&config.oracle, api_key);
//! let oracle = provider.create_oracle(reqwest::Client::new());
//!
//! let reply = oracle.complete("Which agent should answer?").await?;
//! ```

/// Oracle trait, errors and provider selection.
pub mod client;
/// Google Gemini `generateContent` client.
pub mod gemini;
/// OpenAI-compatible chat completions client.
pub mod openai;

pub use client::{Oracle, OracleError, Provider};
