//! API request handlers.

/// Registry listing handlers.
pub mod agents;
/// Health check handler.
pub mod health;
/// Query submission handler.
pub mod query;
