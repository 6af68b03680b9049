//! Configuration and text utilities.

/// `relay.toml` loading and validation.
pub mod toml_config;

/// Helpers for handling remote response bodies.
pub mod text;
