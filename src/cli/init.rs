//! Init command implementation
//!
//! Scaffolds a relay project: `relay.toml`, a sample agent registry and an
//! `.env.example` naming the oracle credential.

use super::output::Output;
use std::fs;
use std::path::{Path, PathBuf};

/// Result of the init operation
#[derive(Debug)]
pub enum InitResult {
    /// Initialization completed successfully
    Success,
    /// Project already exists (relay.toml found)
    AlreadyExists,
    /// An error occurred during initialization
    Error(String),
}

/// Configuration for the init command
pub struct InitConfig {
    /// Directory to initialize
    pub path: PathBuf,
    /// Overwrite existing files
    pub force: bool,
    /// Oracle provider to configure (gemini or openai)
    pub provider: String,
    /// Host address for the server
    pub host: String,
    /// Port for the server
    pub port: u16,
}

/// Run the init command
pub fn run(config: InitConfig, output: &Output) -> InitResult {
    output.banner();
    output.header("Initializing A.R.E.S Relay");

    let base_path = &config.path;

    let config_path = base_path.join("relay.toml");
    if config_path.exists() && !config.force {
        output.warning("relay.toml already exists!");
        output.hint("Use --force to overwrite existing files");
        return InitResult::AlreadyExists;
    }

    let config_dir = base_path.join("config");
    if !config_dir.exists() {
        if let Err(e) = fs::create_dir_all(&config_dir) {
            output.error(&format!("Failed to create config/: {}", e));
            return InitResult::Error(e.to_string());
        }
        output.created_dir("config");
    }

    let files = [
        ("config", "relay.toml", generate_relay_toml(&config)),
        (
            "registry",
            "config/agent_registry.toml",
            generate_registry().to_string(),
        ),
        ("env", ".env.example", generate_env_example(&config)),
    ];

    for (kind, name, content) in &files {
        let path = base_path.join(name);
        if path.exists() && !config.force {
            output.skipped(name, "already exists");
            continue;
        }
        if let Err(e) = write_file(&path, content, config.force) {
            output.error(&format!("Failed to create {}: {}", name, e));
            return InitResult::Error(e.to_string());
        }
        output.created(kind, name);
    }

    output.complete("Relay project initialized successfully!");

    output.header("Next Steps");
    output.newline();
    output.info("1. Provide the oracle credential:");
    output.command("cp .env.example .env");
    output.command(&format!("# Edit .env and set {}", api_key_env(&config.provider)));
    output.newline();
    output.info("2. Point config/agent_registry.toml at your agents");
    output.newline();
    output.info("3. Start the relay:");
    output.command("ares-relay");
    output.newline();

    output.hint(&format!(
        "Queries are accepted at http://{}:{}/query",
        config.host, config.port
    ));

    InitResult::Success
}

fn write_file(path: &Path, content: &str, force: bool) -> std::io::Result<()> {
    if path.exists() && !force {
        return Ok(());
    }
    fs::write(path, content)
}

fn api_key_env(provider: &str) -> &'static str {
    if provider == "openai" {
        "OPENAI_API_KEY"
    } else {
        "GOOGLE_API_KEY"
    }
}

fn generate_relay_toml(config: &InitConfig) -> String {
    let oracle_section = if config.provider == "openai" {
        r#"[oracle]
provider = "openai"
model = "gpt-4o-mini"
api_key_env = "OPENAI_API_KEY"
# base_url = "https://api.openai.com/v1"
timeout_secs = 30
temperature = 0.0
"#
    } else {
        r#"[oracle]
provider = "gemini"
model = "gemini-pro"
api_key_env = "GOOGLE_API_KEY"
# base_url = "https://generativelanguage.googleapis.com/v1beta"
timeout_secs = 30
"#
    };

    format!(
        r#"# A.R.E.S Relay configuration

[server]
host = "{host}"
port = {port}
log_level = "info"

[registry]
path = "config/agent_registry.toml"
# Reload the registry when the file changes
watch = false

{oracle_section}
[dispatch]
# Budget for one downstream agent call
timeout_secs = 10
"#,
        host = config.host,
        port = config.port,
        oracle_section = oracle_section,
    )
}

fn generate_registry() -> &'static str {
    r#"# Agent registry: one table per agent, keyed by its identifier.

[research_agent]
name = "Research Agent"
description = "Specialized in information retrieval, fact checking and literature review"
endpoint = "http://localhost:8001/query"
capabilities = ["information_retrieval", "fact_checking", "literature_review", "source_discovery"]

[content_writing_agent]
name = "Content Writing Agent"
description = "Creates, edits, adapts and summarizes written content"
endpoint = "http://localhost:8002/query"
capabilities = ["content_creation", "editing", "style_adaptation", "summarization"]
"#
}

fn generate_env_example(config: &InitConfig) -> String {
    format!(
        r#"# A.R.E.S Relay Environment Variables
# Copy this file to .env and fill in the values.

# REQUIRED: credential for the routing oracle
{}=your-api-key-here

# Optional: logging filter, overrides server.log_level
RUST_LOG=info,ares_relay=debug
"#,
        api_key_env(&config.provider)
    )
}
