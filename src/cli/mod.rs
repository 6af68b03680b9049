//! CLI module for A.R.E.S Relay
//!
//! Provides command-line interface parsing for the ares-relay binary.
//! Uses clap for argument parsing and owo-colors for colored terminal output.

pub mod init;
pub mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// A.R.E.S Relay - single-hop agent router
///
/// Receives a query, asks a language model which registered agent should
/// answer it, and forwards the query to that agent.
#[derive(Parser, Debug)]
#[command(
    name = "ares-relay",
    author = "Dirmacs <build@dirmacs.com>",
    version,
    about = "A.R.E.S Relay - route queries to the best-suited agent",
    long_about = "Routes each free-text query to exactly one agent from a registry,\n\
                  using a language model to pick the agent, and relays the answer.\n\n\
                  Run without arguments to start the server, or use 'init' to scaffold a new project.",
    after_help = "EXAMPLES:\n    \
                  ares-relay init                        # Scaffold relay.toml and a sample registry\n    \
                  ares-relay                             # Start the server (requires relay.toml)\n    \
                  ares-relay agents list                 # Print the registry\n    \
                  ares-relay route \"summarise this\"      # Show which agent would be chosen\n    \
                  ares-relay --config my.toml            # Use a custom config file"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "relay.toml", global = true)]
    pub config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scaffold relay.toml, a sample agent registry and .env.example
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Overwrite existing files
        #[arg(short, long)]
        force: bool,

        /// Oracle provider to configure (gemini or openai)
        #[arg(long, default_value = "gemini")]
        provider: String,

        /// Host address for the server
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port for the server
        #[arg(long, default_value = "8000")]
        port: u16,
    },

    /// Show configuration information
    Config {
        /// Validate the configuration and the agent registry
        #[arg(long)]
        validate: bool,
    },

    /// Inspect the agent registry
    #[command(subcommand)]
    Agents(AgentCommands),

    /// Ask the oracle which agent would handle a query, without dispatching
    Route {
        /// Query text
        query: String,
    },
}

/// Registry inspection subcommands
#[derive(Subcommand, Debug)]
pub enum AgentCommands {
    /// List all registered agents
    List,

    /// Show details for a specific agent
    Show {
        /// Agent identifier
        id: String,
    },
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_command_starts_server() {
        let cli = Cli::try_parse_from(["ares-relay"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.config, PathBuf::from("relay.toml"));
        assert!(!cli.verbose);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["ares-relay", "agents", "list", "--config", "other.toml", "-v"])
                .unwrap();
        assert_eq!(cli.config, PathBuf::from("other.toml"));
        assert!(cli.verbose);
        assert!(matches!(cli.command, Some(Commands::Agents(AgentCommands::List))));
    }

    #[test]
    fn test_route_takes_query() {
        let cli = Cli::try_parse_from(["ares-relay", "route", "write a summary"]).unwrap();
        match cli.command {
            Some(Commands::Route { query }) => assert_eq!(query, "write a summary"),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_agents_show_requires_id() {
        assert!(Cli::try_parse_from(["ares-relay", "agents", "show"]).is_err());
    }
}
