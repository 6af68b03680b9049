use anyhow::Context;
use ares_relay::{
    AppState, CapabilityMatcher, DispatchClient, Oracle, Orchestrator, Provider, RegistryManager,
    agents::{Query, registry::FileRegistrySource},
    app,
    cli::{
        AgentCommands, Cli, Commands,
        init::{self, InitConfig, InitResult},
        output::Output,
    },
    utils::toml_config::RelayConfig,
};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional
    dotenvy::dotenv().ok();

    let cli = Cli::parse_args();
    let output = if cli.no_color {
        Output::no_color()
    } else {
        Output::new()
    };

    match cli.command {
        None => serve(&cli.config, cli.verbose).await,
        Some(Commands::Init {
            path,
            force,
            provider,
            host,
            port,
        }) => {
            let config = InitConfig {
                path,
                force,
                provider,
                host,
                port,
            };
            match init::run(config, &output) {
                InitResult::Success => Ok(()),
                InitResult::AlreadyExists => std::process::exit(1),
                InitResult::Error(e) => anyhow::bail!("init failed: {}", e),
            }
        }
        Some(Commands::Config { validate }) => {
            init_tracing("warn", cli.verbose);
            if validate {
                validate_config(&cli.config, &output).await
            } else {
                show_config(&cli.config, &output)
            }
        }
        Some(Commands::Agents(command)) => {
            init_tracing("warn", cli.verbose);
            agents_command(&cli.config, command, &output).await
        }
        Some(Commands::Route { query }) => {
            init_tracing("warn", cli.verbose);
            route_command(&cli.config, &query, &output).await
        }
    }
}

/// `RUST_LOG` wins over the configured level; `--verbose` forces debug
fn init_tracing(default_level: &str, verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn load_registry(config: &RelayConfig) -> anyhow::Result<Arc<RegistryManager>> {
    let source = Arc::new(FileRegistrySource::new(&config.registry.path));
    let registry = RegistryManager::load(source).await.with_context(|| {
        format!(
            "failed to load agent registry from {}",
            config.registry.path.display()
        )
    })?;
    Ok(Arc::new(registry))
}

fn build_matcher(config: &RelayConfig, http: reqwest::Client) -> anyhow::Result<CapabilityMatcher> {
    let api_key = config.oracle_api_key()?;
    let provider = Provider::from_config(&config.oracle, api_key);
    tracing::info!(
        provider = provider.name(),
        model = provider.model(),
        "Routing oracle configured"
    );

    let oracle: Arc<dyn Oracle> = Arc::from(provider.create_oracle(http));
    Ok(CapabilityMatcher::new(oracle, config.oracle.timeout()))
}

async fn serve(config_path: &Path, verbose: bool) -> anyhow::Result<()> {
    let config = RelayConfig::load(config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;
    init_tracing(&config.server.log_level, verbose);

    let registry = load_registry(&config).await?;
    tracing::info!(
        agents = registry.snapshot().len(),
        path = %config.registry.path.display(),
        "Agent registry loaded"
    );
    if config.registry.watch {
        registry
            .start_watching()
            .context("failed to watch the agent registry")?;
    }

    // One pooled client for both the oracle and the agents
    let http = reqwest::Client::builder()
        .build()
        .context("failed to build HTTP client")?;

    let matcher = build_matcher(&config, http.clone())?;
    let orchestrator = Orchestrator::new(
        registry.clone(),
        matcher,
        DispatchClient::new(http),
        config.dispatch.timeout(),
    );

    let state = AppState {
        config: Arc::new(config.clone()),
        registry: registry.clone(),
        orchestrator: Arc::new(orchestrator),
    };

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {}", address))?;
    tracing::info!("A.R.E.S Relay listening on http://{}", address);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    registry.stop_watching();
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

fn show_config(config_path: &Path, output: &Output) -> anyhow::Result<()> {
    let config = RelayConfig::read(config_path)?;

    output.header("Configuration");
    output.kv("file", &config_path.display().to_string());

    output.subheader("Server");
    output.kv("bind", &config.bind_address());
    output.kv("log_level", &config.server.log_level);

    output.subheader("Registry");
    output.kv("path", &config.registry.path.display().to_string());
    output.kv("watch", &config.registry.watch.to_string());

    output.subheader("Oracle");
    output.kv("provider", &format!("{:?}", config.oracle.provider));
    output.kv("model", config.oracle.model());
    output.kv("base_url", config.oracle.base_url());
    output.kv("api_key_env", config.oracle.api_key_env());
    output.kv("timeout", &format!("{}s", config.oracle.timeout_secs));

    output.subheader("Dispatch");
    output.kv("timeout", &format!("{}s", config.dispatch.timeout_secs));

    output.hint("Run with --validate to check the credential and the registry");
    Ok(())
}

async fn validate_config(config_path: &Path, output: &Output) -> anyhow::Result<()> {
    output.header("Validating configuration");

    let config = match RelayConfig::read(config_path) {
        Ok(config) => config,
        Err(e) => {
            output.error(&e.to_string());
            anyhow::bail!("configuration is invalid");
        }
    };

    let mut failed = false;
    match config.validate() {
        Ok(()) => output.success(&format!("{} is valid", config_path.display())),
        Err(e) => {
            output.error(&e.to_string());
            failed = true;
        }
    }

    match load_registry(&config).await {
        Ok(registry) => output.success(&format!(
            "{} lists {} agent(s)",
            config.registry.path.display(),
            registry.snapshot().len()
        )),
        Err(e) => {
            output.error(&format!("{:#}", e));
            failed = true;
        }
    }

    if failed {
        anyhow::bail!("configuration is invalid");
    }
    output.complete("Configuration OK");
    Ok(())
}

async fn agents_command(
    config_path: &Path,
    command: AgentCommands,
    output: &Output,
) -> anyhow::Result<()> {
    let config = RelayConfig::read(config_path)?;
    let registry = load_registry(&config).await?.snapshot();

    match command {
        AgentCommands::List => {
            output.header("Registered agents");
            let widths = [24, 28, 40];
            output.table_header(&["ID", "Name", "Endpoint"], &widths);
            for agent in registry.iter() {
                output.table_row(&[&agent.id, &agent.name, agent.endpoint.as_str()], &widths);
            }
            output.newline();
        }
        AgentCommands::Show { id } => {
            let agent = registry
                .resolve(&id)
                .with_context(|| format!("agent '{}' is not registered", id))?;
            output.header(&agent.name);
            output.kv("id", &agent.id);
            output.kv("description", &agent.description);
            output.kv("endpoint", agent.endpoint.as_str());
            output.subheader("Capabilities");
            for capability in &agent.capabilities {
                output.list_item(capability);
            }
        }
    }
    Ok(())
}

async fn route_command(config_path: &Path, text: &str, output: &Output) -> anyhow::Result<()> {
    let config = RelayConfig::load(config_path)?;
    let registry = load_registry(&config).await?.snapshot();
    let matcher = build_matcher(&config, reqwest::Client::new())?;
    let query = Query::new(text)?;

    match matcher.select_agent(&query, &registry).await {
        Ok(decision) => {
            output.success(&format!("Routed to {}", decision.agent_id));
            if let Some(rationale) = &decision.rationale {
                output.kv("rationale", rationale);
            }
            output.kv("source", &format!("{:?}", decision.source));
            Ok(())
        }
        Err(e) => {
            output.error(&e.to_string());
            anyhow::bail!("no agent selected")
        }
    }
}
