//! Agent registry for the relay
//!
//! The registry is the catalog of downstream agents the router can choose from.
//! It is read from a [`RegistrySource`] once at startup and is never mutated
//! afterwards: every request works against an immutable `Arc<Registry>` snapshot.
//!
//! ## Source format
//!
//! The file-backed source reads a TOML document with one table per agent. The
//! table key is the agent identifier:
//!
//! ```toml
//! [research_agent]
//! name = "Research Agent"
//! description = "Finds and verifies information"
//! endpoint = "http://localhost:8001/query"
//! capabilities = ["information_retrieval", "fact_checking"]
//! ```
//!
//! ## Reloading
//!
//! [`RegistryManager`] swaps whole snapshots through an `ArcSwap`, so a reload
//! never changes a registry that an in-flight request is already using.

use arc_swap::ArcSwap;
use async_trait::async_trait;
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::RwLock;
use reqwest::Url;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

const REQUIRED_FIELDS: [&str; 4] = ["name", "description", "endpoint", "capabilities"];

/// A single downstream agent as declared in the registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentDescriptor {
    /// Unique key the router answers with
    pub id: String,
    /// Human readable name
    pub name: String,
    pub description: String,
    /// Absolute http(s) address the query is POSTed to
    pub endpoint: Url,
    /// Capability tags, de-duplicated in declaration order. Never empty.
    pub capabilities: Vec<String>,
}

impl AgentDescriptor {
    /// One line summary used in router prompts
    pub fn prompt_line(&self) -> String {
        format!(
            "- {}: {} - {} (Capabilities: {})",
            self.id,
            self.name,
            self.description,
            self.capabilities.join(", ")
        )
    }
}

/// Errors raised while loading a registry. All of them are fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum RegistryLoadError {
    #[error("Failed to read registry source {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse registry: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Registry entry '{0}' must be a table")]
    NotATable(String),

    #[error("Registry entry '{agent}' is missing required key '{field}'")]
    MissingField { agent: String, field: &'static str },

    #[error("Registry entry '{agent}' has an invalid '{field}': {reason}")]
    InvalidField {
        agent: String,
        field: &'static str,
        reason: String,
    },

    #[error("Registry entry '{agent}' has an invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint {
        agent: String,
        endpoint: String,
        reason: String,
    },

    #[error("Registry identifiers '{0}' and '{1}' differ only by case")]
    DuplicateIdentifier(String, String),

    #[error("Registry does not declare any agents")]
    Empty,
}

/// Immutable mapping from identifier to [`AgentDescriptor`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registry {
    agents: BTreeMap<String, AgentDescriptor>,
}

impl Registry {
    /// Parse a registry from its TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, RegistryLoadError> {
        let table: toml::Table = toml::from_str(content)?;

        let mut agents = BTreeMap::new();
        for (id, value) in table {
            let descriptor = parse_descriptor(&id, value)?;
            agents.insert(id, descriptor);
        }

        Self::from_descriptors(agents.into_values())
    }

    /// Build a registry from already constructed descriptors
    pub fn from_descriptors<I>(descriptors: I) -> Result<Self, RegistryLoadError>
    where
        I: IntoIterator<Item = AgentDescriptor>,
    {
        let mut agents: BTreeMap<String, AgentDescriptor> = BTreeMap::new();
        let mut folded: BTreeMap<String, String> = BTreeMap::new();

        for descriptor in descriptors {
            if descriptor.capabilities.is_empty() {
                return Err(RegistryLoadError::InvalidField {
                    agent: descriptor.id,
                    field: "capabilities",
                    reason: "at least one capability is required".to_string(),
                });
            }
            let key = descriptor.id.to_ascii_lowercase();
            if let Some(existing) = folded.insert(key, descriptor.id.clone()) {
                return Err(RegistryLoadError::DuplicateIdentifier(existing, descriptor.id));
            }
            agents.insert(descriptor.id.clone(), descriptor);
        }

        if agents.is_empty() {
            return Err(RegistryLoadError::Empty);
        }

        Ok(Self { agents })
    }

    /// Look up an agent by its exact identifier
    pub fn get(&self, id: &str) -> Option<&AgentDescriptor> {
        self.agents.get(id)
    }

    /// Look up an agent by identifier, falling back to a case-insensitive match.
    ///
    /// Identifiers are unique case-insensitively, so the fallback is never ambiguous.
    pub fn resolve(&self, name: &str) -> Option<&AgentDescriptor> {
        self.agents.get(name).or_else(|| {
            self.agents
                .values()
                .find(|agent| agent.id.eq_ignore_ascii_case(name))
        })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.agents.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// The only agent, when the registry has exactly one
    pub fn single(&self) -> Option<&AgentDescriptor> {
        if self.agents.len() == 1 {
            self.agents.values().next()
        } else {
            None
        }
    }

    /// Identifiers in sorted order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.agents.keys().map(String::as_str)
    }

    /// Descriptors in identifier order
    pub fn iter(&self) -> impl Iterator<Item = &AgentDescriptor> {
        self.agents.values()
    }
}

fn parse_descriptor(id: &str, value: toml::Value) -> Result<AgentDescriptor, RegistryLoadError> {
    if id.trim().is_empty() {
        return Err(RegistryLoadError::InvalidField {
            agent: id.to_string(),
            field: "identifier",
            reason: "identifier must not be blank".to_string(),
        });
    }

    let toml::Value::Table(mut section) = value else {
        return Err(RegistryLoadError::NotATable(id.to_string()));
    };

    for field in REQUIRED_FIELDS {
        if !section.contains_key(field) {
            return Err(RegistryLoadError::MissingField {
                agent: id.to_string(),
                field,
            });
        }
    }

    let name = take_string(id, &mut section, "name")?;
    let description = take_string(id, &mut section, "description")?;
    let endpoint_raw = take_string(id, &mut section, "endpoint")?;
    let endpoint = parse_endpoint(id, &endpoint_raw)?;
    let capabilities = take_capabilities(id, &mut section)?;

    if !section.is_empty() {
        let extra: Vec<&str> = section.keys().map(String::as_str).collect();
        warn!(agent = id, "Ignoring unknown registry keys: {}", extra.join(", "));
    }

    Ok(AgentDescriptor {
        id: id.to_string(),
        name,
        description,
        endpoint,
        capabilities,
    })
}

fn take_string(
    agent: &str,
    section: &mut toml::Table,
    field: &'static str,
) -> Result<String, RegistryLoadError> {
    match section.remove(field) {
        Some(toml::Value::String(value)) if !value.trim().is_empty() => {
            Ok(value.trim().to_string())
        }
        Some(toml::Value::String(_)) => Err(RegistryLoadError::InvalidField {
            agent: agent.to_string(),
            field,
            reason: "value must not be blank".to_string(),
        }),
        Some(other) => Err(RegistryLoadError::InvalidField {
            agent: agent.to_string(),
            field,
            reason: format!("expected a string, found {}", other.type_str()),
        }),
        None => Err(RegistryLoadError::MissingField {
            agent: agent.to_string(),
            field,
        }),
    }
}

fn take_capabilities(
    agent: &str,
    section: &mut toml::Table,
) -> Result<Vec<String>, RegistryLoadError> {
    let invalid = |reason: String| RegistryLoadError::InvalidField {
        agent: agent.to_string(),
        field: "capabilities",
        reason,
    };

    let items = match section.remove("capabilities") {
        Some(toml::Value::Array(items)) => items,
        Some(other) => {
            return Err(invalid(format!(
                "expected a list of strings, found {}",
                other.type_str()
            )));
        }
        None => {
            return Err(RegistryLoadError::MissingField {
                agent: agent.to_string(),
                field: "capabilities",
            });
        }
    };

    let mut capabilities: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        let toml::Value::String(tag) = item else {
            return Err(invalid(format!(
                "expected a list of strings, found {} in list",
                item.type_str()
            )));
        };
        let tag = tag.trim();
        if tag.is_empty() {
            return Err(invalid("capability tags must not be blank".to_string()));
        }
        if !capabilities.iter().any(|existing| existing == tag) {
            capabilities.push(tag.to_string());
        }
    }

    if capabilities.is_empty() {
        return Err(invalid("at least one capability is required".to_string()));
    }

    Ok(capabilities)
}

fn parse_endpoint(agent: &str, raw: &str) -> Result<Url, RegistryLoadError> {
    let invalid = |reason: String| RegistryLoadError::InvalidEndpoint {
        agent: agent.to_string(),
        endpoint: raw.to_string(),
        reason,
    };

    let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(invalid("missing host".to_string()));
    }
    Ok(url)
}

// ============= Registry Sources =============

/// Where registries come from.
///
/// The static file is one implementation; a service-discovery backend can
/// implement the same trait without touching the router or dispatch client.
#[async_trait]
pub trait RegistrySource: Send + Sync {
    /// Load a fresh registry
    async fn load(&self) -> Result<Registry, RegistryLoadError>;

    /// Human readable description for logs
    fn describe(&self) -> String;

    /// File to watch for changes, if the source is file-backed
    fn watch_path(&self) -> Option<&Path> {
        None
    }
}

/// Registry read from a TOML file on disk
#[derive(Debug, Clone)]
pub struct FileRegistrySource {
    path: PathBuf,
}

impl FileRegistrySource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RegistrySource for FileRegistrySource {
    async fn load(&self) -> Result<Registry, RegistryLoadError> {
        let content =
            tokio::fs::read_to_string(&self.path)
                .await
                .map_err(|source| RegistryLoadError::Read {
                    path: self.path.clone(),
                    source,
                })?;
        Registry::from_toml_str(&content)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn watch_path(&self) -> Option<&Path> {
        Some(&self.path)
    }
}

/// Registry parsed from text held in memory
#[derive(Debug, Clone)]
pub struct StaticRegistrySource {
    content: String,
}

impl StaticRegistrySource {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

#[async_trait]
impl RegistrySource for StaticRegistrySource {
    async fn load(&self) -> Result<Registry, RegistryLoadError> {
        Registry::from_toml_str(&self.content)
    }

    fn describe(&self) -> String {
        "in-memory registry".to_string()
    }
}

// ============= Registry Manager =============

/// Holds the current registry snapshot and reloads it from its source
pub struct RegistryManager {
    current: Arc<ArcSwap<Registry>>,
    source: Arc<dyn RegistrySource>,
    watcher: RwLock<Option<RecommendedWatcher>>,
}

impl RegistryManager {
    /// Load the initial registry from `source`
    pub async fn load(source: Arc<dyn RegistrySource>) -> Result<Self, RegistryLoadError> {
        let registry = source.load().await?;
        info!(
            "Loaded {} agent(s) from {}",
            registry.len(),
            source.describe()
        );

        Ok(Self {
            current: Arc::new(ArcSwap::from_pointee(registry)),
            source,
            watcher: RwLock::new(None),
        })
    }

    /// Wrap an already loaded registry. Reloading it is a no-op.
    pub fn from_registry(registry: Registry) -> Self {
        Self {
            current: Arc::new(ArcSwap::from_pointee(registry.clone())),
            source: Arc::new(FixedRegistrySource(registry)),
            watcher: RwLock::new(None),
        }
    }

    /// Current snapshot (lockless read)
    pub fn snapshot(&self) -> Arc<Registry> {
        self.current.load_full()
    }

    /// Reload from the source. On failure the previous registry stays active.
    pub async fn reload(&self) -> Result<(), RegistryLoadError> {
        reload_into(&self.current, self.source.as_ref()).await
    }

    /// Watch the source file and reload on change
    pub fn start_watching(&self) -> Result<(), notify::Error> {
        let Some(path) = self.source.watch_path().map(Path::to_path_buf) else {
            warn!(
                "Registry source {} cannot be watched",
                self.source.describe()
            );
            return Ok(());
        };

        let (tx, mut rx) = mpsc::unbounded_channel::<()>();
        let file_name = path.file_name().map(|name| name.to_os_string());

        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            match res {
                Ok(event) => {
                    let touches_registry = event
                        .paths
                        .iter()
                        .any(|p| p.file_name().map(|n| n.to_os_string()) == file_name);
                    if touches_registry && (event.kind.is_modify() || event.kind.is_create()) {
                        let _ = tx.send(());
                    }
                }
                Err(e) => {
                    error!("Registry watcher error: {:?}", e);
                }
            }
        })?;

        let parent = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        watcher.watch(parent, RecursiveMode::NonRecursive)?;
        *self.watcher.write() = Some(watcher);

        let current = Arc::clone(&self.current);
        let source = Arc::clone(&self.source);
        tokio::spawn(async move {
            let debounce = Duration::from_millis(500);

            while rx.recv().await.is_some() {
                // Editors emit bursts of events per save
                tokio::time::sleep(debounce).await;
                while rx.try_recv().is_ok() {}

                if let Err(e) = reload_into(&current, source.as_ref()).await {
                    warn!("Failed to hot-reload registry: {}. Keeping previous registry.", e);
                }
            }
        });

        info!("Registry hot-reload watcher started for {}", path.display());
        Ok(())
    }

    /// Stop watching for registry changes
    pub fn stop_watching(&self) {
        *self.watcher.write() = None;
        info!("Registry hot-reload watcher stopped");
    }
}

async fn reload_into(
    current: &ArcSwap<Registry>,
    source: &dyn RegistrySource,
) -> Result<(), RegistryLoadError> {
    info!("Reloading registry from {}", source.describe());
    let registry = source.load().await?;
    info!("Registry reloaded with {} agent(s)", registry.len());
    current.store(Arc::new(registry));
    Ok(())
}

/// Source used by [`RegistryManager::from_registry`]
struct FixedRegistrySource(Registry);

#[async_trait]
impl RegistrySource for FixedRegistrySource {
    async fn load(&self) -> Result<Registry, RegistryLoadError> {
        Ok(self.0.clone())
    }

    fn describe(&self) -> String {
        "fixed registry".to_string()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const TWO_AGENT_REGISTRY: &str = r#"
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
"#;

    #[test]
    fn test_parse_two_agent_registry() {
        let registry = Registry::from_toml_str(TWO_AGENT_REGISTRY).unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(
            registry.ids().collect::<Vec<_>>(),
            vec!["content_writing_agent", "research_agent"]
        );

        let research = registry.get("research_agent").unwrap();
        assert_eq!(research.name, "Research Agent");
        assert_eq!(research.endpoint.as_str(), "http://localhost:8001/query");
        assert_eq!(research.capabilities.len(), 4);
        assert!(registry.single().is_none());
    }

    #[test]
    fn test_missing_required_key() {
        let content = r#"
[research_agent]
name = "Research Agent"
endpoint = "http://localhost:8001/query"
capabilities = ["information_retrieval"]
"#;
        let err = Registry::from_toml_str(content).unwrap_err();
        assert!(matches!(
            err,
            RegistryLoadError::MissingField { ref agent, field: "description" } if agent == "research_agent"
        ));
    }

    #[test]
    fn test_invalid_endpoint_rejected() {
        for endpoint in ["not a url", "ftp://localhost/query", "localhost:8001/query"] {
            let content = format!(
                r#"
[a]
name = "A"
description = "d"
endpoint = "{endpoint}"
capabilities = ["x"]
"#
            );
            let err = Registry::from_toml_str(&content).unwrap_err();
            assert!(
                matches!(err, RegistryLoadError::InvalidEndpoint { .. }),
                "{endpoint} should be rejected, got {err:?}"
            );
        }
    }

    #[test]
    fn test_empty_capabilities_rejected() {
        let content = r#"
[a]
name = "A"
description = "d"
endpoint = "http://localhost:1/query"
capabilities = []
"#;
        let err = Registry::from_toml_str(content).unwrap_err();
        assert!(matches!(
            err,
            RegistryLoadError::InvalidField {
                field: "capabilities",
                ..
            }
        ));
    }

    #[test]
    fn test_capabilities_must_be_strings() {
        let content = r#"
[a]
name = "A"
description = "d"
endpoint = "http://localhost:1/query"
capabilities = ["x", 3]
"#;
        assert!(Registry::from_toml_str(content).is_err());
    }

    #[test]
    fn test_duplicate_capabilities_collapsed() {
        let content = r#"
[a]
name = "A"
description = "d"
endpoint = "http://localhost:1/query"
capabilities = ["x", "y", "x"]
"#;
        let registry = Registry::from_toml_str(content).unwrap();
        assert_eq!(registry.get("a").unwrap().capabilities, vec!["x", "y"]);
    }

    #[test]
    fn test_duplicate_table_is_parse_error() {
        let content = r#"
[a]
name = "A"
description = "d"
endpoint = "http://localhost:1/query"
capabilities = ["x"]

[a]
name = "B"
description = "d"
endpoint = "http://localhost:2/query"
capabilities = ["y"]
"#;
        assert!(matches!(
            Registry::from_toml_str(content),
            Err(RegistryLoadError::Parse(_))
        ));
    }

    #[test]
    fn test_case_insensitive_duplicate_rejected() {
        let content = r#"
[Research]
name = "A"
description = "d"
endpoint = "http://localhost:1/query"
capabilities = ["x"]

[research]
name = "B"
description = "d"
endpoint = "http://localhost:2/query"
capabilities = ["y"]
"#;
        assert!(matches!(
            Registry::from_toml_str(content),
            Err(RegistryLoadError::DuplicateIdentifier(_, _))
        ));
    }

    #[test]
    fn test_empty_registry_rejected() {
        assert!(matches!(
            Registry::from_toml_str(""),
            Err(RegistryLoadError::Empty)
        ));
    }

    #[test]
    fn test_resolve_is_case_insensitive() {
        let registry = Registry::from_toml_str(TWO_AGENT_REGISTRY).unwrap();
        assert_eq!(
            registry.resolve("Research_Agent").map(|a| a.id.as_str()),
            Some("research_agent")
        );
        assert!(registry.resolve("finance_agent").is_none());
    }

    #[test]
    fn test_prompt_line() {
        let registry = Registry::from_toml_str(TWO_AGENT_REGISTRY).unwrap();
        let line = registry.get("content_writing_agent").unwrap().prompt_line();
        assert!(line.starts_with("- content_writing_agent: Content Writing Agent - "));
        assert!(line.ends_with(
            "(Capabilities: content_creation, editing, style_adaptation, summarization)"
        ));
    }

    #[tokio::test]
    async fn test_manager_reload_keeps_previous_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agent_registry.toml");
        std::fs::write(&path, TWO_AGENT_REGISTRY).unwrap();

        let manager = RegistryManager::load(Arc::new(FileRegistrySource::new(&path)))
            .await
            .unwrap();
        let before = manager.snapshot();

        std::fs::write(&path, "[broken]\nname = \"B\"\n").unwrap();
        assert!(matches!(
            manager.reload().await,
            Err(RegistryLoadError::MissingField { .. })
        ));
        assert_eq!(*manager.snapshot(), *before);
    }

    #[tokio::test]
    async fn test_manager_reload_swaps_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agent_registry.toml");
        std::fs::write(&path, TWO_AGENT_REGISTRY).unwrap();

        let manager = RegistryManager::load(Arc::new(FileRegistrySource::new(&path)))
            .await
            .unwrap();
        let held = manager.snapshot();

        let single = r#"
[research_agent]
name = "Research Agent"
description = "Finds things"
endpoint = "http://localhost:8001/query"
capabilities = ["information_retrieval"]
"#;
        std::fs::write(&path, single).unwrap();
        manager.reload().await.unwrap();

        assert_eq!(manager.snapshot().len(), 1);
        // Snapshots taken before the reload are untouched
        assert_eq!(held.len(), 2);
    }

    #[tokio::test]
    async fn test_missing_file_is_read_error() {
        let source = FileRegistrySource::new("/nonexistent/agent_registry.toml");
        assert!(matches!(
            source.load().await,
            Err(RegistryLoadError::Read { .. })
        ));
    }

    #[tokio::test]
    async fn test_static_source_loads_identically_twice() {
        let source = StaticRegistrySource::new(TWO_AGENT_REGISTRY);
        let first = source.load().await.unwrap();
        let second = source.load().await.unwrap();
        assert_eq!(first, second);
    }
}
