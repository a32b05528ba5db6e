//! Runtime configuration types
//!
//! Every field has a default so a partial file (or none at all) yields a
//! working configuration. Loading from disk and the environment is done by
//! the binary; this module only describes the shape.

use lidco_llm::RouterConfig;
use lidco_tools::PermissionPolicy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LidcoConfig {
    /// Model routing and providers
    pub llm: LlmConfig,
    /// Agent and orchestrator behavior
    pub agents: AgentsConfig,
    /// Tool permission lists
    #[serde(default = "PermissionPolicy::standard")]
    pub permissions: PermissionPolicy,
    /// Persistent memory
    pub memory: MemoryConfig,
    /// HTTP server
    pub server: ServerConfig,
}

impl Default for LidcoConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig::default(),
            agents: AgentsConfig::default(),
            permissions: PermissionPolicy::standard(),
            memory: MemoryConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

// ============================================================================
// LLM
// ============================================================================

/// Model router settings plus the clients to build
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Router settings (default model, role models, retry, timeouts)
    #[serde(flatten)]
    pub router: RouterConfig,
    /// OpenAI-compatible endpoints keyed by model-id prefix
    #[serde(default = "default_providers")]
    pub providers: BTreeMap<String, ProviderSettings>,
    /// Session-wide token limit for warnings (0 = unlimited)
    #[serde(default)]
    pub session_token_limit: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            router: RouterConfig::default(),
            providers: default_providers(),
            session_token_limit: 0,
        }
    }
}

/// One OpenAI-compatible endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// API base URL, e.g. `https://api.openai.com/v1`
    pub base_url: String,
    /// Environment variable holding the API key
    #[serde(default)]
    pub api_key_env: Option<String>,
}

impl ProviderSettings {
    /// Create provider settings
    #[must_use]
    pub fn new(base_url: impl Into<String>, api_key_env: Option<&str>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key_env: api_key_env.map(String::from),
        }
    }

    /// Read the API key from the environment, if configured and set
    #[must_use]
    pub fn api_key(&self) -> Option<String> {
        self.api_key_env
            .as_deref()
            .and_then(|var| std::env::var(var).ok())
            .filter(|key| !key.is_empty())
    }
}

fn default_providers() -> BTreeMap<String, ProviderSettings> {
    let mut providers = BTreeMap::new();
    providers.insert(
        String::new(),
        ProviderSettings::new(lidco_llm::openai::OPENAI_API_BASE, Some("OPENAI_API_KEY")),
    );
    providers.insert(
        "openai/".to_string(),
        ProviderSettings::new(lidco_llm::openai::OPENAI_API_BASE, Some("OPENAI_API_KEY")),
    );
    providers.insert(
        "groq/".to_string(),
        ProviderSettings::new("https://api.groq.com/openai/v1", Some("GROQ_API_KEY")),
    );
    providers.insert(
        "openrouter/".to_string(),
        ProviderSettings::new("https://openrouter.ai/api/v1", Some("OPENROUTER_API_KEY")),
    );
    providers.insert(
        "ollama/".to_string(),
        ProviderSettings::new("http://localhost:11434/v1", None),
    );
    providers
}

// ============================================================================
// Agents
// ============================================================================

/// Agent and orchestrator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentsConfig {
    /// Agent used when routing finds nothing better
    #[serde(default = "default_agent")]
    pub default_agent: String,
    /// Iteration budget for agents that do not set their own
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    /// Wall-clock budget per run in seconds (0 = unlimited)
    #[serde(default = "default_max_execution_secs")]
    pub max_execution_secs: u64,
    /// Conversation turns kept per session
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    /// Most recent turns replayed into each run
    #[serde(default = "default_history_window")]
    pub history_window: usize,
    /// Per-file character cap for context files
    #[serde(default = "default_max_file_chars")]
    pub max_file_chars: usize,
    /// Load agent definitions from YAML files
    #[serde(default = "default_true")]
    pub load_agent_files: bool,
}

fn default_agent() -> String {
    "coder".to_string()
}

fn default_max_iterations() -> u32 {
    200
}

fn default_max_execution_secs() -> u64 {
    300
}

fn default_history_limit() -> usize {
    100
}

fn default_history_window() -> usize {
    10
}

fn default_max_file_chars() -> usize {
    20_000
}

fn default_true() -> bool {
    true
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            default_agent: default_agent(),
            max_iterations: default_max_iterations(),
            max_execution_secs: default_max_execution_secs(),
            history_limit: default_history_limit(),
            history_window: default_history_window(),
            max_file_chars: default_max_file_chars(),
            load_agent_files: true,
        }
    }
}

// ============================================================================
// Memory
// ============================================================================

/// Persistent memory settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Enable the JSON memory store
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Maximum stored entries; the oldest are evicted
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
    /// Store location (default `<project>/.lidco/memory.json`)
    #[serde(default)]
    pub path: Option<PathBuf>,
}

fn default_max_entries() -> usize {
    500
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: default_max_entries(),
            path: None,
        }
    }
}

// ============================================================================
// Server
// ============================================================================

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "default_host")]
    pub host: String,
    /// Port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8321
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}
