//! Agent Configuration
//!
//! Immutable description of one agent: prompt, model preferences, tool
//! subset and iteration budget.

use lidco_llm::ModelOverrides;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Iteration budget used when nothing else is configured
pub const DEFAULT_MAX_ITERATIONS: u32 = 200;

/// Context window assumed when an agent does not declare one, in tokens
pub const DEFAULT_CONTEXT_WINDOW: usize = 128_000;

/// Tools that never change the project
pub const READ_ONLY_TOOLS: &[&str] = &["file_read", "glob", "grep", "git"];

/// Where an agent definition came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "path", rename_all = "lowercase")]
pub enum AgentSource {
    /// Compiled into the binary
    Builtin,
    /// Loaded from a YAML file
    File(PathBuf),
}

impl std::fmt::Display for AgentSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Builtin => write!(f, "builtin"),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Agent configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Unique agent name (e.g., "coder", "reviewer")
    pub name: String,
    /// One-line description, shown to the routing model
    pub description: String,
    /// System prompt template; `{agent_name}` is substituted
    pub system_prompt: String,
    /// Explicit model; disables role-based fallback
    pub model: Option<String>,
    /// Model role used for resolution
    pub role: String,
    /// Temperature override
    pub temperature: Option<f32>,
    /// Response token cap override
    pub max_tokens: Option<u32>,
    /// Allowed tool names (empty = all)
    pub tools: Vec<String>,
    /// Model calls allowed per run (at least 1)
    pub max_iterations: u32,
    /// Estimated context window of the agent's model, in tokens
    pub context_window: usize,
    /// Origin of the definition
    pub source: AgentSource,
}

impl AgentConfig {
    /// Create a builtin agent config; the role defaults to the name
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        system_prompt: impl Into<String>,
    ) -> Self {
        let name = name.into();
        Self {
            role: name.clone(),
            name,
            description: description.into(),
            system_prompt: system_prompt.into(),
            model: None,
            temperature: None,
            max_tokens: None,
            tools: Vec::new(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            context_window: DEFAULT_CONTEXT_WINDOW,
            source: AgentSource::Builtin,
        }
    }

    /// Pin a model
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the model role
    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = role.into();
        self
    }

    /// Set temperature
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set max response tokens
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Restrict tools
    #[must_use]
    pub fn with_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tools = tools.into_iter().map(Into::into).collect();
        self
    }

    /// Set the iteration budget (clamped to at least 1)
    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    /// Set the context window estimate (clamped to at least 1024 tokens)
    #[must_use]
    pub fn with_context_window(mut self, tokens: usize) -> Self {
        self.context_window = tokens.max(1024);
        self
    }

    /// Record the definition's origin
    #[must_use]
    pub fn with_source(mut self, source: AgentSource) -> Self {
        self.source = source;
        self
    }

    /// Check if a tool is allowed
    #[must_use]
    pub fn allows_tool(&self, tool_name: &str) -> bool {
        self.tools.is_empty() || self.tools.iter().any(|t| t == tool_name)
    }

    /// Overrides passed to the model router
    #[must_use]
    pub fn model_overrides(&self) -> ModelOverrides {
        ModelOverrides {
            model: self.model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    /// System message text: rendered prompt followed by injected context
    #[must_use]
    pub fn render_system_prompt(&self, context: &str) -> String {
        let prompt = self.system_prompt.replace("{agent_name}", &self.name);
        if context.trim().is_empty() {
            prompt
        } else {
            format!("{}\n\n# Context\n\n{}", prompt.trim_end(), context.trim())
        }
    }
}
