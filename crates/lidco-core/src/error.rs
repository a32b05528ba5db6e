//! Error types for lidco-core
//!
//! Agent runs do not fail through this type: a failed run still produces an
//! [`crate::AgentResponse`] carrying a [`crate::RunFailure`]. Callers of the
//! orchestrator only see [`Error::Configuration`]; the rest are used inside
//! loaders and stores and are logged where they are recovered.

use thiserror::Error;

/// Core error type
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid configuration (no agents, unknown agent, bad provider setup)
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The routing model replied with something that is not an agent name
    #[error("routing ambiguous: model replied '{0}'")]
    RoutingAmbiguous(String),

    /// Agent definition file could not be used
    #[error("invalid agent file {path}: {message}")]
    AgentFile {
        /// File path
        path: String,
        /// What was wrong
        message: String,
    },

    /// Memory store failure
    #[error("memory error: {0}")]
    Memory(String),

    /// LLM error
    #[error("llm error: {0}")]
    Llm(#[from] lidco_llm::Error),

    /// Tool error
    #[error("tool error: {0}")]
    Tool(#[from] lidco_tools::Error),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Background task failed
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether this error should be shown to the caller rather than
    /// recovered internally
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
