//! Router configuration and plan types

use crate::retry::RetryConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Role used when a requested role has no spec of its own
pub const DEFAULT_ROLE: &str = "default";

/// Model used when nothing at all is configured
pub const HARD_DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Model selection for one role
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleModelSpec {
    /// Primary model id
    pub model: String,
    /// Ordered fallback model ids
    #[serde(default)]
    pub fallback: Vec<String>,
    /// Temperature override for this role
    #[serde(default)]
    pub temperature: Option<f32>,
    /// Max tokens override for this role
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

impl RoleModelSpec {
    /// Spec with a primary model and no fallback
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            fallback: Vec::new(),
            temperature: None,
            max_tokens: None,
        }
    }

    /// Append a fallback model
    #[must_use]
    pub fn with_fallback(mut self, model: impl Into<String>) -> Self {
        self.fallback.push(model.into());
        self
    }

    /// Set temperature override
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set max tokens override
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Router settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Model used when no role spec applies
    pub default_model: String,
    /// Global default temperature
    pub temperature: f32,
    /// Global default max tokens
    pub max_tokens: u32,
    /// Models appended after every role's own chain
    pub fallback_models: Vec<String>,
    /// Per-role model specs
    pub role_models: HashMap<String, RoleModelSpec>,
    /// Backoff for transient failures
    pub retry: RetryConfig,
    /// Per-attempt timeout in seconds (0 = none)
    pub call_timeout_secs: u64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            default_model: HARD_DEFAULT_MODEL.to_string(),
            temperature: 0.1,
            max_tokens: 4096,
            fallback_models: Vec::new(),
            role_models: HashMap::new(),
            retry: RetryConfig::default(),
            call_timeout_secs: 120,
        }
    }
}

impl RouterConfig {
    /// Add a role spec
    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>, spec: RoleModelSpec) -> Self {
        self.role_models.insert(role.into(), spec);
        self
    }

    /// Set retry policy
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Set the global default model
    #[must_use]
    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    /// Set global fallback models
    #[must_use]
    pub fn with_fallback_models(mut self, models: Vec<String>) -> Self {
        self.fallback_models = models;
        self
    }
}

/// Per-call overrides, usually from an agent's configuration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelOverrides {
    /// Explicit model; becomes the only candidate
    pub model: Option<String>,
    /// Temperature override
    pub temperature: Option<f32>,
    /// Max tokens override
    pub max_tokens: Option<u32>,
}

impl ModelOverrides {
    /// No overrides
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Force temperature
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Force max tokens
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// One concrete model with its resolved sampling parameters
#[derive(Debug, Clone, PartialEq)]
pub struct ModelCandidate {
    /// Full model id, including any client prefix
    pub model: String,
    /// Resolved temperature
    pub temperature: f32,
    /// Resolved max tokens
    pub max_tokens: u32,
}

/// Ordered candidates for one role
#[derive(Debug, Clone, PartialEq)]
pub struct ModelPlan {
    /// Role the plan was resolved for
    pub role: String,
    /// Candidates in attempt order, never empty
    pub candidates: Vec<ModelCandidate>,
}

impl ModelPlan {
    /// Model ids in attempt order
    #[must_use]
    pub fn models(&self) -> Vec<&str> {
        self.candidates.iter().map(|c| c.model.as_str()).collect()
    }

    /// Primary model id
    #[must_use]
    pub fn primary(&self) -> Option<&str> {
        self.candidates.first().map(|c| c.model.as_str())
    }
}
