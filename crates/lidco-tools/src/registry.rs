//! Registry - tool registration and the execution contract
//!
//! Tools are registered once at startup and the registry is then shared
//! read-only. [`ToolRegistry::execute`] never fails: unknown tools, schema
//! mismatches, permission denials, timeouts and errors raised inside a tool
//! all come back as a [`ToolResult`] with `is_error` set, so the agent loop
//! can hand them to the model as data.

use crate::error::{Error, Result};
use crate::permission::{Approver, PermissionDecision, PermissionGate, PermissionPolicy};
use crate::schema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// Message returned to the model when a call is refused
pub const DENIED_MESSAGE: &str = "Operation denied by user";

/// Risk level of a tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    /// Read-only
    Low,
    /// Writes inside the project
    Medium,
    /// Arbitrary command execution
    High,
}

impl RiskLevel {
    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// Whether the permission gate should ask before running
    #[must_use]
    pub fn requires_confirmation(&self) -> bool {
        !matches!(self, Self::Low)
    }

    /// Whether the tool only reads
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        matches!(self, Self::Low)
    }
}

/// Tool metadata and argument schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique tool name
    pub name: String,
    /// Description shown to the model
    pub description: String,
    /// JSON schema for the arguments object
    pub parameters: serde_json::Value,
    /// Risk level
    pub risk_level: RiskLevel,
}

impl ToolDefinition {
    /// Create a low-risk definition with an empty object schema
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
            risk_level: RiskLevel::Low,
        }
    }

    /// Set the parameters schema
    #[must_use]
    pub fn with_parameters(mut self, parameters: serde_json::Value) -> Self {
        self.parameters = parameters;
        self
    }

    /// Set the risk level
    #[must_use]
    pub fn with_risk_level(mut self, risk_level: RiskLevel) -> Self {
        self.risk_level = risk_level;
        self
    }

    /// Model-facing definition
    #[must_use]
    pub fn to_llm(&self) -> lidco_llm::ToolDefinition {
        lidco_llm::ToolDefinition::new(&self.name, &self.description, self.parameters.clone())
    }
}

/// Why a tool call failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolFailureKind {
    /// No tool with that name
    UnknownTool,
    /// Arguments rejected by the schema; the tool was not invoked
    InvalidArguments,
    /// The permission gate or approver refused
    PermissionDenied,
    /// The tool ran and reported an error, or timed out
    ExecutionFailure,
}

/// Outcome of one tool call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Tool output, or the error message when `is_error` is set
    pub output: String,
    /// Whether the call failed
    pub is_error: bool,
    /// Failure classification
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<ToolFailureKind>,
    /// Wall time spent in the call
    pub duration_ms: u64,
}

impl ToolResult {
    /// Successful result
    #[must_use]
    pub fn success(output: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            output: output.into(),
            is_error: false,
            failure: None,
            duration_ms,
        }
    }

    /// Failed result
    #[must_use]
    pub fn failure(kind: ToolFailureKind, message: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            output: message.into(),
            is_error: true,
            failure: Some(kind),
            duration_ms,
        }
    }

    fn from_error(err: &Error, duration_ms: u64) -> Self {
        let kind = match err {
            Error::NotFound(_) => ToolFailureKind::UnknownTool,
            Error::InvalidArguments(_) => ToolFailureKind::InvalidArguments,
            Error::PermissionDenied(_) => ToolFailureKind::PermissionDenied,
            Error::Execution(_) | Error::Timeout(_) | Error::Io(_) => {
                ToolFailureKind::ExecutionFailure
            }
        };
        let message = match kind {
            ToolFailureKind::PermissionDenied => DENIED_MESSAGE.to_string(),
            _ => err.to_string(),
        };
        Self::failure(kind, message, duration_ms)
    }
}

/// Trait for tool implementations
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    /// Tool definition
    fn definition(&self) -> &ToolDefinition;

    /// Run with already-validated arguments and return the text output
    async fn execute(&self, args: serde_json::Value) -> Result<String>;
}

/// Named tools plus the policy used to run them
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
    gate: Arc<dyn PermissionGate>,
    approver: Option<Arc<dyn Approver>>,
    timeout: Duration,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    /// Empty registry with a permissive gate and a 60s tool timeout
    #[must_use]
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
            gate: Arc::new(PermissionPolicy::permissive()),
            approver: None,
            timeout: Duration::from_secs(60),
        }
    }

    /// Set the permission gate
    #[must_use]
    pub fn with_permission_gate(mut self, gate: Arc<dyn PermissionGate>) -> Self {
        self.gate = gate;
        self
    }

    /// Set the approver used for `Ask` decisions
    #[must_use]
    pub fn with_approver(mut self, approver: Arc<dyn Approver>) -> Self {
        self.approver = Some(approver);
        self
    }

    /// Set the per-call timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Register a tool; a later registration under the same name replaces it
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.definition().name.clone();
        if self.tools.insert(name.clone(), tool).is_some() {
            debug!(tool = %name, "Replacing tool");
        } else {
            debug!(tool = %name, "Registering tool");
        }
    }

    /// Get a tool by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Check if a tool exists
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Tool names in sorted order
    #[must_use]
    pub fn list_names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    /// Definitions in name order
    #[must_use]
    pub fn definitions(&self) -> Vec<&ToolDefinition> {
        self.tools.values().map(|t| t.definition()).collect()
    }

    /// Model-facing definitions, optionally restricted to `allowed`.
    ///
    /// An empty `allowed` slice means every tool.
    #[must_use]
    pub fn llm_definitions(&self, allowed: &[String]) -> Vec<lidco_llm::ToolDefinition> {
        self.tools
            .values()
            .map(|t| t.definition())
            .filter(|d| allowed.is_empty() || allowed.iter().any(|a| *a == d.name))
            .map(ToolDefinition::to_llm)
            .collect()
    }

    /// Number of tools
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if registry is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Validate, gate and run a tool. Never returns an error.
    #[instrument(skip(self, args), fields(tool = %name))]
    pub async fn execute(&self, name: &str, args: serde_json::Value) -> ToolResult {
        let start = Instant::now();
        let result = self.execute_inner(name, args).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(output) => {
                info!(tool = %name, duration_ms, "Tool completed");
                ToolResult::success(output, duration_ms)
            }
            Err(e) => {
                warn!(tool = %name, duration_ms, error = %e, "Tool failed");
                ToolResult::from_error(&e, duration_ms)
            }
        }
    }

    async fn execute_inner(&self, name: &str, args: serde_json::Value) -> Result<String> {
        let tool = self
            .get(name)
            .ok_or_else(|| Error::NotFound(name.to_string()))?;
        let definition = tool.definition();

        schema::validate(&definition.parameters, &args)?;

        match self.gate.check(definition, &args).await {
            PermissionDecision::Allow => {}
            PermissionDecision::Deny => {
                return Err(Error::PermissionDenied(name.to_string()));
            }
            PermissionDecision::Ask => {
                let approved = match &self.approver {
                    Some(approver) => approver.approve(name, &args).await,
                    None => false,
                };
                if !approved {
                    return Err(Error::PermissionDenied(name.to_string()));
                }
            }
        }

        debug!(tool = %name, "Executing tool");
        let outcome = tokio::time::timeout(self.timeout, tool.execute(args))
            .await
            .map_err(|_| Error::Timeout(self.timeout.as_secs()))?;
        // Anything raised inside the tool is an execution failure, whatever its variant
        outcome.map_err(|e| match e {
            Error::Execution(_) | Error::Timeout(_) => e,
            other => Error::Execution(other.to_string()),
        })
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.list_names())
            .field("has_approver", &self.approver.is_some())
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests;
