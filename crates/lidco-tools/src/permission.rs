//! Permission gate for side-effecting tools
//!
//! The registry consults a [`PermissionGate`] before running a tool. An
//! `Ask` decision is resolved by an [`Approver`] (an interactive prompt in
//! the CLI); with no approver, `Ask` is treated as `Deny`.

use crate::registry::ToolDefinition;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Outcome of a permission check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionDecision {
    /// Run without asking
    Allow,
    /// Ask an approver first
    Ask,
    /// Refuse
    Deny,
}

/// Decides whether a tool call may proceed
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait PermissionGate: Send + Sync {
    /// Check one call
    async fn check(&self, tool: &ToolDefinition, args: &serde_json::Value) -> PermissionDecision;
}

/// Resolves `Ask` decisions
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Approver: Send + Sync {
    /// Return true to allow the call
    async fn approve(&self, tool: &str, args: &serde_json::Value) -> bool;
}

/// Name-list policy, usually built from the `permissions` config section.
///
/// `deny` wins over `auto_allow`, which wins over `ask`. Tools in none of
/// the lists are asked about only if their risk level requires it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionPolicy {
    /// Always allowed
    pub auto_allow: HashSet<String>,
    /// Always asked
    pub ask: HashSet<String>,
    /// Always denied
    pub deny: HashSet<String>,
}

impl PermissionPolicy {
    /// Default lists: read-only tools allowed, writers and shell asked
    #[must_use]
    pub fn standard() -> Self {
        Self {
            auto_allow: ["file_read", "glob", "grep", "git"].map(String::from).into(),
            ask: ["file_write", "file_edit", "bash"].map(String::from).into(),
            deny: HashSet::new(),
        }
    }

    /// Allow everything that is not explicitly denied
    #[must_use]
    pub fn permissive() -> Self {
        Self::default()
    }

    /// Synchronous decision for a tool
    #[must_use]
    pub fn decide(&self, tool: &ToolDefinition) -> PermissionDecision {
        if self.deny.contains(&tool.name) {
            PermissionDecision::Deny
        } else if self.auto_allow.contains(&tool.name) {
            PermissionDecision::Allow
        } else if self.ask.contains(&tool.name) || tool.risk_level.requires_confirmation() {
            PermissionDecision::Ask
        } else {
            PermissionDecision::Allow
        }
    }
}

#[async_trait::async_trait]
impl PermissionGate for PermissionPolicy {
    async fn check(&self, tool: &ToolDefinition, _args: &serde_json::Value) -> PermissionDecision {
        self.decide(tool)
    }
}

/// Approver that answers the same way every time
#[derive(Debug, Clone, Copy)]
pub struct FixedApprover(pub bool);

#[async_trait::async_trait]
impl Approver for FixedApprover {
    async fn approve(&self, _tool: &str, _args: &serde_json::Value) -> bool {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::RiskLevel;

    fn def(name: &str, risk: RiskLevel) -> ToolDefinition {
        ToolDefinition::new(name, "test").with_risk_level(risk)
    }

    #[test]
    fn test_standard_policy() {
        let policy = PermissionPolicy::standard();
        assert_eq!(
            policy.decide(&def("file_read", RiskLevel::Low)),
            PermissionDecision::Allow
        );
        assert_eq!(
            policy.decide(&def("bash", RiskLevel::High)),
            PermissionDecision::Ask
        );
    }

    #[test]
    fn test_deny_wins() {
        let mut policy = PermissionPolicy::standard();
        policy.deny.insert("file_read".to_string());
        assert_eq!(
            policy.decide(&def("file_read", RiskLevel::Low)),
            PermissionDecision::Deny
        );
    }

    #[test]
    fn test_unlisted_tools_follow_risk_level() {
        let policy = PermissionPolicy::permissive();
        assert_eq!(
            policy.decide(&def("custom_reader", RiskLevel::Low)),
            PermissionDecision::Allow
        );
        assert_eq!(
            policy.decide(&def("custom_writer", RiskLevel::Medium)),
            PermissionDecision::Ask
        );
    }

    #[tokio::test]
    async fn test_fixed_approver() {
        assert!(FixedApprover(true).approve("bash", &serde_json::json!({})).await);
        assert!(!FixedApprover(false).approve("bash", &serde_json::json!({})).await);
    }
}
