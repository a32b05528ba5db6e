//! LIDCO Tools - Tool Registry and Permission Gate
//!
//! This crate provides everything an agent needs to act on a project:
//! - Registry: tool registration, schema validation and guarded execution
//! - Permission: allow/ask/deny policy consulted before every call
//! - Builtins: file, search and shell tools rooted at the project directory
//!
//! Tool failures never surface as Rust errors to callers of
//! [`ToolRegistry::execute`]; they come back as a failed [`ToolResult`] so
//! the model can read them and react.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod builtins;
pub mod error;
pub mod permission;
pub mod registry;
pub mod schema;

pub use builtins::{register_builtins, Workspace};
pub use error::{Error, Result};
pub use permission::{
    Approver, FixedApprover, PermissionDecision, PermissionGate, PermissionPolicy,
};
pub use registry::{
    RiskLevel, Tool, ToolDefinition, ToolFailureKind, ToolRegistry, ToolResult, DENIED_MESSAGE,
};
