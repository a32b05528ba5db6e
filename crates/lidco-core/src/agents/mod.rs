//! Agents
//!
//! # Module Structure
//!
//! - `config`: immutable [`AgentConfig`]
//! - `builtins`: the builtin agent set
//! - `agent`: the ReAct loop ([`Agent::run`])
//! - `registry`: copy-on-write [`AgentRegistry`] snapshots
//! - `loader`: YAML agent definitions

mod agent;
mod builtins;
mod config;
mod loader;
mod registry;


pub use agent::{
    Agent, AgentMetrics, AgentResponse, AgentRuntime, AgentState, MetricsSnapshot, RunFailure,
    RunInput, ToolCallRecord,
};
pub use builtins::builtin_agents;
pub use config::{
    AgentConfig, AgentSource, DEFAULT_CONTEXT_WINDOW, DEFAULT_MAX_ITERATIONS, READ_ONLY_TOOLS,
};
pub use loader::{parse_agent_file, AgentLoader};
pub use registry::{AgentRegistry, AgentSnapshot};
