//! LIDCO Core - Orchestration Engine
//!
//! This crate turns a user message into an answer from one of several
//! specialised agents:
//! - Agents: immutable agent definitions, the ReAct loop and a
//!   copy-on-write registry reloadable from YAML files
//! - Orchestrator: routing, context assembly and conversation history
//! - Session: composition root with blocking and streaming entry points
//! - Events: step events and their mapping to the streaming wire protocol
//! - Memory: persistent notes injected into agent context
//!
//! # Module Structure
//!
//! - `agents`: [`AgentConfig`], [`Agent`], [`AgentRegistry`], [`AgentLoader`]
//! - `orchestrator`: [`Orchestrator`], [`ChatRequest`]
//! - `session`: [`Session`], [`SessionBuilder`], [`ChatStream`]
//! - `events`: [`StepEvent`], [`StreamEvent`], [`EventStreamAdapter`]
//! - `memory`: [`MemoryStore`], [`JsonMemoryStore`]
//! - `context`: project summary for agent prompts
//! - `ledger`: per-session token accounting
//! - `config`: [`LidcoConfig`]

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod agents;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod ledger;
pub mod memory;
pub mod orchestrator;
pub mod session;

#[cfg(test)]
mod test_support;

pub use agents::{
    builtin_agents, Agent, AgentConfig, AgentLoader, AgentRegistry, AgentResponse, AgentRuntime,
    AgentSnapshot, AgentSource, RunFailure, ToolCallRecord,
};
pub use config::{AgentsConfig, LidcoConfig, LlmConfig, MemoryConfig, ProviderSettings, ServerConfig};
pub use context::{DirectoryContext, ProjectContextBuilder};
pub use error::{Error, Result};
pub use events::{EventEmitter, EventStreamAdapter, StepEvent, StreamEvent};
pub use ledger::{LedgerSnapshot, TokenLedger};
pub use memory::{JsonMemoryStore, MemoryEntry, MemoryStore};
pub use orchestrator::{ChatRequest, ConversationTurn, Orchestrator, OrchestratorSettings};
pub use session::{AgentInfo, ChatStream, Session, SessionBuilder, SessionStatus};

// Re-exported so embedders need only this crate
pub use lidco_llm;
pub use lidco_tools;
