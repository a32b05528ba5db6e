//! LIDCO LLM - model abstraction and routing
//!
//! This crate provides the model-calling side of LIDCO:
//! - `client`: the provider-agnostic `ModelClient` trait and prefix selection
//! - `openai`: OpenAI-compatible HTTP client (OpenAI, Groq, OpenRouter, Ollama)
//! - `router`: role → model plan resolution with retry and fallback
//! - `retry`: exponential backoff for transient failures

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod completion;
pub mod error;
pub mod message;
pub mod openai;
pub mod retry;
pub mod router;
pub mod tools;

pub use client::{ClientSet, DeltaSink, ModelClient};
pub use completion::{ModelRequest, ModelResponse, ModelResult, TokenUsage};
pub use error::{CandidateFailure, Error, Result};
pub use message::{Message, MessageRole};
pub use openai::{OpenAiCompatClient, OpenAiCompatConfig};
pub use retry::RetryConfig;
pub use router::{
    MockFailure, MockModelClient, ModelCandidate, ModelOverrides, ModelPlan, ModelRouter,
    RoleModelSpec, RouterConfig, DEFAULT_ROLE, HARD_DEFAULT_MODEL,
};
pub use tools::{ToolCall, ToolDefinition};
