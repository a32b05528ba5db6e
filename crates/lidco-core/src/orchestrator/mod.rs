//! Orchestrator
//!
//! Picks an agent for each message, assembles its context and history, runs
//! it, and keeps the session's conversation history.
//!
//! # Module Structure
//!
//! - `routing`: routing prompt, reply normalization, keyword fallback
//! - `history`: bounded conversation history
//!
//! One [`Orchestrator`] belongs to one session. [`Orchestrator::handle`]
//! holds a turn lock for the whole turn, so turns within a session never
//! interleave.

mod history;
mod routing;

#[cfg(test)]
mod tests;

pub use history::{ConversationTurn, History, TurnRole};
pub use routing::{keyword_route, normalize_reply, router_prompt, ROUTING_ROLE};

use crate::agents::{AgentRegistry, AgentResponse, AgentRuntime, AgentSnapshot, RunInput};
use crate::context::ProjectContextBuilder;
use crate::error::{Error, Result};
use crate::events::EventEmitter;
use crate::ledger::TokenLedger;
use crate::memory::{MemoryEntry, MemoryStore};
use lidco_llm::{Message, ModelOverrides};
use routing::registered_or_default;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Characters of the user message and answer kept in a memory summary
const SUMMARY_CHARS: usize = 200;

/// A chat request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// User message
    pub message: String,
    /// Agent to use; routed automatically when absent
    #[serde(default)]
    pub agent: Option<String>,
    /// Files whose contents are added to the context
    #[serde(default)]
    pub context_files: Vec<String>,
}

impl ChatRequest {
    /// Request with just a message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    /// Pin an agent
    #[must_use]
    pub fn with_agent(mut self, agent: impl Into<String>) -> Self {
        self.agent = Some(agent.into());
        self
    }

    /// Add context files
    #[must_use]
    pub fn with_context_files(mut self, files: Vec<String>) -> Self {
        self.context_files = files;
        self
    }
}

/// Orchestrator settings
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Fallback agent
    pub default_agent: String,
    /// Turns kept in history
    pub history_limit: usize,
    /// Turns replayed into each run
    pub history_window: usize,
    /// Per-file cap for context files
    pub max_file_chars: usize,
    /// Base for relative context file paths
    pub project_dir: PathBuf,
}

impl OrchestratorSettings {
    /// Settings from the agents section of the config
    #[must_use]
    pub fn from_config(config: &crate::config::AgentsConfig, project_dir: &Path) -> Self {
        Self {
            default_agent: config.default_agent.clone(),
            history_limit: config.history_limit,
            history_window: config.history_window,
            max_file_chars: config.max_file_chars,
            project_dir: project_dir.to_path_buf(),
        }
    }
}

/// Routes messages to agents and runs them
pub struct Orchestrator {
    registry: Arc<AgentRegistry>,
    runtime: AgentRuntime,
    settings: OrchestratorSettings,
    memory: Option<Arc<dyn MemoryStore>>,
    context: Option<Arc<dyn ProjectContextBuilder>>,
    ledger: Arc<TokenLedger>,
    history: Mutex<History>,
    turn_lock: tokio::sync::Mutex<()>,
}

impl Orchestrator {
    /// Create an orchestrator
    #[must_use]
    pub fn new(
        registry: Arc<AgentRegistry>,
        runtime: AgentRuntime,
        settings: OrchestratorSettings,
    ) -> Self {
        let history = History::new(settings.history_limit);
        Self {
            registry,
            runtime,
            settings,
            memory: None,
            context: None,
            ledger: Arc::new(TokenLedger::default()),
            history: Mutex::new(history),
            turn_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Attach a memory store
    #[must_use]
    pub fn with_memory(mut self, memory: Arc<dyn MemoryStore>) -> Self {
        self.memory = Some(memory);
        self
    }

    /// Attach a project context builder
    #[must_use]
    pub fn with_context_builder(mut self, context: Arc<dyn ProjectContextBuilder>) -> Self {
        self.context = Some(context);
        self
    }

    /// Share a token ledger
    #[must_use]
    pub fn with_ledger(mut self, ledger: Arc<TokenLedger>) -> Self {
        self.ledger = ledger;
        self
    }

    /// Settings in use
    #[must_use]
    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    /// Copy of the conversation history
    #[must_use]
    pub fn history(&self) -> Vec<ConversationTurn> {
        self.history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .turns()
    }

    /// Forget the conversation
    pub fn clear_history(&self) {
        self.history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
        info!("Conversation history cleared");
    }

    // ========================================================================
    // Routing
    // ========================================================================

    /// Pick the agent for a message.
    ///
    /// An explicit agent that is not registered is ignored and the message is
    /// routed as if none was given. Fails only with [`Error::Configuration`]
    /// when no agents exist.
    #[instrument(skip(self, snapshot, message), fields(generation = snapshot.generation()))]
    pub async fn route(
        &self,
        snapshot: &AgentSnapshot,
        message: &str,
        explicit_agent: Option<&str>,
    ) -> Result<String> {
        if snapshot.is_empty() {
            return Err(Error::Configuration("no agents registered".to_string()));
        }
        let default_agent = self.settings.default_agent.as_str();

        if let Some(name) = explicit_agent {
            let name = name.trim().to_lowercase();
            if snapshot.contains(&name) {
                debug!(agent = %name, "Explicit agent");
                return Ok(name);
            }
            warn!(
                agent = %name,
                available = %snapshot.names().join(", "),
                "Requested agent not registered, routing instead"
            );
        }

        let fallback = |wanted: &str| {
            registered_or_default(snapshot, wanted, default_agent)
                .ok_or_else(|| Error::Configuration("no agents registered".to_string()))
        };

        if snapshot.len() <= 1 {
            return fallback(default_agent);
        }

        match self.ask_routing_model(snapshot, message).await {
            Ok(name) => {
                info!(agent = %name, "Routed by model");
                Ok(name)
            }
            Err(e) => {
                let wanted = keyword_route(message, default_agent);
                let chosen = fallback(wanted)?;
                info!(agent = %chosen, reason = %e, "Routed by keywords");
                Ok(chosen)
            }
        }
    }

    async fn ask_routing_model(&self, snapshot: &AgentSnapshot, message: &str) -> Result<String> {
        let plan = self.runtime.router.resolve(
            ROUTING_ROLE,
            &ModelOverrides::none()
                .with_temperature(0.0)
                .with_max_tokens(50),
        );
        let messages = [
            Message::system(router_prompt(snapshot, &self.settings.default_agent)),
            Message::user(message),
        ];

        let result = self.runtime.router.call(&plan, &messages, &[]).await?;
        if let Some(usage) = &result.response.usage {
            self.ledger.record(ROUTING_ROLE, usage);
        }

        let reply = normalize_reply(result.response.text_content());
        if snapshot.contains(&reply) {
            Ok(reply)
        } else {
            let err = Error::RoutingAmbiguous(reply);
            warn!(error = %err, "Routing reply not an agent");
            Err(err)
        }
    }

    // ========================================================================
    // Handling
    // ========================================================================

    /// Run one turn.
    ///
    /// A failed agent run is not an error here: the returned response
    /// carries the failure. Only configuration problems are raised.
    #[instrument(skip(self, request, emitter, cancel), fields(explicit = ?request.agent))]
    pub async fn handle(
        &self,
        request: &ChatRequest,
        emitter: &EventEmitter,
        cancel: &CancellationToken,
    ) -> Result<AgentResponse> {
        let _turn = self.turn_lock.lock().await;
        let snapshot = self.registry.snapshot();

        let explicit_known = request
            .agent
            .as_deref()
            .is_some_and(|name| snapshot.contains(&name.trim().to_lowercase()));
        if !explicit_known && snapshot.len() > 1 {
            emitter.status("Routing", 0);
        }
        let agent_name = self
            .route(&snapshot, &request.message, request.agent.as_deref())
            .await?;
        let agent = snapshot
            .get(&agent_name)
            .ok_or_else(|| Error::Configuration(format!("agent '{agent_name}' disappeared")))?;

        let context = self
            .build_context(&agent_name, &request.context_files)
            .await;
        let history = self
            .history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .window(self.settings.history_window);

        let input = RunInput::new(request.message.clone())
            .with_context(context)
            .with_history(history);
        let response = agent.run(&self.runtime, input, emitter, cancel).await;

        {
            let mut history = self.history.lock().unwrap_or_else(|e| e.into_inner());
            history.push(ConversationTurn::user(&request.message));
            history.push(ConversationTurn::assistant(
                &response.content,
                &agent_name,
                response.tool_calls.iter().map(|c| c.tool.clone()).collect(),
            ));
        }

        if !response.tool_calls.is_empty() {
            self.remember(&request.message, &response).await;
        }
        self.ledger.record(&agent.config().role, &response.usage);

        Ok(response)
    }

    async fn build_context(&self, agent_name: &str, files: &[String]) -> String {
        let mut sections = Vec::new();

        if let Some(builder) = &self.context {
            let project = builder.build().await;
            if !project.trim().is_empty() {
                sections.push(project.trim_end().to_string());
            }
        }

        if let Some(memory) = &self.memory {
            match memory.load_context(agent_name).await {
                Ok(text) if !text.trim().is_empty() => sections.push(text),
                Ok(_) => {}
                Err(e) => warn!(error = %e, "Memory context unavailable"),
            }
        }

        for file in files {
            sections.push(self.file_section(file).await);
        }

        sections.join("\n\n")
    }

    async fn file_section(&self, file: &str) -> String {
        let path = Path::new(file);
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.settings.project_dir.join(path)
        };

        match tokio::fs::read_to_string(&path).await {
            Ok(content) => {
                let max = self.settings.max_file_chars;
                let body = match content.char_indices().nth(max) {
                    Some((idx, _)) => format!("{}\n... [truncated at {max} chars]", &content[..idx]),
                    None => content,
                };
                format!("## File: {file}\n```\n{body}\n```")
            }
            Err(e) => {
                warn!(file = %file, error = %e, "Context file unreadable");
                format!("## File: {file}\n(unreadable: {e})")
            }
        }
    }

    async fn remember(&self, message: &str, response: &AgentResponse) {
        let Some(memory) = &self.memory else {
            return;
        };

        let tools: Vec<String> = response
            .tool_calls
            .iter()
            .map(|c| c.tool.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let summary = format!(
            "Request: {}\nTools: {}\nOutcome: {}",
            crate::events::truncate_chars(message, SUMMARY_CHARS),
            tools.join(", "),
            crate::events::truncate_chars(&response.content, SUMMARY_CHARS),
        );
        let key = format!(
            "{}-{}",
            response.agent_name,
            chrono::Utc::now().format("%Y%m%d%H%M%S%3f")
        );
        let mut tags = vec![response.agent_name.clone()];
        tags.extend(tools);

        let entry = MemoryEntry::new(key, summary, "task")
            .with_tags(tags)
            .with_source("session");
        if let Err(e) = memory.record(entry).await {
            warn!(error = %e, "Failed to record memory");
        }
    }
}
