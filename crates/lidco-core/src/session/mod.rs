//! Session
//!
//! Composition root: owns the tool registry, model router, agent registry,
//! orchestrator, memory store and token ledger for one project, and exposes
//! blocking and streaming chat entry points.
//!
//! Both entry points share one implementation. Every turn runs in its own
//! task that feeds step events through an [`EventStreamAdapter`]; the
//! blocking variants simply drain that stream.


use crate::agents::{
    AgentConfig, AgentLoader, AgentRegistry, AgentResponse, AgentRuntime, MetricsSnapshot,
};
use crate::config::LidcoConfig;
use crate::context::{DirectoryContext, ProjectContextBuilder};
use crate::error::{Error, Result};
use crate::events::{EventEmitter, EventStreamAdapter, StreamEvent};
use crate::ledger::{LedgerSnapshot, TokenLedger};
use crate::memory::{JsonMemoryStore, MemoryStore};
use crate::orchestrator::{ChatRequest, ConversationTurn, Orchestrator, OrchestratorSettings};
use chrono::{DateTime, Utc};
use lidco_llm::{ClientSet, ModelClient, ModelRouter, OpenAiCompatClient, OpenAiCompatConfig};
use lidco_tools::{register_builtins, Approver, PermissionGate, Tool, ToolRegistry};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};
use uuid::Uuid;

// ============================================================================
// Public types
// ============================================================================

/// A running streamed turn
#[derive(Debug)]
pub struct ChatStream {
    /// Wire events; closes after the terminal event
    pub events: mpsc::UnboundedReceiver<StreamEvent>,
    /// Cancels this turn between iterations
    pub cancel: CancellationToken,
    /// Resolves to the turn's response
    pub handle: JoinHandle<Result<AgentResponse>>,
}

impl ChatStream {
    /// Drain every event, then wait for the response
    pub async fn collect(mut self) -> (Vec<StreamEvent>, Result<AgentResponse>) {
        let mut events = Vec::new();
        while let Some(event) = self.events.recv().await {
            events.push(event);
        }
        (events, join(self.handle).await)
    }
}

async fn join(handle: JoinHandle<Result<AgentResponse>>) -> Result<AgentResponse> {
    handle
        .await
        .map_err(|e| Error::Internal(format!("chat task failed: {e}")))?
}

/// Agent listing entry
#[derive(Debug, Clone, Serialize)]
pub struct AgentInfo {
    /// Name
    pub name: String,
    /// Description
    pub description: String,
    /// Model role
    pub role: String,
    /// Pinned model, if any
    pub model: Option<String>,
    /// Allowed tools (empty = all)
    pub tools: Vec<String>,
    /// Iteration budget
    pub max_iterations: u32,
    /// Where the definition came from
    pub source: String,
    /// Lifetime counters
    pub metrics: MetricsSnapshot,
}

/// Session overview
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    /// Session id
    pub session_id: Uuid,
    /// Creation time
    pub started_at: DateTime<Utc>,
    /// Project root
    pub project_dir: PathBuf,
    /// Fallback agent
    pub default_agent: String,
    /// Global default model
    pub default_model: String,
    /// Registered client prefixes
    pub providers: Vec<String>,
    /// Agent registry generation
    pub agents_generation: u64,
    /// Number of agents
    pub agent_count: usize,
    /// Registered tools
    pub tools: Vec<String>,
    /// Turns in history
    pub history_turns: usize,
    /// Turns currently running
    pub active_runs: usize,
    /// Token usage
    pub tokens: LedgerSnapshot,
}

enum AgentSet {
    Files(AgentLoader),
    Fixed(Vec<AgentConfig>),
}

impl AgentSet {
    fn load(&self) -> Vec<AgentConfig> {
        match self {
            Self::Files(loader) => loader.load_all(),
            Self::Fixed(configs) => configs.clone(),
        }
    }
}

// ============================================================================
// Session
// ============================================================================

/// One project's runtime
pub struct Session {
    id: Uuid,
    started_at: DateTime<Utc>,
    config: LidcoConfig,
    project_dir: PathBuf,
    tools: Arc<ToolRegistry>,
    router: Arc<ModelRouter>,
    registry: Arc<AgentRegistry>,
    orchestrator: Arc<Orchestrator>,
    ledger: Arc<TokenLedger>,
    agent_set: AgentSet,
    active: Arc<Mutex<HashMap<u64, CancellationToken>>>,
    next_run: AtomicU64,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("project_dir", &self.project_dir)
            .field("tools", &self.tools.list_names())
            .field("agents_generation", &self.registry.generation())
            .finish()
    }
}

impl Session {
    /// Build a session from configuration alone
    pub async fn new(config: LidcoConfig, project_dir: impl Into<PathBuf>) -> Result<Self> {
        SessionBuilder::new(config, project_dir).build().await
    }

    /// Session id
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Configuration in use
    #[must_use]
    pub fn config(&self) -> &LidcoConfig {
        &self.config
    }

    /// Project root
    #[must_use]
    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    /// Tool registry
    #[must_use]
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Run one turn and wait for the answer
    pub async fn handle_chat(&self, request: ChatRequest) -> Result<AgentResponse> {
        self.handle_chat_with(request, |_| {}).await
    }

    /// Run one turn, passing every wire event to `observer` as it arrives
    pub async fn handle_chat_with<F>(&self, request: ChatRequest, mut observer: F) -> Result<AgentResponse>
    where
        F: FnMut(&StreamEvent),
    {
        let mut stream = self.handle_chat_stream(request);
        while let Some(event) = stream.events.recv().await {
            observer(&event);
        }
        join(stream.handle).await
    }

    /// Start one turn and return its event stream
    #[instrument(skip(self, request), fields(session = %self.id, agent = ?request.agent))]
    pub fn handle_chat_stream(&self, request: ChatRequest) -> ChatStream {
        let cancel = CancellationToken::new();
        let run_id = self.next_run.fetch_add(1, Ordering::Relaxed);
        self.active
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(run_id, cancel.clone());

        let (tx, rx) = mpsc::unbounded_channel();
        let orchestrator = self.orchestrator.clone();
        let active = self.active.clone();
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            let (emitter, mut steps) = EventEmitter::channel();
            let mut adapter = EventStreamAdapter::new(request.agent.as_deref());
            if let Some(start) = adapter.start() {
                let _ = tx.send(start);
            }

            let outcome = {
                let run = orchestrator.handle(&request, &emitter, &token);
                tokio::pin!(run);
                loop {
                    tokio::select! {
                        biased;
                        Some(step) = steps.recv() => {
                            for event in adapter.adapt(step) {
                                let _ = tx.send(event);
                            }
                        }
                        outcome = &mut run => break outcome,
                    }
                }
            };

            while let Ok(step) = steps.try_recv() {
                for event in adapter.adapt(step) {
                    let _ = tx.send(event);
                }
            }
            for event in adapter.finish(&outcome) {
                let _ = tx.send(event);
            }

            active
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .remove(&run_id);
            outcome
        });

        ChatStream {
            events: rx,
            cancel,
            handle,
        }
    }

    /// Cancel every running turn; returns how many were signalled
    pub fn cancel(&self) -> usize {
        let active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        for token in active.values() {
            token.cancel();
        }
        if !active.is_empty() {
            info!(runs = active.len(), "Cancellation requested");
        }
        active.len()
    }

    /// Rebuild the agent set and swap it in; returns the new generation
    pub fn reload_agents(&self) -> u64 {
        let configs = self.agent_set.load();
        self.registry.replace(configs)
    }

    /// Current agents, sorted by name
    #[must_use]
    pub fn agents(&self) -> Vec<AgentInfo> {
        self.registry
            .snapshot()
            .agents()
            .map(|agent| {
                let config = agent.config();
                AgentInfo {
                    name: config.name.clone(),
                    description: config.description.clone(),
                    role: config.role.clone(),
                    model: config.model.clone(),
                    tools: config.tools.clone(),
                    max_iterations: config.max_iterations,
                    source: config.source.to_string(),
                    metrics: agent.metrics(),
                }
            })
            .collect()
    }

    /// Conversation history
    #[must_use]
    pub fn history(&self) -> Vec<ConversationTurn> {
        self.orchestrator.history()
    }

    /// Forget the conversation
    pub fn clear_history(&self) {
        self.orchestrator.clear_history();
    }

    /// Session overview
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        let snapshot = self.registry.snapshot();
        SessionStatus {
            session_id: self.id,
            started_at: self.started_at,
            project_dir: self.project_dir.clone(),
            default_agent: self.orchestrator.settings().default_agent.clone(),
            default_model: self.router.config().default_model.clone(),
            providers: self
                .router
                .client_prefixes()
                .into_iter()
                .map(String::from)
                .collect(),
            agents_generation: snapshot.generation(),
            agent_count: snapshot.len(),
            tools: self.tools.list_names().into_iter().map(String::from).collect(),
            history_turns: self.orchestrator.history().len(),
            active_runs: self.active.lock().unwrap_or_else(|e| e.into_inner()).len(),
            tokens: self.ledger.snapshot(),
        }
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Assembles a [`Session`], with hooks for tests and embedding
pub struct SessionBuilder {
    config: LidcoConfig,
    project_dir: PathBuf,
    clients: Vec<(String, Arc<dyn ModelClient>)>,
    tools: Vec<Arc<dyn Tool>>,
    builtin_tools: bool,
    approver: Option<Arc<dyn Approver>>,
    gate: Option<Arc<dyn PermissionGate>>,
    memory: Option<Arc<dyn MemoryStore>>,
    context: Option<Arc<dyn ProjectContextBuilder>>,
    agents: Option<Vec<AgentConfig>>,
}

impl SessionBuilder {
    /// Start from configuration and a project directory
    pub fn new(config: LidcoConfig, project_dir: impl Into<PathBuf>) -> Self {
        Self {
            config,
            project_dir: project_dir.into(),
            clients: Vec::new(),
            tools: Vec::new(),
            builtin_tools: true,
            approver: None,
            gate: None,
            memory: None,
            context: None,
            agents: None,
        }
    }

    /// Use this client for a model-id prefix. Once any client is supplied,
    /// the configured providers are not built.
    #[must_use]
    pub fn with_client(mut self, prefix: impl Into<String>, client: Arc<dyn ModelClient>) -> Self {
        self.clients.push((prefix.into(), client));
        self
    }

    /// Register an extra tool
    #[must_use]
    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    /// Skip the builtin file, search and shell tools
    #[must_use]
    pub fn without_builtin_tools(mut self) -> Self {
        self.builtin_tools = false;
        self
    }

    /// Resolve `Ask` permission decisions with this approver
    #[must_use]
    pub fn with_approver(mut self, approver: Arc<dyn Approver>) -> Self {
        self.approver = Some(approver);
        self
    }

    /// Replace the config-driven permission gate
    #[must_use]
    pub fn with_permission_gate(mut self, gate: Arc<dyn PermissionGate>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Use this memory store instead of the configured one
    #[must_use]
    pub fn with_memory_store(mut self, memory: Arc<dyn MemoryStore>) -> Self {
        self.memory = Some(memory);
        self
    }

    /// Use this project context builder
    #[must_use]
    pub fn with_context_builder(mut self, context: Arc<dyn ProjectContextBuilder>) -> Self {
        self.context = Some(context);
        self
    }

    /// Use a fixed agent set instead of builtins plus YAML files
    #[must_use]
    pub fn with_agents(mut self, agents: Vec<AgentConfig>) -> Self {
        self.agents = Some(agents);
        self
    }

    fn build_clients(&self) -> Result<ClientSet> {
        let mut clients = ClientSet::new();
        if !self.clients.is_empty() {
            for (prefix, client) in &self.clients {
                clients.insert(prefix.clone(), client.clone());
            }
            return Ok(clients);
        }

        let timeout = Duration::from_secs(self.config.llm.router.call_timeout_secs.max(1));
        for (prefix, settings) in &self.config.llm.providers {
            let name = match prefix.trim_end_matches('/') {
                "" => "default",
                name => name,
            };
            let client_config = OpenAiCompatConfig::new(name)
                .with_base_url(&settings.base_url)
                .with_api_key(settings.api_key())
                .with_timeout(timeout);
            clients.insert(prefix.clone(), Arc::new(OpenAiCompatClient::new(client_config)?));
        }
        Ok(clients)
    }

    async fn build_memory(&self) -> Option<Arc<dyn MemoryStore>> {
        if let Some(memory) = &self.memory {
            return Some(memory.clone());
        }
        if !self.config.memory.enabled {
            return None;
        }
        let path = self
            .config
            .memory
            .path
            .clone()
            .unwrap_or_else(|| JsonMemoryStore::default_path(&self.project_dir));
        match JsonMemoryStore::open(&path, self.config.memory.max_entries).await {
            Ok(store) => Some(Arc::new(store)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Memory store disabled");
                None
            }
        }
    }

    /// Build the session.
    ///
    /// Fails with [`Error::Configuration`] when no model client is available.
    pub async fn build(self) -> Result<Session> {
        let project_dir = self
            .project_dir
            .canonicalize()
            .unwrap_or_else(|_| self.project_dir.clone());

        let mut tools = ToolRegistry::new().with_permission_gate(
            self.gate
                .clone()
                .unwrap_or_else(|| Arc::new(self.config.permissions.clone())),
        );
        if let Some(approver) = &self.approver {
            tools = tools.with_approver(approver.clone());
        }
        if self.builtin_tools {
            register_builtins(&mut tools, &project_dir);
        }
        for tool in &self.tools {
            tools.register(tool.clone());
        }
        let tools = Arc::new(tools);

        let clients = self.build_clients()?;
        if clients.is_empty() {
            return Err(Error::Configuration(
                "no model providers configured (set llm.providers)".to_string(),
            ));
        }
        let router = Arc::new(ModelRouter::new(self.config.llm.router.clone(), clients));

        let agent_set = match &self.agents {
            Some(agents) => AgentSet::Fixed(agents.clone()),
            None if self.config.agents.load_agent_files => AgentSet::Files(
                AgentLoader::for_project(&project_dir, self.config.agents.max_iterations),
            ),
            None => AgentSet::Files(AgentLoader::builtin_only(self.config.agents.max_iterations)),
        };
        let registry = Arc::new(AgentRegistry::new(agent_set.load()));

        let ledger = Arc::new(TokenLedger::new(self.config.llm.session_token_limit));
        let runtime = AgentRuntime::new(
            router.clone(),
            tools.clone(),
            self.config.agents.max_execution_secs,
        );
        let context = self
            .context
            .clone()
            .unwrap_or_else(|| Arc::new(DirectoryContext::new(&project_dir)));

        let mut orchestrator = Orchestrator::new(
            registry.clone(),
            runtime,
            OrchestratorSettings::from_config(&self.config.agents, &project_dir),
        )
        .with_ledger(ledger.clone())
        .with_context_builder(context);
        if let Some(memory) = self.build_memory().await {
            orchestrator = orchestrator.with_memory(memory);
        }

        let session = Session {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            config: self.config,
            project_dir,
            tools,
            router,
            registry,
            orchestrator: Arc::new(orchestrator),
            ledger,
            agent_set,
            active: Arc::new(Mutex::new(HashMap::new())),
            next_run: AtomicU64::new(1),
        };

        info!(
            session = %session.id,
            project = %session.project_dir.display(),
            agents = session.registry.snapshot().len(),
            tools = session.tools.len(),
            "Session ready"
        );
        Ok(session)
    }
}
