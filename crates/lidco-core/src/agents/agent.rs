//! ReAct agent loop
//!
//! One [`Agent`] is bound to one [`AgentConfig`]. A run alternates between
//! asking the model and executing the tools it requests until the model
//! answers in plain text or a budget is hit:
//!
//! ```text
//! Idle -> AwaitingModel -> ExecutingTools -> AwaitingModel -> ... -> Done
//!                \                 \
//!                 +-----------------+--> Failed (provider exhausted,
//!                                        iteration budget, timeout, cancel)
//! ```
//!
//! A failed run still yields an [`AgentResponse`]; the failure rides along
//! in [`AgentResponse::error`] with whatever partial text the model produced.
//!
//! Model text is streamed: every fragment the provider delivers becomes a
//! [`StepEvent::Token`]. Before each model call the transcript is measured
//! against the agent's context window; past the threshold, older tool output
//! is replaced by one-line summaries.

use super::config::AgentConfig;
use crate::events::{EventEmitter, StepEvent};
use lidco_llm::{Message, MessageRole, ModelRouter, TokenUsage, ToolCall};
use lidco_tools::{ToolFailureKind, ToolRegistry, ToolResult};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};


/// Rough characters-per-token ratio for transcript estimates
const CHARS_PER_TOKEN: usize = 4;

/// Per-message overhead added to the estimate
const MESSAGE_OVERHEAD_TOKENS: usize = 4;

/// Share of the context window (percent) that triggers pruning
const PRUNE_THRESHOLD_PERCENT: usize = 75;

/// Most recent tool results that are never pruned
const KEEP_RECENT_TOOL_RESULTS: usize = 4;

/// Marker that starts every pruned tool result
const PRUNED_MARKER: &str = "[pruned";

// ============================================================================
// Types
// ============================================================================

/// Loop state, tracked for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    /// Not running
    Idle,
    /// Waiting on the model router
    AwaitingModel,
    /// Running requested tools
    ExecutingTools,
    /// Finished with a final answer
    Done,
    /// Stopped early
    Failed,
}

/// Why a run stopped without a final answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum RunFailure {
    /// Every model candidate failed
    #[error("all model providers failed: {0}")]
    ProviderExhausted(String),
    /// Iteration budget reached while the model still wanted tools
    #[error("{0}")]
    BudgetExceeded(String),
    /// Wall-clock budget reached
    #[error("{0}")]
    Timeout(String),
    /// Cancelled by the caller
    #[error("{0}")]
    Cancelled(String),
}

impl RunFailure {
    /// Short machine-readable kind
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ProviderExhausted(_) => "provider_exhausted",
            Self::BudgetExceeded(_) => "budget_exceeded",
            Self::Timeout(_) => "timeout",
            Self::Cancelled(_) => "cancelled",
        }
    }
}

/// Record of one tool call made during a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRecord {
    /// Tool name as requested by the model
    pub tool: String,
    /// Arguments (the raw string if it was not valid JSON)
    pub arguments: serde_json::Value,
    /// Whether the call succeeded
    pub success: bool,
    /// Output, or error message on failure
    pub output: String,
    /// Failure classification
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<ToolFailureKind>,
    /// Time spent
    pub duration_ms: u64,
}

/// Result of one agent run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResponse {
    /// Final answer, or the best partial text when the run failed
    pub content: String,
    /// Agent that ran
    pub agent_name: String,
    /// Model that produced the last reply
    pub model_used: Option<String>,
    /// Model calls made
    pub iterations: u32,
    /// Tool calls in execution order
    pub tool_calls: Vec<ToolCallRecord>,
    /// Tokens used across all model calls
    pub usage: TokenUsage,
    /// Run duration
    pub elapsed_ms: u64,
    /// Set when the run stopped before a final answer
    pub incomplete: bool,
    /// Failure reason, if any
    pub error: Option<RunFailure>,
}

impl AgentResponse {
    /// Whether the run produced a final answer
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Shared collaborators for a run
#[derive(Clone)]
pub struct AgentRuntime {
    /// Model router
    pub router: Arc<ModelRouter>,
    /// Tool registry
    pub tools: Arc<ToolRegistry>,
    /// Wall-clock budget per run (`None` = unlimited)
    pub max_execution: Option<Duration>,
}

impl AgentRuntime {
    /// Create a runtime; `max_execution_secs == 0` disables the wall clock
    #[must_use]
    pub fn new(router: Arc<ModelRouter>, tools: Arc<ToolRegistry>, max_execution_secs: u64) -> Self {
        Self {
            router,
            tools,
            max_execution: (max_execution_secs > 0).then(|| Duration::from_secs(max_execution_secs)),
        }
    }
}

/// What a run works on
#[derive(Debug, Clone, Default)]
pub struct RunInput {
    /// User message
    pub message: String,
    /// Context injected after the system prompt
    pub context: String,
    /// Prior conversation, oldest first
    pub history: Vec<Message>,
}

impl RunInput {
    /// Input with just a message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    /// Attach context
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    /// Attach history
    #[must_use]
    pub fn with_history(mut self, history: Vec<Message>) -> Self {
        self.history = history;
        self
    }
}

/// Lifetime counters for an agent
#[derive(Debug, Default)]
pub struct AgentMetrics {
    runs: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
    tool_calls: AtomicU64,
}

/// Point-in-time copy of [`AgentMetrics`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Runs started
    pub runs: u64,
    /// Runs that ended with a final answer
    pub successes: u64,
    /// Runs that ended in a failed state
    pub failures: u64,
    /// Tool calls made
    pub tool_calls: u64,
}

impl AgentMetrics {
    /// Read the counters
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            runs: self.runs.load(Ordering::Relaxed),
            successes: self.successes.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            tool_calls: self.tool_calls.load(Ordering::Relaxed),
        }
    }
}

// ============================================================================
// Agent
// ============================================================================

/// Runtime agent bound to one configuration
#[derive(Debug)]
pub struct Agent {
    config: AgentConfig,
    metrics: AgentMetrics,
}

struct RunState {
    started: Instant,
    state: AgentState,
    iterations: u32,
    usage: TokenUsage,
    model_used: Option<String>,
    partial: String,
    records: Vec<ToolCallRecord>,
}

impl RunState {
    fn transition(&mut self, agent: &str, next: AgentState) {
        debug!(agent = %agent, from = ?self.state, to = ?next, "Agent state");
        self.state = next;
    }

    fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }
}

impl Agent {
    /// Create an agent
    #[must_use]
    pub fn new(config: AgentConfig) -> Self {
        Self {
            config,
            metrics: AgentMetrics::default(),
        }
    }

    /// Agent name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Agent configuration
    #[must_use]
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Lifetime counters
    #[must_use]
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Run the ReAct loop to completion
    #[instrument(skip(self, runtime, input, emitter, cancel), fields(agent = %self.config.name))]
    pub async fn run(
        &self,
        runtime: &AgentRuntime,
        input: RunInput,
        emitter: &EventEmitter,
        cancel: &CancellationToken,
    ) -> AgentResponse {
        self.metrics.runs.fetch_add(1, Ordering::Relaxed);
        let name = self.config.name.as_str();
        let max_iterations = self.config.max_iterations.max(1);

        let mut run = RunState {
            started: Instant::now(),
            state: AgentState::Idle,
            iterations: 0,
            usage: TokenUsage::default(),
            model_used: None,
            partial: String::new(),
            records: Vec::new(),
        };

        let mut messages = Vec::with_capacity(input.history.len() + 2);
        messages.push(Message::system(self.config.render_system_prompt(&input.context)));
        messages.extend(input.history);
        messages.push(Message::user(input.message));

        let tool_defs = runtime.tools.llm_definitions(&self.config.tools);
        let plan = runtime
            .router
            .resolve(&self.config.role, &self.config.model_overrides());

        info!(
            agent = %name,
            role = %self.config.role,
            models = ?plan.models(),
            tools = tool_defs.len(),
            max_iterations,
            "Agent run started"
        );
        emitter.emit(StepEvent::Started {
            agent: name.to_string(),
        });

        loop {
            if cancel.is_cancelled() {
                let failure = RunFailure::Cancelled("Run cancelled".to_string());
                return self.fail(run, failure, emitter);
            }
            if let Some(limit) = runtime.max_execution {
                if run.started.elapsed() >= limit {
                    let failure = RunFailure::Timeout(format!(
                        "Run exceeded the {}s time limit",
                        limit.as_secs()
                    ));
                    return self.fail(run, failure, emitter);
                }
            }

            run.transition(name, AgentState::AwaitingModel);
            emitter.status(
                format!("Thinking ({}/{max_iterations})", run.iterations + 1),
                run.elapsed_ms(),
            );

            self.fit_context(&mut messages);

            let on_delta = |delta: &str| {
                emitter.emit(StepEvent::Token {
                    text: delta.to_string(),
                })
            };
            let result = runtime
                .router
                .call_streaming(&plan, &messages, &tool_defs, &on_delta)
                .await;
            run.iterations += 1;

            let result = match result {
                Ok(result) => result,
                Err(e) => {
                    let failure = RunFailure::ProviderExhausted(e.to_string());
                    return self.fail(run, failure, emitter);
                }
            };

            run.model_used = Some(result.model_used);
            if let Some(usage) = &result.response.usage {
                run.usage.accumulate(usage);
            }

            let text = result.response.text_content().to_string();
            if !text.is_empty() {
                run.partial = text.clone();
            }

            if !result.response.has_tool_calls() {
                run.transition(name, AgentState::Done);
                return self.finish(run, text, emitter);
            }

            run.transition(name, AgentState::ExecutingTools);
            let calls = result.response.tool_calls;
            messages.push(Message::assistant_with_tools(text, calls.clone()));

            for call in &calls {
                let (record, tool_message) = self.execute_call(runtime, call, emitter).await;
                messages.push(tool_message);
                run.records.push(record);
            }

            if run.iterations >= max_iterations {
                let failure = RunFailure::BudgetExceeded(format!(
                    "Stopped after {} iterations without a final answer",
                    run.iterations
                ));
                return self.fail(run, failure, emitter);
            }
        }
    }

    /// Prune old tool output once the transcript nears the context window
    fn fit_context(&self, messages: &mut [Message]) {
        let budget = self.config.context_window * PRUNE_THRESHOLD_PERCENT / 100;
        let before = estimate_tokens(messages);
        if before <= budget {
            return;
        }
        let pruned = prune_tool_results(messages, before - budget);
        let after = estimate_tokens(messages);
        if after > budget {
            warn!(
                agent = %self.config.name,
                estimated_tokens = after,
                context_window = self.config.context_window,
                pruned,
                "Transcript still over the context budget after pruning"
            );
        } else {
            debug!(
                agent = %self.config.name,
                before,
                after,
                pruned,
                "Pruned old tool output"
            );
        }
    }

    async fn execute_call(
        &self,
        runtime: &AgentRuntime,
        call: &ToolCall,
        emitter: &EventEmitter,
    ) -> (ToolCallRecord, Message) {
        let parsed = call.arguments_json();
        let arguments = parsed
            .as_ref()
            .map(Clone::clone)
            .unwrap_or_else(|_| serde_json::Value::String(call.arguments.clone()));

        emitter.emit(StepEvent::ToolStarted {
            tool: call.name.clone(),
            call_id: call.id.clone(),
            args: arguments.clone(),
        });

        let result = if !self.config.allows_tool(&call.name) {
            ToolResult::failure(
                ToolFailureKind::UnknownTool,
                lidco_tools::Error::NotFound(call.name.clone()).to_string(),
                0,
            )
        } else {
            match parsed {
                Ok(args) => runtime.tools.execute(&call.name, args).await,
                Err(e) => ToolResult::failure(
                    ToolFailureKind::InvalidArguments,
                    format!("invalid arguments: {e}"),
                    0,
                ),
            }
        };

        self.metrics.tool_calls.fetch_add(1, Ordering::Relaxed);
        emitter.emit(StepEvent::ToolEnded {
            tool: call.name.clone(),
            call_id: call.id.clone(),
            success: !result.is_error,
            output: result.output.clone(),
            duration_ms: result.duration_ms,
        });

        let content = if result.is_error {
            format!("Error: {}", result.output)
        } else {
            result.output.clone()
        };
        let record = ToolCallRecord {
            tool: call.name.clone(),
            arguments,
            success: !result.is_error,
            output: result.output,
            failure: result.failure,
            duration_ms: result.duration_ms,
        };
        (record, Message::tool_result(call, content))
    }

    fn finish(&self, run: RunState, content: String, emitter: &EventEmitter) -> AgentResponse {
        self.metrics.successes.fetch_add(1, Ordering::Relaxed);
        let elapsed_ms = run.elapsed_ms();
        info!(
            agent = %self.config.name,
            iterations = run.iterations,
            tool_calls = run.records.len(),
            elapsed_ms,
            "Agent run finished"
        );
        emitter.emit(StepEvent::Finished {
            agent: self.config.name.clone(),
            model_used: run.model_used.clone(),
            iterations: run.iterations,
            tool_calls_count: run.records.len(),
            total_tokens: run.usage.total_tokens,
            elapsed_ms,
        });

        AgentResponse {
            content,
            agent_name: self.config.name.clone(),
            model_used: run.model_used,
            iterations: run.iterations,
            tool_calls: run.records,
            usage: run.usage,
            elapsed_ms,
            incomplete: false,
            error: None,
        }
    }

    fn fail(&self, mut run: RunState, failure: RunFailure, emitter: &EventEmitter) -> AgentResponse {
        run.transition(&self.config.name, AgentState::Failed);
        self.metrics.failures.fetch_add(1, Ordering::Relaxed);
        let elapsed_ms = run.elapsed_ms();
        warn!(
            agent = %self.config.name,
            reason = failure.kind(),
            iterations = run.iterations,
            elapsed_ms,
            "Agent run failed"
        );
        emitter.emit(StepEvent::Failed {
            agent: self.config.name.clone(),
            message: failure.to_string(),
        });

        let content = if run.partial.is_empty() {
            failure.to_string()
        } else {
            format!("{}\n\n[Incomplete: {}]", run.partial, failure)
        };

        AgentResponse {
            content,
            agent_name: self.config.name.clone(),
            model_used: run.model_used,
            iterations: run.iterations,
            tool_calls: run.records,
            usage: run.usage,
            elapsed_ms,
            incomplete: true,
            error: Some(failure),
        }
    }
}

// ============================================================================
// Context window
// ============================================================================

/// Estimated token count of a transcript
fn estimate_tokens(messages: &[Message]) -> usize {
    messages.iter().map(message_tokens).sum()
}

fn message_tokens(message: &Message) -> usize {
    let calls: usize = message
        .tool_calls
        .iter()
        .map(|c| c.name.len() + c.arguments.len())
        .sum();
    (message.content.len() + calls) / CHARS_PER_TOKEN + MESSAGE_OVERHEAD_TOKENS
}

/// Summarize the oldest tool results until `excess` tokens are freed.
///
/// The newest [`KEEP_RECENT_TOOL_RESULTS`] results stay verbatim. Returns the
/// number of messages pruned.
fn prune_tool_results(messages: &mut [Message], excess: usize) -> usize {
    let candidates: Vec<usize> = messages
        .iter()
        .enumerate()
        .filter(|(_, m)| m.role == MessageRole::Tool && !m.content.starts_with(PRUNED_MARKER))
        .map(|(i, _)| i)
        .collect();
    let prunable = candidates.len().saturating_sub(KEEP_RECENT_TOOL_RESULTS);

    let mut freed = 0;
    let mut pruned = 0;
    for &index in &candidates[..prunable] {
        if freed >= excess {
            break;
        }
        let message = &mut messages[index];
        let summary = summarize_tool_result(message);
        let kept = summary.len() / CHARS_PER_TOKEN + MESSAGE_OVERHEAD_TOKENS;
        let saved = message_tokens(message).saturating_sub(kept);
        if saved == 0 {
            continue;
        }
        message.content = summary;
        freed += saved;
        pruned += 1;
    }
    pruned
}

fn summarize_tool_result(message: &Message) -> String {
    let tool = message.name.as_deref().unwrap_or("tool");
    let first_line: String = message
        .content
        .lines()
        .next()
        .unwrap_or_default()
        .chars()
        .take(80)
        .collect();
    format!(
        "{PRUNED_MARKER} {tool} output, {} chars] {first_line}",
        message.content.len()
    )
}
