use super::StepEvent;
use crate::agents::AgentResponse;
use crate::error::Result;
use serde::Serialize;

/// Maximum characters of tool arguments or output carried on the wire
pub const PREVIEW_CHARS: usize = 200;

/// Wire event sent to streaming clients
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Always first
    Start {
        /// Requested agent, or `auto`
        agent: String,
    },
    /// Progress note
    Status {
        /// Status text
        status: String,
        /// Seconds since the run started
        elapsed: f64,
    },
    /// Model text
    Token {
        /// Text chunk
        text: String,
    },
    /// Tool started
    ToolStart {
        /// Tool name
        tool: String,
        /// Truncated arguments
        args: String,
    },
    /// Tool finished
    ToolEnd {
        /// Tool name
        tool: String,
        /// Whether the tool succeeded
        success: bool,
        /// Truncated output on success
        #[serde(skip_serializing_if = "Option::is_none")]
        output: Option<String>,
        /// Truncated error on failure
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    /// Terminal: success
    Done {
        /// Agent that answered
        agent: String,
        /// Model that produced the answer
        model_used: Option<String>,
        /// Model calls made
        iterations: u32,
        /// Tool calls made
        tool_calls_count: usize,
        /// Tokens used
        total_tokens: u32,
        /// Seconds taken
        elapsed: f64,
    },
    /// Terminal: failure
    Error {
        /// What went wrong
        message: String,
    },
}

impl StreamEvent {
    /// SSE event name
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Start { .. } => "start",
            Self::Status { .. } => "status",
            Self::Token { .. } => "token",
            Self::ToolStart { .. } => "tool_start",
            Self::ToolEnd { .. } => "tool_end",
            Self::Done { .. } => "done",
            Self::Error { .. } => "error",
        }
    }

    /// JSON payload without the type tag, for an SSE `data:` line
    #[must_use]
    pub fn data(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or_default();
        if let Some(map) = value.as_object_mut() {
            map.remove("type");
        }
        value
    }

    /// Whether this event ends the stream
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Error { .. })
    }
}

/// Cut `text` to `max` characters, appending `...` when shortened
#[must_use]
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

fn secs(ms: u64) -> f64 {
    (ms as f64 / 100.0).round() / 10.0
}

/// Turns step events into the wire protocol.
///
/// Guarantees `start` first and exactly one terminal event last. Anything
/// offered after the terminal event is dropped.
#[derive(Debug)]
pub struct EventStreamAdapter {
    agent_label: String,
    started: bool,
    terminated: bool,
}

impl EventStreamAdapter {
    /// Create an adapter; `agent` is the explicitly requested agent, if any
    #[must_use]
    pub fn new(agent: Option<&str>) -> Self {
        Self {
            agent_label: agent.unwrap_or("auto").to_string(),
            started: false,
            terminated: false,
        }
    }

    /// Whether the terminal event has been produced
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// The `start` event, produced once
    pub fn start(&mut self) -> Option<StreamEvent> {
        if self.started {
            return None;
        }
        self.started = true;
        Some(StreamEvent::Start {
            agent: self.agent_label.clone(),
        })
    }

    /// Map one step event; `start` is prepended if it has not been sent
    pub fn adapt(&mut self, step: StepEvent) -> Vec<StreamEvent> {
        if self.terminated {
            return Vec::new();
        }
        let mut out: Vec<StreamEvent> = self.start().into_iter().collect();

        let event = match step {
            StepEvent::Started { agent } => StreamEvent::Status {
                status: format!("Agent: {agent}"),
                elapsed: 0.0,
            },
            StepEvent::Status { status, elapsed_ms } => StreamEvent::Status {
                status,
                elapsed: secs(elapsed_ms),
            },
            StepEvent::Token { text } => StreamEvent::Token { text },
            StepEvent::ToolStarted { tool, args, .. } => StreamEvent::ToolStart {
                tool,
                args: truncate_chars(&args.to_string(), PREVIEW_CHARS),
            },
            StepEvent::ToolEnded {
                tool,
                success,
                output,
                ..
            } => {
                let preview = truncate_chars(&output, PREVIEW_CHARS);
                StreamEvent::ToolEnd {
                    tool,
                    success,
                    output: success.then(|| preview.clone()),
                    error: (!success).then_some(preview),
                }
            }
            StepEvent::Finished {
                agent,
                model_used,
                iterations,
                tool_calls_count,
                total_tokens,
                elapsed_ms,
            } => StreamEvent::Done {
                agent,
                model_used,
                iterations,
                tool_calls_count,
                total_tokens,
                elapsed: secs(elapsed_ms),
            },
            StepEvent::Failed { message, .. } => StreamEvent::Error { message },
        };

        self.terminated = event.is_terminal();
        out.push(event);
        out
    }

    /// Close the stream from the run's outcome.
    ///
    /// Returns the terminal event if the step events did not already
    /// provide one.
    pub fn finish(&mut self, outcome: &Result<AgentResponse>) -> Vec<StreamEvent> {
        if self.terminated {
            return Vec::new();
        }
        let mut out: Vec<StreamEvent> = self.start().into_iter().collect();
        let event = match outcome {
            Ok(response) => match &response.error {
                Some(failure) => StreamEvent::Error {
                    message: failure.to_string(),
                },
                None => StreamEvent::Done {
                    agent: response.agent_name.clone(),
                    model_used: response.model_used.clone(),
                    iterations: response.iterations,
                    tool_calls_count: response.tool_calls.len(),
                    total_tokens: response.usage.total_tokens,
                    elapsed: secs(response.elapsed_ms),
                },
            },
            Err(e) => StreamEvent::Error {
                message: e.to_string(),
            },
        };
        self.terminated = true;
        out.push(event);
        out
    }
}
