use serde::Serialize;
use tokio::sync::mpsc;

/// One step of an agent run, in emission order
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepEvent {
    /// Agent selected and loop entered
    Started {
        /// Agent name
        agent: String,
    },
    /// Progress note, emitted before each model call
    Status {
        /// Human-readable status
        status: String,
        /// Milliseconds since the run started
        elapsed_ms: u64,
    },
    /// Model text
    Token {
        /// Text chunk
        text: String,
    },
    /// About to execute a tool
    ToolStarted {
        /// Tool name
        tool: String,
        /// Tool call id from the model
        call_id: String,
        /// Arguments as sent by the model
        args: serde_json::Value,
    },
    /// Tool finished
    ToolEnded {
        /// Tool name
        tool: String,
        /// Tool call id from the model
        call_id: String,
        /// Whether the tool succeeded
        success: bool,
        /// Output or error text
        output: String,
        /// Execution time
        duration_ms: u64,
    },
    /// Run ended with a final answer
    Finished {
        /// Agent name
        agent: String,
        /// Model that produced the last reply
        model_used: Option<String>,
        /// Model calls made
        iterations: u32,
        /// Tool calls made
        tool_calls_count: usize,
        /// Tokens used across the run
        total_tokens: u32,
        /// Run duration
        elapsed_ms: u64,
    },
    /// Run ended in a failed state
    Failed {
        /// Agent name
        agent: String,
        /// Failure description
        message: String,
    },
}

impl StepEvent {
    /// Whether this event ends the run
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished { .. } | Self::Failed { .. })
    }
}

/// Sending half of a run's event channel.
///
/// Sends never block and never fail the run; once the receiver is gone,
/// events are dropped.
#[derive(Debug, Clone, Default)]
pub struct EventEmitter {
    sender: Option<mpsc::UnboundedSender<StepEvent>>,
}

impl EventEmitter {
    /// Create an emitter and its receiver
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<StepEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { sender: Some(tx) }, rx)
    }

    /// Emitter that discards everything
    #[must_use]
    pub fn noop() -> Self {
        Self::default()
    }

    /// Emit an event
    pub fn emit(&self, event: StepEvent) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(event);
        }
    }

    /// Emit a status event
    pub fn status(&self, status: impl Into<String>, elapsed_ms: u64) {
        self.emit(StepEvent::Status {
            status: status.into(),
            elapsed_ms,
        });
    }
}
