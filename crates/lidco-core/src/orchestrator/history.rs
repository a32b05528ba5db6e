//! Conversation history

use chrono::{DateTime, Utc};
use lidco_llm::Message;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    /// User message
    User,
    /// Agent answer
    Assistant,
    /// Tool output kept in history
    Tool,
}

/// One entry in the session history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// Who produced it
    pub role: TurnRole,
    /// Text
    pub content: String,
    /// When it was recorded
    pub timestamp: DateTime<Utc>,
    /// Agent that handled the turn
    pub agent_name: Option<String>,
    /// Tools called while producing it
    #[serde(default)]
    pub tool_calls: Vec<String>,
}

impl ConversationTurn {
    /// User turn
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
            timestamp: Utc::now(),
            agent_name: None,
            tool_calls: Vec::new(),
        }
    }

    /// Assistant turn
    pub fn assistant(
        content: impl Into<String>,
        agent_name: impl Into<String>,
        tool_calls: Vec<String>,
    ) -> Self {
        Self {
            role: TurnRole::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
            agent_name: Some(agent_name.into()),
            tool_calls,
        }
    }

    fn to_message(&self) -> Message {
        match self.role {
            TurnRole::User => Message::user(&self.content),
            TurnRole::Assistant => Message::assistant(&self.content),
            TurnRole::Tool => Message::assistant(format!("[tool output]\n{}", self.content)),
        }
    }
}

/// Append-only history with a size cap; the oldest turns go first
#[derive(Debug, Clone)]
pub struct History {
    turns: VecDeque<ConversationTurn>,
    limit: usize,
}

impl History {
    /// Create an empty history keeping at most `limit` turns
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            turns: VecDeque::new(),
            limit: limit.max(1),
        }
    }

    /// Append a turn, dropping the oldest beyond the limit
    pub fn push(&mut self, turn: ConversationTurn) {
        self.turns.push_back(turn);
        while self.turns.len() > self.limit {
            self.turns.pop_front();
        }
    }

    /// Last `n` turns as model messages, oldest first
    #[must_use]
    pub fn window(&self, n: usize) -> Vec<Message> {
        let skip = self.turns.len().saturating_sub(n);
        self.turns
            .iter()
            .skip(skip)
            .map(ConversationTurn::to_message)
            .collect()
    }

    /// All turns, oldest first
    #[must_use]
    pub fn turns(&self) -> Vec<ConversationTurn> {
        self.turns.iter().cloned().collect()
    }

    /// Number of turns
    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Check if empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Drop everything
    pub fn clear(&mut self) {
        self.turns.clear();
    }
}
