//! Function-calling types shared between the router and the tool layer

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Tool schema offered to a model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name
    pub name: String,
    /// What the tool does, shown to the model
    pub description: String,
    /// JSON schema for the arguments object
    pub parameters: serde_json::Value,
}

impl ToolDefinition {
    /// Create a new tool definition
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

/// A tool invocation requested by the model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Provider-assigned call id
    pub id: String,
    /// Tool name
    pub name: String,
    /// Arguments as a raw JSON string
    pub arguments: String,
}

impl ToolCall {
    /// Create a tool call
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }

    /// Parse the arguments string into JSON.
    ///
    /// Empty argument strings are treated as `{}`, some providers send them
    /// for zero-parameter tools.
    pub fn arguments_json(&self) -> Result<serde_json::Value> {
        if self.arguments.trim().is_empty() {
            return Ok(serde_json::Value::Object(serde_json::Map::new()));
        }
        serde_json::from_str(&self.arguments).map_err(|e| Error::InvalidResponse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arguments_json() {
        let call = ToolCall::new("c1", "grep", r#"{"pattern": "fn main"}"#);
        let args = call.arguments_json().unwrap();
        assert_eq!(args["pattern"], "fn main");
    }

    #[test]
    fn test_empty_arguments_are_object() {
        let call = ToolCall::new("c1", "glob", "  ");
        assert!(call.arguments_json().unwrap().is_object());
    }

    #[test]
    fn test_malformed_arguments() {
        let call = ToolCall::new("c1", "glob", "{not json");
        assert!(matches!(
            call.arguments_json(),
            Err(Error::InvalidResponse(_))
        ));
    }
}
