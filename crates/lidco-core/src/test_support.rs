//! Shared fixtures for unit tests

use crate::agents::AgentRuntime;
use lidco_llm::{
    ClientSet, MockModelClient, ModelResponse, ModelRouter, RetryConfig, RouterConfig, ToolCall,
};
use lidco_tools::{PermissionPolicy, Tool, ToolDefinition, ToolRegistry};
use std::sync::Arc;

pub(crate) const MOCK_MODEL: &str = "mock-model";

/// Router whose every model id goes to `mock`, with zero backoff
pub(crate) fn mock_router(mock: Arc<MockModelClient>) -> Arc<ModelRouter> {
    let config = RouterConfig::default()
        .with_default_model(MOCK_MODEL)
        .with_retry(RetryConfig::immediate());
    Arc::new(ModelRouter::new(config, ClientSet::new().with("", mock)))
}

/// Echoes its `text` argument back, `repeat` times (default once)
pub(crate) struct EchoTool {
    definition: ToolDefinition,
}

impl EchoTool {
    pub(crate) fn new() -> Self {
        Self {
            definition: ToolDefinition::new("echo", "Echo text").with_parameters(
                serde_json::json!({
                    "type": "object",
                    "properties": {
                        "text": {"type": "string"},
                        "repeat": {"type": "integer"}
                    },
                    "required": ["text"]
                }),
            ),
        }
    }
}

#[async_trait::async_trait]
impl Tool for EchoTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, args: serde_json::Value) -> lidco_tools::Result<String> {
        let text = args["text"].as_str().unwrap_or_default();
        let repeat = args["repeat"].as_u64().unwrap_or(1) as usize;
        Ok(format!("echo: {}", text.repeat(repeat)))
    }
}

/// Registry holding only [`EchoTool`], everything allowed
pub(crate) fn echo_registry() -> Arc<ToolRegistry> {
    let mut registry =
        ToolRegistry::new().with_permission_gate(Arc::new(PermissionPolicy::permissive()));
    registry.register(Arc::new(EchoTool::new()));
    Arc::new(registry)
}

pub(crate) fn runtime(mock: Arc<MockModelClient>) -> AgentRuntime {
    AgentRuntime::new(mock_router(mock), echo_registry(), 0)
}

/// A model reply requesting one tool call
pub(crate) fn tool_reply(id: &str, name: &str, args: serde_json::Value) -> ModelResponse {
    ModelResponse::with_tool_calls(vec![ToolCall::new(id, name, args.to_string())])
}
