//! Integration tests for LIDCO
//!
//! These tests verify the integration between the crates:
//! - lidco-llm: router, fallback and the scripted model client
//! - lidco-tools: builtin tools against a real project directory
//! - lidco-core: routing, agent runs and the streaming session

use std::path::Path;
use std::sync::Arc;

use lidco_core::{AgentConfig, ChatRequest, LidcoConfig, SessionBuilder, StreamEvent};
use lidco_llm::{MockModelClient, ModelResponse, RetryConfig, ToolCall};
use lidco_tools::{register_builtins, ToolRegistry};
use serde_json::json;

fn config() -> LidcoConfig {
    let mut config = LidcoConfig::default();
    config.llm.router.default_model = "mock-model".to_string();
    config.llm.router.retry = RetryConfig::immediate();
    config.memory.enabled = false;
    config.agents.load_agent_files = false;
    config
}

fn project() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("src")).unwrap();
    std::fs::write(
        dir.path().join("Cargo.toml"),
        "[package]\nname = \"demo\"\nversion = \"0.1.0\"\n",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("src/main.rs"),
        "fn main() {\n    println!(\"hello\");\n}\n",
    )
    .unwrap();
    dir
}

fn call(id: &str, name: &str, args: serde_json::Value) -> ModelResponse {
    ModelResponse::with_tool_calls(vec![ToolCall::new(id, name, args.to_string())])
}

// ============================================================================
// Tool Registry Integration Tests
// ============================================================================

#[test]
fn test_builtin_tools_registered() {
    let dir = project();
    let mut registry = ToolRegistry::new();
    register_builtins(&mut registry, dir.path());

    assert_eq!(
        registry.list_names(),
        vec!["bash", "file_edit", "file_read", "file_write", "git", "glob", "grep"]
    );
    let names: Vec<String> = registry
        .llm_definitions(&["grep".to_string()])
        .into_iter()
        .map(|d| d.name)
        .collect();
    assert_eq!(names, vec!["grep"]);
}

// ============================================================================
// Session Integration Tests
// ============================================================================

#[tokio::test]
async fn test_agent_reads_project_file() {
    let dir = project();
    let mock = Arc::new(MockModelClient::default());
    mock.push_response(call("c1", "file_read", json!({"path": "src/main.rs"})));
    mock.push_response(ModelResponse::text("It prints hello."));

    let session = SessionBuilder::new(config(), dir.path())
        .with_client("", mock.clone())
        .build()
        .await
        .unwrap();

    let response = session
        .handle_chat(ChatRequest::new("what does main do?").with_agent("reviewer"))
        .await
        .unwrap();

    assert!(response.is_success());
    assert_eq!(response.content, "It prints hello.");
    assert_eq!(response.tool_calls.len(), 1);
    assert!(response.tool_calls[0].success);
    assert!(response.tool_calls[0].output.contains("println!(\"hello\")"));

    // The reviewer only sees its read-only tools
    let requests = mock.requests();
    let offered: Vec<&str> = requests[0].tools.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(offered, vec!["file_read", "git", "glob", "grep"]);

    // Project context reaches the system prompt
    let system = &requests[0].messages[0].content;
    assert!(system.contains("# Context"));
    assert!(system.contains("Cargo.toml"));
}

#[tokio::test]
async fn test_routing_model_picks_agent() {
    let dir = project();
    let mock = Arc::new(MockModelClient::default());
    mock.push_response(ModelResponse::text("Reviewer"));
    mock.push_response(ModelResponse::text("Looks fine."));

    let session = SessionBuilder::new(config(), dir.path())
        .with_client("", mock.clone())
        .build()
        .await
        .unwrap();

    let response = session
        .handle_chat(ChatRequest::new("check my changes"))
        .await
        .unwrap();
    assert_eq!(response.agent_name, "reviewer");
    assert_eq!(mock.call_count(), 2);

    let routing = &mock.requests()[0];
    assert_eq!(routing.temperature, Some(0.0));
    assert!(routing.tools.is_empty());
}

#[tokio::test]
async fn test_unusable_routing_reply_falls_back_to_keywords() {
    let dir = project();
    let mock = Arc::new(MockModelClient::default());
    mock.push_response(ModelResponse::text("I think the best choice is none"));
    mock.push_response(ModelResponse::text("Found it."));

    let session = SessionBuilder::new(config(), dir.path())
        .with_client("", mock)
        .build()
        .await
        .unwrap();

    let response = session
        .handle_chat(ChatRequest::new("there is a bug in the parser"))
        .await
        .unwrap();
    assert_eq!(response.agent_name, "debugger");
}

#[tokio::test]
async fn test_stream_edit_round_trip() {
    let dir = project();
    let mock = Arc::new(MockModelClient::default());
    mock.push_response(call(
        "c1",
        "file_edit",
        json!({"path": "src/main.rs", "old_string": "hello", "new_string": "goodbye"}),
    ));
    mock.push_response(ModelResponse::text("Updated the greeting."));

    let session = SessionBuilder::new(config(), dir.path())
        .with_client("", mock)
        .with_agents(vec![AgentConfig::new(
            "coder",
            "Writes code",
            "You are {agent_name}.",
        )])
        .with_approver(Arc::new(lidco_tools::FixedApprover(true)))
        .build()
        .await
        .unwrap();

    let (events, response) = session
        .handle_chat_stream(ChatRequest::new("say goodbye instead"))
        .collect()
        .await;
    let response = response.unwrap();

    assert!(response.is_success());
    let main = std::fs::read_to_string(Path::new(dir.path()).join("src/main.rs")).unwrap();
    assert!(main.contains("goodbye"));

    assert!(matches!(events.first(), Some(StreamEvent::Start { agent }) if agent == "auto"));
    assert!(events
        .iter()
        .any(|e| matches!(e, StreamEvent::ToolEnd { tool, success: true, .. } if tool == "file_edit")));
    assert!(matches!(events.last(), Some(StreamEvent::Done { tool_calls_count: 1, .. })));
}
