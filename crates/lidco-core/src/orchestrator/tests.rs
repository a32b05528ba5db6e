use super::*;
use crate::agents::{builtin_agents, AgentConfig, RunFailure};
use crate::memory::MockMemoryStore;
use crate::test_support::{echo_registry, mock_router, tool_reply, MOCK_MODEL};
use lidco_llm::{MessageRole, MockFailure, MockModelClient, ModelResponse};
use serde_json::json;
use std::path::Path;

fn settings(project_dir: &Path) -> OrchestratorSettings {
    OrchestratorSettings {
        default_agent: "coder".to_string(),
        history_limit: 4,
        history_window: 2,
        max_file_chars: 10,
        project_dir: project_dir.to_path_buf(),
    }
}

fn orchestrator_with(
    mock: Arc<MockModelClient>,
    agents: Vec<AgentConfig>,
    project_dir: &Path,
) -> Orchestrator {
    let runtime = AgentRuntime::new(mock_router(mock), echo_registry(), 0);
    Orchestrator::new(
        Arc::new(AgentRegistry::new(agents)),
        runtime,
        settings(project_dir),
    )
}

fn orchestrator(mock: Arc<MockModelClient>) -> Orchestrator {
    orchestrator_with(mock, builtin_agents(), Path::new("."))
}

async fn handle(orch: &Orchestrator, request: ChatRequest) -> Result<AgentResponse> {
    orch.handle(&request, &EventEmitter::noop(), &CancellationToken::new())
        .await
}

// ============================================================================
// Routing
// ============================================================================

#[test]
fn test_normalize_reply() {
    assert_eq!(normalize_reply("  \"Reviewer.\"\n"), "reviewer");
    assert_eq!(normalize_reply("'planner'"), "planner");
    assert_eq!(normalize_reply("coder"), "coder");
}

#[test]
fn test_keyword_route() {
    assert_eq!(keyword_route("Plan the migration", "coder"), "planner");
    assert_eq!(keyword_route("please design an API", "coder"), "planner");
    assert_eq!(keyword_route("Audit this module", "coder"), "reviewer");
    assert_eq!(keyword_route("there is a bug in login", "coder"), "debugger");
    assert_eq!(keyword_route("TypeError: x is undefined, error on load", "coder"), "debugger");
    assert_eq!(keyword_route("add a button", "coder"), "coder");
    // Planning wins over debugging
    assert_eq!(keyword_route("plan how to fix this bug", "coder"), "planner");
}

#[test]
fn test_router_prompt_lists_agents() {
    let registry = AgentRegistry::new(builtin_agents());
    let prompt = router_prompt(&registry.snapshot(), "coder");
    assert!(prompt.starts_with("Route to agent. Output name only. Default: coder."));
    assert!(prompt.contains("- reviewer: Code review: quality, security."));
    assert!(prompt.contains("- tester: "));
}

#[tokio::test]
async fn test_explicit_route_makes_no_model_call() {
    let mock = Arc::new(MockModelClient::default());
    let orch = orchestrator(mock.clone());
    let snapshot = orch.registry.snapshot();

    let name = orch.route(&snapshot, "review this", Some("Debugger")).await.unwrap();
    assert_eq!(name, "debugger");
    assert_eq!(mock.call_count(), 0);
}

#[tokio::test]
async fn test_explicit_unknown_agent_is_routed() {
    let mock = Arc::new(MockModelClient::default());
    mock.push_response(ModelResponse::text("architect"));
    mock.push_response(ModelResponse::text("It is a CLI."));
    let orch = orchestrator(mock.clone());

    let response = handle(
        &orch,
        ChatRequest::new("explain what this project does").with_agent("ghost"),
    )
    .await
    .unwrap();
    assert_eq!(response.agent_name, "architect");
    assert_eq!(response.content, "It is a CLI.");
    assert_eq!(mock.requests()[0].max_tokens, Some(50));
}

#[tokio::test]
async fn test_explicit_unknown_agent_falls_back_to_keywords() {
    let mock = Arc::new(MockModelClient::default());
    mock.fail_model(MOCK_MODEL, MockFailure::Auth);
    let orch = orchestrator(mock);
    let snapshot = orch.registry.snapshot();

    let name = orch
        .route(&snapshot, "debug the crash", Some("ghost"))
        .await
        .unwrap();
    assert_eq!(name, "debugger");
}

#[tokio::test]
async fn test_no_agents_is_configuration_error() {
    let mock = Arc::new(MockModelClient::default());
    let orch = orchestrator_with(mock.clone(), Vec::new(), Path::new("."));

    let err = handle(&orch, ChatRequest::new("hi")).await.unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
    assert_eq!(mock.call_count(), 0);
}

#[tokio::test]
async fn test_model_routing() {
    let mock = Arc::new(MockModelClient::default());
    mock.push_response(ModelResponse::text("\"Reviewer.\""));
    let orch = orchestrator(mock.clone());
    let snapshot = orch.registry.snapshot();

    let name = orch.route(&snapshot, "look at my code", None).await.unwrap();
    assert_eq!(name, "reviewer");

    let request = &mock.requests()[0];
    assert_eq!(request.temperature, Some(0.0));
    assert_eq!(request.max_tokens, Some(50));
    assert!(request.tools.is_empty());
    assert_eq!(request.messages[0].role, MessageRole::System);
    assert_eq!(request.messages[1].content, "look at my code");
}

#[tokio::test]
async fn test_unknown_reply_falls_back_to_keywords() {
    let mock = Arc::new(MockModelClient::default());
    mock.push_response(ModelResponse::text("banana"));
    let orch = orchestrator(mock);
    let snapshot = orch.registry.snapshot();

    let name = orch.route(&snapshot, "please audit the auth flow", None).await.unwrap();
    assert_eq!(name, "reviewer");
}

#[tokio::test]
async fn test_routing_failure_falls_back_to_keywords() {
    let mock = Arc::new(MockModelClient::default());
    mock.fail_model(MOCK_MODEL, MockFailure::Auth);
    let orch = orchestrator(mock);
    let snapshot = orch.registry.snapshot();

    assert_eq!(
        orch.route(&snapshot, "debug the crash", None).await.unwrap(),
        "debugger"
    );
    assert_eq!(orch.route(&snapshot, "add a button", None).await.unwrap(), "coder");
}

#[tokio::test]
async fn test_keyword_target_missing_uses_default_then_first() {
    let mock = Arc::new(MockModelClient::default());
    mock.set_default_response(ModelResponse::text("nobody"));
    let agents = vec![
        AgentConfig::new("coder", "c", "p"),
        AgentConfig::new("writer", "w", "p"),
    ];
    let orch = orchestrator_with(mock.clone(), agents, Path::new("."));
    let snapshot = orch.registry.snapshot();
    assert_eq!(orch.route(&snapshot, "plan it", None).await.unwrap(), "coder");

    let agents = vec![
        AgentConfig::new("zeta", "z", "p"),
        AgentConfig::new("alpha", "a", "p"),
    ];
    let orch = orchestrator_with(mock, agents, Path::new("."));
    let snapshot = orch.registry.snapshot();
    assert_eq!(orch.route(&snapshot, "plan it", None).await.unwrap(), "alpha");
}

#[tokio::test]
async fn test_single_agent_skips_model() {
    let mock = Arc::new(MockModelClient::default());
    let orch = orchestrator_with(
        mock.clone(),
        vec![AgentConfig::new("solo", "s", "p")],
        Path::new("."),
    );
    let snapshot = orch.registry.snapshot();

    assert_eq!(orch.route(&snapshot, "review", None).await.unwrap(), "solo");
    assert_eq!(mock.call_count(), 0);
}

// ============================================================================
// Handling
// ============================================================================

#[tokio::test]
async fn test_default_agent_for_plain_message() {
    let mock = Arc::new(MockModelClient::default());
    mock.push_response(ModelResponse::text("unsure"));
    mock.push_response(ModelResponse::text("Button added"));
    let orch = orchestrator(mock);

    let response = handle(&orch, ChatRequest::new("add a button")).await.unwrap();
    assert_eq!(response.agent_name, "coder");
    assert!(response.iterations >= 1);
    assert_eq!(response.content, "Button added");
}

#[tokio::test]
async fn test_handle_is_idempotent_on_fresh_sessions() {
    let run = || async {
        let mock = Arc::new(MockModelClient::default());
        mock.push_response(ModelResponse::text("coder"));
        mock.push_response(tool_reply("c1", "echo", json!({"text": "a"})));
        mock.push_response(ModelResponse::text("final"));
        let orch = orchestrator(mock);
        handle(&orch, ChatRequest::new("do it")).await.unwrap()
    };

    let first = run().await;
    let second = run().await;
    assert_eq!(first.content, second.content);
    assert_eq!(first.agent_name, second.agent_name);
    assert_eq!(first.iterations, second.iterations);
    assert_eq!(first.tool_calls.len(), second.tool_calls.len());
}

#[tokio::test]
async fn test_failed_run_returns_response() {
    let mock = Arc::new(MockModelClient::default());
    mock.fail_model(MOCK_MODEL, MockFailure::InvalidRequest);
    let orch = orchestrator(mock);

    let response = handle(&orch, ChatRequest::new("hi").with_agent("coder"))
        .await
        .unwrap();
    assert!(response.incomplete);
    assert!(matches!(response.error, Some(RunFailure::ProviderExhausted(_))));
    assert_eq!(orch.history().len(), 2);
}

#[tokio::test]
async fn test_history_window_and_limit() {
    let mock = Arc::new(MockModelClient::default());
    let orch = orchestrator(mock.clone());

    for i in 0..3 {
        mock.push_response(ModelResponse::text(format!("answer {i}")));
        handle(&orch, ChatRequest::new(format!("question {i}")).with_agent("coder"))
            .await
            .unwrap();
    }

    // Limit of 4 keeps the last two exchanges
    let history = orch.history();
    assert_eq!(history.len(), 4);
    assert_eq!(history[0].content, "question 1");
    assert_eq!(history[3].content, "answer 2");
    assert_eq!(history[3].agent_name.as_deref(), Some("coder"));

    // The third run saw a window of 2 turns: question 1 / answer 1
    let third = &mock.requests()[2];
    let contents: Vec<&str> = third.messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(&contents[1..], &["question 1", "answer 1", "question 2"]);

    orch.clear_history();
    assert!(orch.history().is_empty());
}

#[tokio::test]
async fn test_context_files() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("notes.md"), "0123456789abcdef").unwrap();
    let mock = Arc::new(MockModelClient::default());
    let orch = orchestrator_with(mock.clone(), builtin_agents(), dir.path());

    let request = ChatRequest::new("summarize")
        .with_agent("coder")
        .with_context_files(vec!["notes.md".to_string(), "missing.md".to_string()]);
    handle(&orch, request).await.unwrap();

    let system = &mock.requests()[0].messages[0].content;
    assert!(system.contains("## File: notes.md\n```\n0123456789\n... [truncated at 10 chars]"));
    assert!(!system.contains("abcdef"));
    assert!(system.contains("## File: missing.md\n(unreadable:"));
}

#[tokio::test]
async fn test_memory_context_and_recording() {
    let mut memory = MockMemoryStore::new();
    memory
        .expect_load_context()
        .withf(|scope| scope == "coder")
        .returning(|_| Ok("## Memory\n- [task] earlier: fixed login".to_string()));
    memory
        .expect_record()
        .withf(|entry| entry.tags.contains(&"echo".to_string()) && entry.category == "task")
        .times(1)
        .returning(|_| Ok(()));

    let mock = Arc::new(MockModelClient::default());
    mock.push_response(tool_reply("c1", "echo", json!({"text": "x"})));
    mock.push_response(ModelResponse::text("done"));
    mock.push_response(ModelResponse::text("plain answer"));
    let orch = orchestrator(mock.clone()).with_memory(Arc::new(memory));

    handle(&orch, ChatRequest::new("use a tool").with_agent("coder"))
        .await
        .unwrap();
    // No tools on the second turn, so nothing new is recorded
    handle(&orch, ChatRequest::new("just talk").with_agent("coder"))
        .await
        .unwrap();

    assert!(mock.requests()[0].messages[0]
        .content
        .contains("- [task] earlier: fixed login"));
}

#[tokio::test]
async fn test_usage_recorded_in_ledger() {
    let mock = Arc::new(MockModelClient::default());
    mock.push_response(ModelResponse::text("coder").with_usage(lidco_llm::TokenUsage::new(5, 1)));
    mock.push_response(ModelResponse::text("ok").with_usage(lidco_llm::TokenUsage::new(10, 2)));
    let ledger = Arc::new(TokenLedger::new(0));
    let orch = orchestrator(mock).with_ledger(ledger.clone());

    handle(&orch, ChatRequest::new("hello")).await.unwrap();

    let snapshot = ledger.snapshot();
    assert_eq!(snapshot.by_role["routing"].total_tokens, 6);
    assert_eq!(snapshot.by_role["coder"].total_tokens, 12);
    assert_eq!(snapshot.total.total_tokens, 18);
}

#[tokio::test]
async fn test_memory_summary_lists_each_tool_once() {
    let mut memory = MockMemoryStore::new();
    memory.expect_load_context().returning(|_| Ok(String::new()));
    memory
        .expect_record()
        .withf(|entry| {
            entry.content.contains("Tools: echo, missing\n")
                && entry.tags == ["coder", "echo", "missing"]
        })
        .times(1)
        .returning(|_| Ok(()));

    let mock = Arc::new(MockModelClient::default());
    mock.push_response(ModelResponse::with_tool_calls(vec![
        lidco_llm::ToolCall::new("c1", "echo", json!({"text": "a"}).to_string()),
        lidco_llm::ToolCall::new("c2", "missing", "{}"),
        lidco_llm::ToolCall::new("c3", "echo", json!({"text": "b"}).to_string()),
    ]));
    mock.push_response(ModelResponse::text("done"));
    let orch = orchestrator(mock).with_memory(Arc::new(memory));

    let response = handle(&orch, ChatRequest::new("use tools").with_agent("coder"))
        .await
        .unwrap();
    assert_eq!(response.tool_calls.len(), 3);
}
