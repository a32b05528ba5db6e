use super::*;
use crate::permission::{MockApprover, MockPermissionGate};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};

struct EchoTool {
    definition: ToolDefinition,
    calls: AtomicUsize,
}

impl EchoTool {
    fn new(name: &str, risk: RiskLevel) -> Self {
        Self {
            definition: ToolDefinition::new(name, "Echo the text argument")
                .with_risk_level(risk)
                .with_parameters(json!({
                    "type": "object",
                    "properties": {"text": {"type": "string"}},
                    "required": ["text"]
                })),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait::async_trait]
impl Tool for EchoTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, args: serde_json::Value) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let text = args["text"].as_str().unwrap_or_default();
        if text == "boom" {
            return Err(Error::Execution("exploded".to_string()));
        }
        Ok(text.to_string())
    }
}

struct SlowTool(ToolDefinition);

#[async_trait::async_trait]
impl Tool for SlowTool {
    fn definition(&self) -> &ToolDefinition {
        &self.0
    }

    async fn execute(&self, _args: serde_json::Value) -> Result<String> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok("late".to_string())
    }
}

fn registry_with(tool: Arc<EchoTool>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(tool);
    registry
}

#[test]
fn test_risk_level() {
    assert_eq!(RiskLevel::Low.as_str(), "low");
    assert!(!RiskLevel::Low.requires_confirmation());
    assert!(RiskLevel::Medium.requires_confirmation());
    assert!(RiskLevel::High.requires_confirmation());
    assert!(RiskLevel::Low.is_read_only());
}

#[test]
fn test_register_replaces_same_name() {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(EchoTool::new("echo", RiskLevel::Low)));
    registry.register(Arc::new(EchoTool::new("echo", RiskLevel::High)));

    assert_eq!(registry.len(), 1);
    assert_eq!(
        registry.get("echo").unwrap().definition().risk_level,
        RiskLevel::High
    );
}

#[test]
fn test_llm_definitions_respects_allowed() {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(EchoTool::new("a", RiskLevel::Low)));
    registry.register(Arc::new(EchoTool::new("b", RiskLevel::Low)));

    assert_eq!(registry.llm_definitions(&[]).len(), 2);
    let only_b = registry.llm_definitions(&["b".to_string()]);
    assert_eq!(only_b.len(), 1);
    assert_eq!(only_b[0].name, "b");
}

#[tokio::test]
async fn test_execute_success() {
    let tool = Arc::new(EchoTool::new("echo", RiskLevel::Low));
    let registry = registry_with(tool.clone());

    let result = registry.execute("echo", json!({"text": "hi"})).await;
    assert!(!result.is_error);
    assert_eq!(result.output, "hi");
    assert_eq!(tool.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_unknown_tool_is_data() {
    let registry = ToolRegistry::new();
    let result = registry.execute("nope", json!({})).await;
    assert!(result.is_error);
    assert_eq!(result.failure, Some(ToolFailureKind::UnknownTool));
    assert_eq!(result.output, "Unknown tool: nope");
}

#[tokio::test]
async fn test_invalid_arguments_skip_execution() {
    let tool = Arc::new(EchoTool::new("echo", RiskLevel::Low));
    let registry = registry_with(tool.clone());

    let result = registry.execute("echo", json!({"text": 42})).await;
    assert!(result.is_error);
    assert_eq!(result.failure, Some(ToolFailureKind::InvalidArguments));
    assert_eq!(tool.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_tool_error_is_data() {
    let registry = registry_with(Arc::new(EchoTool::new("echo", RiskLevel::Low)));
    let result = registry.execute("echo", json!({"text": "boom"})).await;
    assert!(result.is_error);
    assert_eq!(result.failure, Some(ToolFailureKind::ExecutionFailure));
    assert_eq!(result.output, "exploded");
}

#[tokio::test]
async fn test_gate_deny_is_data() {
    let tool = Arc::new(EchoTool::new("echo", RiskLevel::High));
    let mut gate = MockPermissionGate::new();
    gate.expect_check()
        .times(1)
        .returning(|_, _| PermissionDecision::Deny);
    let registry = registry_with(tool.clone()).with_permission_gate(Arc::new(gate));

    let result = registry.execute("echo", json!({"text": "rm"})).await;
    assert!(result.is_error);
    assert_eq!(result.failure, Some(ToolFailureKind::PermissionDenied));
    assert_eq!(result.output, DENIED_MESSAGE);
    assert_eq!(tool.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_ask_without_approver_denies() {
    let mut gate = MockPermissionGate::new();
    gate.expect_check().returning(|_, _| PermissionDecision::Ask);
    let registry = registry_with(Arc::new(EchoTool::new("echo", RiskLevel::Medium)))
        .with_permission_gate(Arc::new(gate));

    let result = registry.execute("echo", json!({"text": "x"})).await;
    assert_eq!(result.failure, Some(ToolFailureKind::PermissionDenied));
}

#[tokio::test]
async fn test_ask_resolved_by_approver() {
    let mut gate = MockPermissionGate::new();
    gate.expect_check().returning(|_, _| PermissionDecision::Ask);
    let mut approver = MockApprover::new();
    approver
        .expect_approve()
        .withf(|tool, _| tool == "echo")
        .times(1)
        .returning(|_, _| true);

    let registry = registry_with(Arc::new(EchoTool::new("echo", RiskLevel::Medium)))
        .with_permission_gate(Arc::new(gate))
        .with_approver(Arc::new(approver));

    let result = registry.execute("echo", json!({"text": "ok"})).await;
    assert!(!result.is_error);
    assert_eq!(result.output, "ok");
}

#[tokio::test]
async fn test_timeout_is_execution_failure() {
    let mut registry = ToolRegistry::new().with_timeout(Duration::from_millis(20));
    registry.register(Arc::new(SlowTool(ToolDefinition::new("slow", "sleeps"))));

    let result = registry.execute("slow", json!({})).await;
    assert!(result.is_error);
    assert_eq!(result.failure, Some(ToolFailureKind::ExecutionFailure));
    assert!(result.output.contains("timed out"));
}
