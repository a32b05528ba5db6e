use super::*;
use crate::agents::{AgentResponse, RunFailure};
use crate::error::Error;
use lidco_llm::TokenUsage;
use serde_json::json;

fn response(error: Option<RunFailure>) -> AgentResponse {
    AgentResponse {
        content: "answer".to_string(),
        agent_name: "coder".to_string(),
        model_used: Some("mock-model".to_string()),
        iterations: 2,
        tool_calls: Vec::new(),
        usage: TokenUsage::new(10, 5),
        elapsed_ms: 1250,
        incomplete: error.is_some(),
        error,
    }
}

fn finished() -> StepEvent {
    StepEvent::Finished {
        agent: "coder".to_string(),
        model_used: Some("mock-model".to_string()),
        iterations: 1,
        tool_calls_count: 0,
        total_tokens: 15,
        elapsed_ms: 400,
    }
}

#[test]
fn test_start_is_produced_once() {
    let mut adapter = EventStreamAdapter::new(None);
    assert_eq!(
        adapter.start(),
        Some(StreamEvent::Start {
            agent: "auto".to_string()
        })
    );
    assert_eq!(adapter.start(), None);
}

#[test]
fn test_adapt_prepends_start() {
    let mut adapter = EventStreamAdapter::new(Some("coder"));
    let events = adapter.adapt(StepEvent::Token {
        text: "hi".to_string(),
    });
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].name(), "start");
    assert_eq!(events[1].name(), "token");
}

#[test]
fn test_full_run_mapping() {
    let mut adapter = EventStreamAdapter::new(None);
    let mut events: Vec<StreamEvent> = adapter.start().into_iter().collect();
    for step in [
        StepEvent::Started {
            agent: "coder".to_string(),
        },
        StepEvent::Status {
            status: "Thinking (1/200)".to_string(),
            elapsed_ms: 1549,
        },
        StepEvent::ToolStarted {
            tool: "echo".to_string(),
            call_id: "c1".to_string(),
            args: json!({"text": "x"}),
        },
        StepEvent::ToolEnded {
            tool: "echo".to_string(),
            call_id: "c1".to_string(),
            success: true,
            output: "echo: x".to_string(),
            duration_ms: 3,
        },
        finished(),
    ] {
        events.extend(adapter.adapt(step));
    }

    let names: Vec<_> = events.iter().map(StreamEvent::name).collect();
    assert_eq!(
        names,
        ["start", "status", "status", "tool_start", "tool_end", "done"]
    );
    assert_eq!(
        events[1],
        StreamEvent::Status {
            status: "Agent: coder".to_string(),
            elapsed: 0.0
        }
    );
    assert_eq!(
        events[2],
        StreamEvent::Status {
            status: "Thinking (1/200)".to_string(),
            elapsed: 1.5
        }
    );
    assert_eq!(
        events[3],
        StreamEvent::ToolStart {
            tool: "echo".to_string(),
            args: r#"{"text":"x"}"#.to_string()
        }
    );
    assert!(adapter.is_terminated());
}

#[test]
fn test_tool_failure_carries_error() {
    let mut adapter = EventStreamAdapter::new(None);
    adapter.start();
    let events = adapter.adapt(StepEvent::ToolEnded {
        tool: "bash".to_string(),
        call_id: "c1".to_string(),
        success: false,
        output: "exit code 1".to_string(),
        duration_ms: 1,
    });
    assert_eq!(
        events,
        vec![StreamEvent::ToolEnd {
            tool: "bash".to_string(),
            success: false,
            output: None,
            error: Some("exit code 1".to_string()),
        }]
    );
}

#[test]
fn test_previews_are_truncated() {
    let mut adapter = EventStreamAdapter::new(None);
    adapter.start();
    let events = adapter.adapt(StepEvent::ToolEnded {
        tool: "file_read".to_string(),
        call_id: "c1".to_string(),
        success: true,
        output: "x".repeat(1000),
        duration_ms: 1,
    });
    let StreamEvent::ToolEnd {
        output: Some(output),
        ..
    } = &events[0]
    else {
        panic!("expected tool_end, got {events:?}");
    };
    assert_eq!(output.chars().count(), PREVIEW_CHARS + 3);
    assert!(output.ends_with("..."));
}

#[test]
fn test_events_after_terminal_are_dropped() {
    let mut adapter = EventStreamAdapter::new(None);
    adapter.start();
    assert_eq!(adapter.adapt(finished()).len(), 1);
    assert!(adapter
        .adapt(StepEvent::Token {
            text: "late".to_string()
        })
        .is_empty());
    assert!(adapter.finish(&Ok(response(None))).is_empty());
}

#[test]
fn test_finish_synthesizes_done() {
    let mut adapter = EventStreamAdapter::new(None);
    let events = adapter.finish(&Ok(response(None)));
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].name(), "start");
    assert_eq!(
        events[1],
        StreamEvent::Done {
            agent: "coder".to_string(),
            model_used: Some("mock-model".to_string()),
            iterations: 2,
            tool_calls_count: 0,
            total_tokens: 15,
            elapsed: 1.3,
        }
    );
}

#[test]
fn test_finish_maps_failed_run_to_error() {
    let mut adapter = EventStreamAdapter::new(None);
    adapter.start();
    let failure = RunFailure::Cancelled("Cancelled by user".to_string());
    let events = adapter.finish(&Ok(response(Some(failure))));
    assert_eq!(
        events,
        vec![StreamEvent::Error {
            message: "Cancelled by user".to_string()
        }]
    );
}

#[test]
fn test_finish_maps_configuration_error() {
    let mut adapter = EventStreamAdapter::new(Some("ghost"));
    adapter.start();
    let events = adapter.finish(&Err(Error::Configuration("unknown agent 'ghost'".into())));
    assert_eq!(events.len(), 1);
    assert!(events[0].is_terminal());
    assert!(matches!(&events[0], StreamEvent::Error { message } if message.contains("ghost")));
}

#[test]
fn test_data_omits_type_tag() {
    let event = StreamEvent::Token {
        text: "hi".to_string(),
    };
    assert_eq!(event.data(), json!({"text": "hi"}));

    let end = StreamEvent::ToolEnd {
        tool: "echo".to_string(),
        success: true,
        output: Some("ok".to_string()),
        error: None,
    };
    assert_eq!(end.data(), json!({"tool": "echo", "success": true, "output": "ok"}));
}

#[test]
fn test_truncate_chars_counts_characters() {
    assert_eq!(truncate_chars("héllo", 10), "héllo");
    assert_eq!(truncate_chars("héllo", 2), "hé...");
}

#[test]
fn test_noop_emitter_discards() {
    EventEmitter::noop().emit(finished());
}

#[tokio::test]
async fn test_channel_emitter_preserves_order() {
    let (emitter, mut rx) = EventEmitter::channel();
    emitter.status("Routing", 0);
    emitter.emit(finished());
    drop(emitter);

    let first = rx.recv().await.unwrap();
    assert_eq!(
        first,
        StepEvent::Status {
            status: "Routing".to_string(),
            elapsed_ms: 0
        }
    );
    assert!(rx.recv().await.unwrap().is_terminal());
    assert!(rx.recv().await.is_none());
}
