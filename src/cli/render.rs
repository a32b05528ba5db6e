//! Terminal output for stream events and listings

use lidco_core::{AgentInfo, AgentResponse, StreamEvent};
use std::io::Write;

/// Print one stream event. Answers go to stdout, progress to stderr.
pub fn print_event(event: &StreamEvent) {
    match event {
        StreamEvent::Start { .. } => {}
        StreamEvent::Status { status, .. } => eprintln!("  · {status}"),
        StreamEvent::Token { text } => {
            let mut stdout = std::io::stdout();
            let _ = write!(stdout, "{text}");
            let _ = stdout.flush();
        }
        StreamEvent::ToolStart { tool, args } => eprintln!("  → {tool} {args}"),
        StreamEvent::ToolEnd {
            tool,
            success,
            error,
            ..
        } => {
            if *success {
                eprintln!("  ✓ {tool}");
            } else {
                eprintln!("  ✗ {tool}: {}", error.as_deref().unwrap_or("failed"));
            }
        }
        StreamEvent::Done { .. } => println!(),
        StreamEvent::Error { message } => eprintln!("  ! {message}"),
    }
}

/// One-line summary after a turn
pub fn summary(response: &AgentResponse) -> String {
    format!(
        "[{} · {} · {} iterations · {} tools · {} tokens · {:.1}s]",
        response.agent_name,
        response.model_used.as_deref().unwrap_or("no model"),
        response.iterations,
        response.tool_calls.len(),
        response.usage.total_tokens,
        response.elapsed_ms as f64 / 1000.0,
    )
}

/// Agent table
pub fn print_agents(agents: &[AgentInfo]) {
    let width = agents.iter().map(|a| a.name.len()).max().unwrap_or(0);
    for agent in agents {
        let tools = if agent.tools.is_empty() {
            "all tools".to_string()
        } else {
            agent.tools.join(", ")
        };
        println!(
            "{:<width$}  {}  ({tools}; {})",
            agent.name, agent.description, agent.source
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lidco_llm::TokenUsage;

    #[test]
    fn test_summary() {
        let response = AgentResponse {
            content: "ok".to_string(),
            agent_name: "coder".to_string(),
            model_used: Some("gpt-4o-mini".to_string()),
            iterations: 2,
            tool_calls: Vec::new(),
            usage: TokenUsage::new(100, 20),
            elapsed_ms: 1500,
            incomplete: false,
            error: None,
        };
        assert_eq!(
            summary(&response),
            "[coder · gpt-4o-mini · 2 iterations · 0 tools · 120 tokens · 1.5s]"
        );
    }
}
