//! Agent routing
//!
//! A cheap model call picks the agent; when that fails or answers with an
//! unknown name, keyword rules decide.

use crate::agents::AgentSnapshot;
use regex::Regex;
use std::sync::LazyLock;

/// Role used for the routing model call
pub const ROUTING_ROLE: &str = "routing";

const ROUTER_PROMPT: &str = "\
Route to agent. Output name only. Default: {default}.
plan/design -> planner, review/audit -> reviewer, debug/error/bug -> debugger, else -> {default}.

Available agents:
{agents}";

static PLAN_KEYWORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(plan|planning|design|architect|architecture|roadmap|break\s+down|decompose|strategy)\b")
        .expect("PLAN_KEYWORDS is a compile-time constant")
});

static REVIEW_KEYWORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(review|reviews|audit|audits|critique|inspect|code\s+quality)\b")
        .expect("REVIEW_KEYWORDS is a compile-time constant")
});

static DEBUG_KEYWORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(debug|debugging|error|errors|bug|bugs|crash|crashes|exception|traceback|panic|panics|stack\s+trace|failing)\b")
        .expect("DEBUG_KEYWORDS is a compile-time constant")
});

/// System prompt for the routing call
#[must_use]
pub fn router_prompt(snapshot: &AgentSnapshot, default_agent: &str) -> String {
    let agents = snapshot
        .agents()
        .map(|a| format!("- {}: {}", a.name(), a.config().description))
        .collect::<Vec<_>>()
        .join("\n");
    ROUTER_PROMPT
        .replace("{default}", default_agent)
        .replace("{agents}", &agents)
}

/// Clean up the routing model's reply
#[must_use]
pub fn normalize_reply(reply: &str) -> String {
    reply
        .trim()
        .to_lowercase()
        .trim_matches(|c: char| matches!(c, '"' | '\'' | '.' | '`'))
        .trim()
        .to_string()
}

/// Agent suggested by keywords alone
#[must_use]
pub fn keyword_route<'a>(message: &str, default_agent: &'a str) -> &'a str {
    if PLAN_KEYWORDS.is_match(message) {
        "planner"
    } else if REVIEW_KEYWORDS.is_match(message) {
        "reviewer"
    } else if DEBUG_KEYWORDS.is_match(message) {
        "debugger"
    } else {
        default_agent
    }
}

/// Map a wanted agent onto what is registered: the agent itself, else the
/// default, else the first registered name
#[must_use]
pub fn registered_or_default(snapshot: &AgentSnapshot, wanted: &str, default_agent: &str) -> Option<String> {
    if snapshot.contains(wanted) {
        Some(wanted.to_string())
    } else if snapshot.contains(default_agent) {
        Some(default_agent.to_string())
    } else {
        snapshot.names().first().map(|n| (*n).to_string())
    }
}
