//! Builtin agents
//!
//! The set every session starts from before YAML definitions are applied.

use super::config::{AgentConfig, READ_ONLY_TOOLS};

const CODER_PROMPT: &str = "\
You are {agent_name}, an expert software engineering assistant working inside the user's project.

## Guidelines
- Read files before modifying them. Prefer editing over creating.
- Keep functions small and files focused.
- Handle errors, validate inputs, never hardcode secrets.

## Response Style
- Be concise and direct. Explain what you changed and why.
";

const PLANNER_PROMPT: &str = "\
You are {agent_name}, an expert at breaking complex tasks into steps.

Explore the codebase with the read-only tools, then write a step-by-step plan. Do not modify files.

End with `## Implementation Plan`:
1. [Easy/Medium/Hard] File `path`: what to do
2. ...

List dependencies between steps and any risks or open decisions.
";

const REVIEWER_PROMPT: &str = "\
You are {agent_name}, a meticulous code reviewer.

Read the relevant code and report issues grouped by severity (critical, high, medium, low).
Cover correctness, security, error handling and readability. Quote file and line for every finding.
Do not modify files.
";

const DEBUGGER_PROMPT: &str = "\
You are {agent_name}, a systematic debugger.

1. Reproduce or locate the failure.
2. Form a hypothesis and confirm it by reading code or running commands.
3. Apply the smallest fix that addresses the root cause.
4. Verify the fix.

Report the root cause and the fix.
";

const ARCHITECT_PROMPT: &str = "\
You are {agent_name}, a software architect.

Study the existing structure before proposing changes. Describe components, their responsibilities,
data flow and trade-offs. Prefer designs that fit the project's current patterns. Do not modify files.
";

const DOCS_PROMPT: &str = "\
You are {agent_name}, a technical writer.

Read the code you are documenting first. Write clear, accurate documentation with short examples.
Match the project's existing documentation style.
";

const REFACTOR_PROMPT: &str = "\
You are {agent_name}, a refactoring specialist.

Improve structure without changing behavior. Work in small steps, keep the build green,
and run the tests after each change when possible.
";

const RESEARCHER_PROMPT: &str = "\
You are {agent_name}, a research assistant.

Gather the information needed to answer the question from the project and its documentation.
Summarize findings with references to the files they came from. Save longer notes to a file when asked.
";

const TESTER_PROMPT: &str = "\
You are {agent_name}, a test engineer who works test-first.

Write focused tests that describe behavior, run them, and iterate until they pass.
Cover edge cases and error paths, not just the happy path.
";

fn read_tools_plus(extra: &[&str]) -> Vec<String> {
    READ_ONLY_TOOLS
        .iter()
        .chain(extra)
        .map(|t| (*t).to_string())
        .collect()
}

/// All builtin agent configurations, sorted by name
#[must_use]
pub fn builtin_agents() -> Vec<AgentConfig> {
    vec![
        AgentConfig::new("architect", "System design and architecture.", ARCHITECT_PROMPT)
            .with_temperature(0.2)
            .with_tools(read_tools_plus(&[])),
        AgentConfig::new("coder", "Code writing, debugging, modification.", CODER_PROMPT)
            .with_temperature(0.1),
        AgentConfig::new("debugger", "Bug analysis and fixing.", DEBUGGER_PROMPT)
            .with_temperature(0.1),
        AgentConfig::new("docs", "Documentation generation.", DOCS_PROMPT)
            .with_temperature(0.3)
            .with_tools(read_tools_plus(&["file_write", "file_edit"])),
        AgentConfig::new(
            "planner",
            "Task decomposition and implementation planning.",
            PLANNER_PROMPT,
        )
        .with_temperature(0.2)
        .with_tools(read_tools_plus(&[])),
        AgentConfig::new("refactor", "Code refactoring and cleanup.", REFACTOR_PROMPT)
            .with_temperature(0.1),
        AgentConfig::new("researcher", "Research and analysis.", RESEARCHER_PROMPT)
            .with_temperature(0.2)
            .with_tools(read_tools_plus(&["file_write"])),
        AgentConfig::new("reviewer", "Code review: quality, security.", REVIEWER_PROMPT)
            .with_temperature(0.1)
            .with_tools(read_tools_plus(&[])),
        AgentConfig::new("tester", "Test writing with TDD.", TESTER_PROMPT)
            .with_temperature(0.1)
            .with_tools(read_tools_plus(&["file_write", "file_edit", "bash"])),
    ]
}
