//! Interactive session
//!
//! Reads lines from stdin. Plain lines are sent to the agents; lines
//! starting with `/` are session commands. Ctrl-C during a turn cancels it.

use super::render;
use anyhow::Result;
use lidco_core::{AgentResponse, ChatRequest, Session};
use std::io::{BufRead, Write};

const HELP: &str = "\
Commands:
  /agent <name> [message]
                  send one message to an agent, or pin it when no
                  message is given (/agent auto to route again)
  /agents         list agents
  /context <file> add a file to the next message's context
  /clear          forget the conversation
  /reload         reload agent definitions
  /status         session status
  /help           this help
  /exit           quit";

/// A parsed input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    /// Send to the agents
    Message(String),
    /// Pin an agent, or unpin with `None`
    Agent(Option<String>),
    /// Send one message to a specific agent
    AgentMessage {
        /// Agent name
        agent: String,
        /// The message
        message: String,
    },
    /// List agents
    Agents,
    /// Queue a context file
    Context(String),
    /// Clear history
    Clear,
    /// Reload agents
    Reload,
    /// Show status
    Status,
    /// Show help
    Help,
    /// Quit
    Exit,
    /// Blank line
    Empty,
    /// Unrecognised `/command`
    Unknown(String),
}

/// Parse one input line
pub fn parse_line(line: &str) -> ReplCommand {
    let line = line.trim();
    if line.is_empty() {
        return ReplCommand::Empty;
    }
    let Some(command) = line.strip_prefix('/') else {
        return ReplCommand::Message(line.to_string());
    };

    let (name, arg) = match command.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (command, ""),
    };
    match name {
        "agent" => match arg.split_once(char::is_whitespace) {
            Some((agent, message)) => ReplCommand::AgentMessage {
                agent: agent.to_lowercase(),
                message: message.trim().to_string(),
            },
            None if arg.is_empty() || arg == "auto" => ReplCommand::Agent(None),
            None => ReplCommand::Agent(Some(arg.to_lowercase())),
        },
        "agents" => ReplCommand::Agents,
        "context" if !arg.is_empty() => ReplCommand::Context(arg.to_string()),
        "clear" => ReplCommand::Clear,
        "reload" => ReplCommand::Reload,
        "status" => ReplCommand::Status,
        "help" | "?" => ReplCommand::Help,
        "exit" | "quit" | "q" => ReplCommand::Exit,
        _ => ReplCommand::Unknown(line.to_string()),
    }
}

/// Run one turn, printing events as they arrive. Ctrl-C cancels the turn.
pub async fn chat_turn(session: &Session, request: ChatRequest) -> Result<AgentResponse> {
    let chat = session.handle_chat_with(request, render::print_event);
    tokio::pin!(chat);

    let response = loop {
        tokio::select! {
            result = &mut chat => break result?,
            _ = tokio::signal::ctrl_c() => {
                if session.cancel() > 0 {
                    eprintln!("  · Cancelling...");
                }
            }
        }
    };
    eprintln!("{}", render::summary(&response));
    Ok(response)
}

async fn read_line() -> Result<Option<String>> {
    let line = tokio::task::spawn_blocking(|| {
        let mut stdout = std::io::stdout();
        let _ = write!(stdout, "lidco> ");
        let _ = stdout.flush();
        let mut line = String::new();
        std::io::stdin().lock().read_line(&mut line).map(|n| (n > 0).then_some(line))
    })
    .await??;
    Ok(line)
}

/// Run the REPL until `/exit` or end of input
pub async fn run(session: std::sync::Arc<Session>, agent: Option<String>) -> Result<()> {
    let mut pinned = agent;
    let mut context_files: Vec<String> = Vec::new();

    eprintln!(
        "LIDCO v{} · {} · /help for commands",
        env!("CARGO_PKG_VERSION"),
        session.project_dir().display()
    );

    while let Some(line) = read_line().await? {
        match parse_line(&line) {
            ReplCommand::Empty => {}
            ReplCommand::Exit => break,
            ReplCommand::Help => eprintln!("{HELP}"),
            ReplCommand::Agents => render::print_agents(&session.agents()),
            ReplCommand::Agent(agent) => {
                match &agent {
                    Some(name) => eprintln!("  · Agent pinned: {name}"),
                    None => eprintln!("  · Automatic routing"),
                }
                pinned = agent;
            }
            ReplCommand::Context(file) => {
                eprintln!("  · Added to context: {file}");
                context_files.push(file);
            }
            ReplCommand::Clear => {
                session.clear_history();
                eprintln!("  · History cleared");
            }
            ReplCommand::Reload => {
                let generation = session.reload_agents();
                eprintln!(
                    "  · Agents reloaded (generation {generation}, {} agents)",
                    session.agents().len()
                );
            }
            ReplCommand::Status => {
                let status = serde_json::to_string_pretty(&session.status())?;
                eprintln!("{status}");
            }
            ReplCommand::Unknown(command) => eprintln!("  · Unknown command: {command}"),
            ReplCommand::Message(message) => {
                let mut request =
                    ChatRequest::new(message).with_context_files(std::mem::take(&mut context_files));
                request.agent = pinned.clone();
                if let Err(e) = chat_turn(&session, request).await {
                    eprintln!("  ! {e}");
                }
            }
            ReplCommand::AgentMessage { agent, message } => {
                let request = ChatRequest::new(message)
                    .with_agent(agent)
                    .with_context_files(std::mem::take(&mut context_files));
                if let Err(e) = chat_turn(&session, request).await {
                    eprintln!("  ! {e}");
                }
            }
        }
    }
    Ok(())
}
