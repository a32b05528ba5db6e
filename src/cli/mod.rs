//! CLI module for LIDCO
//!
//! Provides commands:
//! - `chat` (default): interactive REPL
//! - `ask`: answer one message and exit
//! - `agents`: list available agents
//! - `serve`: HTTP API with streaming chat

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lidco_core::{ChatRequest, LidcoConfig, Session, SessionBuilder};
use lidco_tools::{Approver, FixedApprover};
use std::path::PathBuf;
use std::sync::Arc;

mod approver;
mod render;
pub mod repl;

pub use approver::StdinApprover;

/// LIDCO command line
#[derive(Parser, Debug)]
#[command(name = "lidco")]
#[command(about = "Multi-agent coding assistant")]
#[command(version)]
pub struct Cli {
    /// Project directory
    #[arg(long, short = 'C', global = true, default_value = ".")]
    pub project: PathBuf,

    /// Extra configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Approve every tool call without asking
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Interactive session (default)
    Chat {
        /// Start with this agent pinned
        #[arg(long, short)]
        agent: Option<String>,
    },
    /// Answer one message and exit
    Ask {
        /// The message
        message: String,
        /// Agent to use instead of automatic routing
        #[arg(long, short)]
        agent: Option<String>,
        /// Files to add to the context
        #[arg(long = "file", short = 'f')]
        files: Vec<String>,
    },
    /// List available agents
    Agents,
    /// Start the HTTP server
    Serve {
        /// Bind address (overrides config)
        #[arg(long)]
        host: Option<String>,
        /// Port (overrides config)
        #[arg(long)]
        port: Option<u16>,
    },
}

impl Cli {
    /// Log filter used when RUST_LOG is unset
    pub fn default_log_filter(&self) -> &'static str {
        match self.command {
            Some(Commands::Serve { .. }) => {
                "lidco=info,lidco_core=info,lidco_llm=info,lidco_tools=info,tower_http=info"
            }
            _ => "lidco=warn,lidco_core=warn,lidco_llm=warn,lidco_tools=warn",
        }
    }
}

async fn build_session(
    config: LidcoConfig,
    project: PathBuf,
    approver: Arc<dyn Approver>,
) -> Result<Arc<Session>> {
    let session = SessionBuilder::new(config, project)
        .with_approver(approver)
        .build()
        .await
        .context("Failed to start session")?;
    Ok(Arc::new(session))
}

/// Run the CLI command
pub async fn run(cli: Cli) -> Result<()> {
    let project = cli
        .project
        .canonicalize()
        .with_context(|| format!("Project directory not found: {}", cli.project.display()))?;
    let config = crate::config::load_config(&project, cli.config.as_deref())?;

    let interactive: Arc<dyn Approver> = if cli.yes {
        Arc::new(FixedApprover(true))
    } else {
        Arc::new(StdinApprover)
    };

    match cli.command {
        None => {
            let session = build_session(config, project, interactive).await?;
            repl::run(session, None).await
        }
        Some(Commands::Chat { agent }) => {
            let session = build_session(config, project, interactive).await?;
            repl::run(session, agent).await
        }
        Some(Commands::Ask {
            message,
            agent,
            files,
        }) => {
            let session = build_session(config, project, interactive).await?;
            let mut request = ChatRequest::new(message).with_context_files(files);
            request.agent = agent;

            let response = repl::chat_turn(&session, request).await?;
            if let Some(failure) = &response.error {
                anyhow::bail!("{failure}");
            }
            Ok(())
        }
        Some(Commands::Agents) => {
            let session = build_session(config, project, interactive).await?;
            render::print_agents(&session.agents());
            Ok(())
        }
        Some(Commands::Serve { host, port }) => {
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);
            // Nobody is at a terminal to answer prompts
            let approver = Arc::new(FixedApprover(cli.yes));
            let session = build_session(config, project, approver).await?;
            crate::server::run(session, &host, port).await
        }
    }
}
