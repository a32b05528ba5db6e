//! Git tool
//!
//! Read-only repository queries run in the project root. The subcommand is
//! limited to the schema's enum, and revisions and paths are checked before
//! git is spawned.


use crate::builtins::workspace::{str_arg, truncate_output, Workspace};
use crate::error::{Error, Result};
use crate::registry::{RiskLevel, Tool, ToolDefinition};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Subcommands the tool will run
pub const SUBCOMMANDS: &[&str] = &["status", "diff", "log", "show", "branch"];
const DEFAULT_LOG_LIMIT: u64 = 20;
const MAX_LOG_LIMIT: u64 = 200;
const GIT_TIMEOUT_SECS: u64 = 30;
const MAX_OUTPUT_CHARS: usize = 30_000;
const LOG_FORMAT: &str = "--format=%h %s (%an, %ar)";

/// Tool for inspecting the project's git repository
pub struct GitTool {
    definition: ToolDefinition,
    workspace: Workspace,
}

impl GitTool {
    /// Create a new git tool
    #[must_use]
    pub fn new(workspace: Workspace) -> Self {
        let definition = ToolDefinition::new(
            "git",
            "Inspect the project's git repository: status, diff, log, show or branch. \
             Example: {\"command\": \"log\", \"limit\": 5} or {\"command\": \"diff\", \"staged\": true}",
        )
        .with_risk_level(RiskLevel::Low)
        .with_parameters(serde_json::json!({
            "type": "object",
            "properties": {
                "command": {"type": "string", "enum": SUBCOMMANDS},
                "revision": {"type": "string", "description": "Commit, branch or range (diff, log, show)"},
                "path": {"type": "string", "description": "Limit to this file or directory"},
                "staged": {"type": "boolean", "description": "diff: compare the index instead of the work tree"},
                "limit": {"type": "integer", "description": "log: number of commits (default 20, max 200)"}
            },
            "required": ["command"]
        }));

        Self {
            definition,
            workspace,
        }
    }

    /// Arguments passed to `git` for a call
    fn git_args(&self, args: &serde_json::Value) -> Result<Vec<String>> {
        let command = str_arg(args, "command")?;
        let revision = args
            .get("revision")
            .and_then(serde_json::Value::as_str)
            .map(str::trim)
            .filter(|r| !r.is_empty());
        if let Some(revision) = revision {
            if !is_valid_revision(revision) {
                return Err(Error::InvalidArguments(format!(
                    "invalid revision '{revision}'"
                )));
            }
        }
        let path = match args.get("path").and_then(serde_json::Value::as_str) {
            Some(path) => Some(self.workspace.display(&self.workspace.resolve(path)?)),
            None => None,
        };

        let mut git: Vec<String> = match command {
            "status" => vec!["status".into(), "--short".into(), "--branch".into()],
            "diff" => {
                let mut git = vec!["diff".to_string()];
                if args.get("staged").and_then(serde_json::Value::as_bool) == Some(true) {
                    git.push("--cached".into());
                }
                git
            }
            "log" => {
                let limit = args
                    .get("limit")
                    .and_then(serde_json::Value::as_u64)
                    .unwrap_or(DEFAULT_LOG_LIMIT)
                    .clamp(1, MAX_LOG_LIMIT);
                vec!["log".into(), LOG_FORMAT.into(), format!("-n{limit}")]
            }
            "show" => vec!["show".into(), "--stat".into(), "--patch".into()],
            "branch" => vec!["branch".into(), "--list".into(), "-vv".into()],
            other => {
                return Err(Error::InvalidArguments(format!(
                    "unsupported git command '{other}'"
                )))
            }
        };

        if command != "status" && command != "branch" {
            if let Some(revision) = revision {
                git.push(revision.to_string());
            }
        }
        if command != "branch" {
            if let Some(path) = path.filter(|p| !p.is_empty()) {
                git.push("--".into());
                git.push(path);
            }
        }
        Ok(git)
    }
}

/// Revisions may not look like flags or carry shell metacharacters
fn is_valid_revision(revision: &str) -> bool {
    const DANGEROUS: &[char] = &['`', '$', '|', ';', '&', '>', '<', '\n', '\r', '\0'];
    !revision.is_empty()
        && revision.len() <= 255
        && !revision.starts_with('-')
        && !revision.chars().any(|c| c.is_whitespace() || DANGEROUS.contains(&c))
}

#[async_trait::async_trait]
impl Tool for GitTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, args: serde_json::Value) -> Result<String> {
        let git_args = self.git_args(&args)?;
        debug!(args = ?git_args, "Running git");

        let child = Command::new("git")
            .args(&git_args)
            .current_dir(self.workspace.root())
            .env("GIT_PAGER", "cat")
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Execution(format!("failed to run git: {e}")))?;

        let output = tokio::time::timeout(
            Duration::from_secs(GIT_TIMEOUT_SECS),
            child.wait_with_output(),
        )
        .await
        .map_err(|_| Error::Timeout(GIT_TIMEOUT_SECS))?
        .map_err(|e| Error::Execution(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Execution(format!(
                "git {} failed: {}",
                git_args[0],
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(if stdout.trim().is_empty() {
            "(no output)".to_string()
        } else {
            truncate_output(&stdout, MAX_OUTPUT_CHARS)
        })
    }
}
