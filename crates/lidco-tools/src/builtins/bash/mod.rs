//! Shell command tool
//!
//! Runs `sh -c <command>` in the project root with a hard timeout. Output is
//! combined and truncated before it is returned to the model.


use crate::builtins::workspace::{str_arg, truncate_output, Workspace};
use crate::error::{Error, Result};
use crate::registry::{RiskLevel, Tool, ToolDefinition};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{info, warn};

/// Default command timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
/// Upper bound a caller may request
pub const MAX_TIMEOUT_SECS: u64 = 600;
const MAX_OUTPUT_CHARS: usize = 30_000;

/// Patterns refused before anything is spawned
const BLOCKED_PATTERNS: &[&str] = &[
    "rm -rf /",
    "rm -rf ~",
    "rm -rf /*",
    "mkfs",
    ":(){ :|:& };:",
    "dd if=/dev/zero of=/dev/",
    "shutdown",
    "reboot",
    "poweroff",
    "> /dev/sda",
];

/// Tool for running shell commands
pub struct BashTool {
    definition: ToolDefinition,
    workspace: Workspace,
}

impl BashTool {
    /// Create a new bash tool
    #[must_use]
    pub fn new(workspace: Workspace) -> Self {
        let definition = ToolDefinition::new(
            "bash",
            "Run a shell command in the project directory and return its output.",
        )
        .with_risk_level(RiskLevel::High)
        .with_parameters(serde_json::json!({
            "type": "object",
            "properties": {
                "command": {"type": "string", "description": "Command line passed to sh -c"},
                "timeout": {"type": "integer", "description": "Timeout in seconds (default 120, max 600)"}
            },
            "required": ["command"]
        }));

        Self {
            definition,
            workspace,
        }
    }
}

fn blocked_pattern(command: &str) -> Option<&'static str> {
    let normalized = command.split_whitespace().collect::<Vec<_>>().join(" ");
    BLOCKED_PATTERNS
        .iter()
        .copied()
        .find(|p| normalized.contains(p))
}

#[async_trait::async_trait]
impl Tool for BashTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, args: serde_json::Value) -> Result<String> {
        let command = str_arg(&args, "command")?;
        let timeout_secs = args
            .get("timeout")
            .and_then(serde_json::Value::as_u64)
            .unwrap_or(DEFAULT_TIMEOUT_SECS)
            .clamp(1, MAX_TIMEOUT_SECS);

        if let Some(pattern) = blocked_pattern(command) {
            warn!(command = %command, pattern = %pattern, "Blocked shell command");
            return Err(Error::PermissionDenied(format!(
                "command contains blocked pattern '{pattern}'"
            )));
        }

        info!(command = %command, timeout_secs, "Running shell command");

        let child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(self.workspace.root())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Execution(format!("failed to spawn shell: {e}")))?;

        let output = tokio::time::timeout(
            Duration::from_secs(timeout_secs),
            child.wait_with_output(),
        )
        .await
        .map_err(|_| Error::Timeout(timeout_secs))?
        .map_err(|e| Error::Execution(e.to_string()))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let mut combined = stdout.into_owned();
        if !stderr.trim().is_empty() {
            if !combined.is_empty() && !combined.ends_with('\n') {
                combined.push('\n');
            }
            combined.push_str("[stderr]\n");
            combined.push_str(&stderr);
        }
        let combined = truncate_output(&combined, MAX_OUTPUT_CHARS);

        let exit_code = output.status.code().unwrap_or(-1);
        if output.status.success() {
            Ok(if combined.trim().is_empty() {
                "(no output)".to_string()
            } else {
                combined
            })
        } else {
            Err(Error::Execution(format!(
                "exit code {exit_code}\n{combined}"
            )))
        }
    }
}
