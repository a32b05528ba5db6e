use crate::builtins::workspace::{str_arg, Workspace};
use crate::error::{Error, Result};
use crate::registry::{RiskLevel, Tool, ToolDefinition};
use tracing::debug;

const DEFAULT_LIMIT: usize = 2000;

/// Tool for reading file contents with line numbers
pub struct FileReadTool {
    definition: ToolDefinition,
    workspace: Workspace,
}

impl FileReadTool {
    /// Create a new file read tool
    #[must_use]
    pub fn new(workspace: Workspace) -> Self {
        let definition = ToolDefinition::new(
            "file_read",
            "Read a text file. Returns numbered lines; use offset/limit for large files.",
        )
        .with_risk_level(RiskLevel::Low)
        .with_parameters(serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "File path, relative to the project root"
                },
                "offset": {
                    "type": "integer",
                    "description": "First line to return (1-based, default 1)"
                },
                "limit": {
                    "type": "integer",
                    "description": "Maximum number of lines (default 2000)"
                }
            },
            "required": ["path"]
        }));

        Self {
            definition,
            workspace,
        }
    }
}

#[async_trait::async_trait]
impl Tool for FileReadTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, args: serde_json::Value) -> Result<String> {
        let path = str_arg(&args, "path")?;
        let file_path = self.workspace.resolve(path)?;
        let offset = args
            .get("offset")
            .and_then(serde_json::Value::as_u64)
            .unwrap_or(1)
            .max(1) as usize;
        let limit = args
            .get("limit")
            .and_then(serde_json::Value::as_u64)
            .map_or(DEFAULT_LIMIT, |l| l as usize);

        debug!(path = %path, offset, limit, "Reading file");

        let content = tokio::fs::read_to_string(&file_path)
            .await
            .map_err(|e| Error::Execution(format!("cannot read '{path}': {e}")))?;

        let total = content.lines().count();
        let mut out: String = content
            .lines()
            .enumerate()
            .skip(offset - 1)
            .take(limit)
            .map(|(i, line)| format!("{:>6}\t{line}\n", i + 1))
            .collect();

        let shown_end = (offset - 1 + limit).min(total);
        if shown_end < total {
            out.push_str(&format!(
                "... [{} more lines, continue with offset={}]\n",
                total - shown_end,
                shown_end + 1
            ));
        }
        if out.is_empty() {
            out = format!("[empty file: {}]", self.workspace.display(&file_path));
        }
        Ok(out)
    }
}
