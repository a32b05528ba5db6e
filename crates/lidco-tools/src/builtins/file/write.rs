use crate::builtins::workspace::{str_arg, Workspace};
use crate::error::{Error, Result};
use crate::registry::{RiskLevel, Tool, ToolDefinition};
use tracing::info;

/// Tool for creating or overwriting files
pub struct FileWriteTool {
    definition: ToolDefinition,
    workspace: Workspace,
}

impl FileWriteTool {
    /// Create a new file write tool
    #[must_use]
    pub fn new(workspace: Workspace) -> Self {
        let definition = ToolDefinition::new(
            "file_write",
            "Create a file or overwrite it entirely with new content.",
        )
        .with_risk_level(RiskLevel::Medium)
        .with_parameters(serde_json::json!({
            "type": "object",
            "properties": {
                "path": {"type": "string", "description": "File path, relative to the project root"},
                "content": {"type": "string", "description": "Full file content"}
            },
            "required": ["path", "content"]
        }));

        Self {
            definition,
            workspace,
        }
    }
}

#[async_trait::async_trait]
impl Tool for FileWriteTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, args: serde_json::Value) -> Result<String> {
        let path = str_arg(&args, "path")?;
        let content = str_arg(&args, "content")?;
        let file_path = self.workspace.resolve(path)?;

        if let Some(parent) = file_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let existed = tokio::fs::try_exists(&file_path).await.unwrap_or(false);
        tokio::fs::write(&file_path, content)
            .await
            .map_err(|e| Error::Execution(format!("cannot write '{path}': {e}")))?;

        info!(path = %path, bytes = content.len(), "File written");
        Ok(format!(
            "{} {} ({} lines)",
            if existed { "Updated" } else { "Created" },
            self.workspace.display(&file_path),
            content.lines().count()
        ))
    }
}
