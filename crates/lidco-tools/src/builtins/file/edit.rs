use crate::builtins::workspace::{str_arg, Workspace};
use crate::error::{Error, Result};
use crate::registry::{RiskLevel, Tool, ToolDefinition};
use tracing::info;

/// Tool for exact-string replacement inside a file
pub struct FileEditTool {
    definition: ToolDefinition,
    workspace: Workspace,
}

impl FileEditTool {
    /// Create a new file edit tool
    #[must_use]
    pub fn new(workspace: Workspace) -> Self {
        let definition = ToolDefinition::new(
            "file_edit",
            "Replace an exact string in a file. old_string must occur exactly once unless replace_all is set.",
        )
        .with_risk_level(RiskLevel::Medium)
        .with_parameters(serde_json::json!({
            "type": "object",
            "properties": {
                "path": {"type": "string"},
                "old_string": {"type": "string", "description": "Exact text to replace"},
                "new_string": {"type": "string", "description": "Replacement text"},
                "replace_all": {"type": "boolean", "description": "Replace every occurrence"}
            },
            "required": ["path", "old_string", "new_string"]
        }));

        Self {
            definition,
            workspace,
        }
    }
}

#[async_trait::async_trait]
impl Tool for FileEditTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, args: serde_json::Value) -> Result<String> {
        let path = str_arg(&args, "path")?;
        let old = str_arg(&args, "old_string")?;
        let new = str_arg(&args, "new_string")?;
        let replace_all = args
            .get("replace_all")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false);

        if old.is_empty() {
            return Err(Error::Execution("old_string must not be empty".to_string()));
        }
        if old == new {
            return Err(Error::Execution(
                "old_string and new_string are identical".to_string(),
            ));
        }

        let file_path = self.workspace.resolve(path)?;
        let content = tokio::fs::read_to_string(&file_path)
            .await
            .map_err(|e| Error::Execution(format!("cannot read '{path}': {e}")))?;

        let count = content.matches(old).count();
        let updated = match (count, replace_all) {
            (0, _) => {
                return Err(Error::Execution(format!(
                    "old_string not found in {path}"
                )))
            }
            (1, _) | (_, true) => content.replace(old, new),
            (n, false) => {
                return Err(Error::Execution(format!(
                    "old_string occurs {n} times in {path}; add context or set replace_all"
                )))
            }
        };

        tokio::fs::write(&file_path, updated)
            .await
            .map_err(|e| Error::Execution(format!("cannot write '{path}': {e}")))?;

        info!(path = %path, replacements = count, "File edited");
        Ok(format!(
            "Edited {} ({count} replacement{})",
            self.workspace.display(&file_path),
            if count == 1 { "" } else { "s" }
        ))
    }
}
