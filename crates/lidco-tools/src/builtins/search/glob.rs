use super::{compile_glob, walk_files};
use crate::builtins::workspace::{str_arg, Workspace};
use crate::error::{Error, Result};
use crate::registry::{RiskLevel, Tool, ToolDefinition};
use tracing::debug;

const MAX_RESULTS: usize = 200;

/// Tool for finding files by glob pattern
pub struct GlobTool {
    definition: ToolDefinition,
    workspace: Workspace,
}

impl GlobTool {
    /// Create a new glob tool
    #[must_use]
    pub fn new(workspace: Workspace) -> Self {
        let definition = ToolDefinition::new(
            "glob",
            "Find files matching a glob pattern such as **/*.rs, src/{lib,main}.rs or **/*.[ch]. \
             Files ignored by .gitignore are skipped.",
        )
        .with_risk_level(RiskLevel::Low)
        .with_parameters(serde_json::json!({
            "type": "object",
            "properties": {
                "pattern": {"type": "string", "description": "Glob pattern relative to the search directory"},
                "path": {"type": "string", "description": "Directory to search (default: project root)"}
            },
            "required": ["pattern"]
        }));

        Self {
            definition,
            workspace,
        }
    }
}

#[async_trait::async_trait]
impl Tool for GlobTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, args: serde_json::Value) -> Result<String> {
        let pattern = str_arg(&args, "pattern")?.to_string();
        let dir = self
            .workspace
            .resolve(args.get("path").and_then(|v| v.as_str()).unwrap_or("."))?;
        let matcher = compile_glob(&pattern)?;

        debug!(pattern = %pattern, dir = %dir.display(), "Glob search");

        let base = dir.clone();
        let files = tokio::task::spawn_blocking(move || walk_files(&base))
            .await
            .map_err(|e| Error::Execution(format!("search task failed: {e}")))?;

        let matches: Vec<String> = files
            .iter()
            .filter_map(|path| {
                let rel = path.strip_prefix(&dir).ok()?;
                matcher.is_match(rel).then(|| self.workspace.display(path))
            })
            .collect();

        if matches.is_empty() {
            return Ok(format!("No files match '{pattern}'"));
        }

        let total = matches.len();
        let mut out = matches
            .into_iter()
            .take(MAX_RESULTS)
            .collect::<Vec<_>>()
            .join("\n");
        if total > MAX_RESULTS {
            out.push_str(&format!("\n... [{} more files]", total - MAX_RESULTS));
        }
        Ok(out)
    }
}
