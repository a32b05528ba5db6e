use super::{compile_glob, walk_files};
use crate::builtins::workspace::{str_arg, Workspace};
use crate::error::{Error, Result};
use crate::registry::{RiskLevel, Tool, ToolDefinition};
use globset::GlobMatcher;
use regex::RegexBuilder;
use tracing::debug;

const MAX_MATCHES: usize = 100;
const MAX_LINE_CHARS: usize = 300;

/// `include` globs without a `/` match a file name in any directory;
/// the others match the path relative to the project root
fn include_glob(pattern: &str) -> Result<GlobMatcher> {
    if pattern.contains('/') {
        compile_glob(pattern)
    } else {
        compile_glob(&format!("**/{pattern}"))
    }
}

/// Tool for searching file contents with a regular expression
pub struct GrepTool {
    definition: ToolDefinition,
    workspace: Workspace,
}

impl GrepTool {
    /// Create a new grep tool
    #[must_use]
    pub fn new(workspace: Workspace) -> Self {
        let definition = ToolDefinition::new(
            "grep",
            "Search file contents with a regular expression. Returns path:line: text",
        )
        .with_risk_level(RiskLevel::Low)
        .with_parameters(serde_json::json!({
            "type": "object",
            "properties": {
                "pattern": {"type": "string", "description": "Regular expression"},
                "path": {"type": "string", "description": "File or directory to search (default: project root)"},
                "include": {"type": "string", "description": "Only search files matching this glob, e.g. *.rs or src/**/*.rs"},
                "case_insensitive": {"type": "boolean"}
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
impl Tool for GrepTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, args: serde_json::Value) -> Result<String> {
        let pattern = str_arg(&args, "pattern")?;
        let case_insensitive = args
            .get("case_insensitive")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false);
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(case_insensitive)
            .build()
            .map_err(|e| Error::InvalidArguments(format!("bad regex: {e}")))?;
        let include = args
            .get("include")
            .and_then(|v| v.as_str())
            .map(include_glob)
            .transpose()?;
        let target = self
            .workspace
            .resolve(args.get("path").and_then(|v| v.as_str()).unwrap_or("."))?;

        debug!(pattern = %pattern, target = %target.display(), "Grep search");

        let files = if target.is_file() {
            vec![target]
        } else {
            let base = target.clone();
            tokio::task::spawn_blocking(move || walk_files(&base))
                .await
                .map_err(|e| Error::Execution(format!("search task failed: {e}")))?
        };

        let mut hits = Vec::new();
        let mut total = 0usize;
        for path in &files {
            if let Some(include) = &include {
                let rel = path.strip_prefix(self.workspace.root()).unwrap_or(path);
                if !include.is_match(rel) {
                    continue;
                }
            }
            // Binary or unreadable files are skipped
            let Ok(content) = tokio::fs::read_to_string(path).await else {
                continue;
            };
            for (idx, line) in content.lines().enumerate() {
                if regex.is_match(line) {
                    total += 1;
                    if hits.len() < MAX_MATCHES {
                        let line: String = line.trim_end().chars().take(MAX_LINE_CHARS).collect();
                        hits.push(format!("{}:{}: {line}", self.workspace.display(path), idx + 1));
                    }
                }
            }
        }

        if hits.is_empty() {
            return Ok(format!("No matches for '{pattern}'"));
        }
        let mut out = hits.join("\n");
        if total > MAX_MATCHES {
            out.push_str(&format!("\n... [{} more matches]", total - MAX_MATCHES));
        }
        Ok(out)
    }
}
