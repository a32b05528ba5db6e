//! YAML agent loader
//!
//! Agent files live in `~/.lidco/agents` and `<project>/.lidco/agents`:
//!
//! ```yaml
//! name: security
//! description: Security audits.
//! system_prompt: |
//!   You are a security auditor...
//! tools: [file_read, grep, glob]
//! max_iterations: 30
//! context_window: 64000
//! model:
//!   preferred: openai/gpt-4o
//!   temperature: 0.1
//!   max_tokens: 4000
//!   role: review
//! ```

use super::builtins::builtin_agents;
use super::config::{AgentConfig, AgentSource};
use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct AgentFile {
    name: String,
    description: String,
    system_prompt: String,
    #[serde(default)]
    tools: Vec<String>,
    #[serde(default)]
    max_iterations: Option<u32>,
    #[serde(default)]
    context_window: Option<usize>,
    #[serde(default)]
    model: Option<AgentFileModel>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct AgentFileModel {
    preferred: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    role: Option<String>,
}

/// Parse one agent file
pub fn parse_agent_file(path: &Path, default_max_iterations: u32) -> Result<AgentConfig> {
    let invalid = |message: String| Error::AgentFile {
        path: path.display().to_string(),
        message,
    };

    let text = std::fs::read_to_string(path)?;
    let file: AgentFile = serde_yaml::from_str(&text).map_err(|e| invalid(e.to_string()))?;

    let name = file.name.trim().to_lowercase();
    if name.is_empty() || name.contains(char::is_whitespace) {
        return Err(invalid(format!("invalid agent name '{}'", file.name)));
    }
    if file.system_prompt.trim().is_empty() {
        return Err(invalid("system_prompt is empty".to_string()));
    }
    if file.max_iterations == Some(0) {
        return Err(invalid("max_iterations must be at least 1".to_string()));
    }

    let model = file.model.unwrap_or_default();
    let mut config = AgentConfig::new(name, file.description.trim(), file.system_prompt)
        .with_tools(file.tools)
        .with_max_iterations(file.max_iterations.unwrap_or(default_max_iterations))
        .with_source(AgentSource::File(path.to_path_buf()));
    if let Some(preferred) = model.preferred.filter(|m| !m.is_empty()) {
        config = config.with_model(preferred);
    }
    if let Some(role) = model.role.filter(|r| !r.is_empty()) {
        config = config.with_role(role);
    }
    if let Some(temperature) = model.temperature {
        config = config.with_temperature(temperature);
    }
    if let Some(max_tokens) = model.max_tokens {
        config = config.with_max_tokens(max_tokens);
    }
    if let Some(tokens) = file.context_window {
        config = config.with_context_window(tokens);
    }
    Ok(config)
}

/// Loads agent definitions from a list of directories
#[derive(Debug, Clone)]
pub struct AgentLoader {
    dirs: Vec<PathBuf>,
    default_max_iterations: u32,
}

impl AgentLoader {
    /// Loader over explicit directories; later directories win
    #[must_use]
    pub fn new(dirs: Vec<PathBuf>, default_max_iterations: u32) -> Self {
        Self {
            dirs,
            default_max_iterations: default_max_iterations.max(1),
        }
    }

    /// `~/.lidco/agents` then `<project>/.lidco/agents`
    #[must_use]
    pub fn for_project(project_dir: &Path, default_max_iterations: u32) -> Self {
        let mut dirs = Vec::new();
        if let Some(home) = dirs::home_dir() {
            dirs.push(home.join(".lidco").join("agents"));
        }
        dirs.push(project_dir.join(".lidco").join("agents"));
        Self::new(dirs, default_max_iterations)
    }

    /// Loader that finds nothing; only builtins are used
    #[must_use]
    pub fn builtin_only(default_max_iterations: u32) -> Self {
        Self::new(Vec::new(), default_max_iterations)
    }

    /// Directories searched, in precedence order
    #[must_use]
    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    /// Parse every `*.yaml` / `*.yml` file; invalid files are logged and skipped
    #[must_use]
    pub fn load_files(&self) -> Vec<AgentConfig> {
        let mut configs = Vec::new();
        for dir in &self.dirs {
            let Ok(entries) = std::fs::read_dir(dir) else {
                continue;
            };
            let mut paths: Vec<PathBuf> = entries
                .flatten()
                .map(|e| e.path())
                .filter(|p| {
                    p.is_file()
                        && matches!(
                            p.extension().and_then(|e| e.to_str()),
                            Some("yaml" | "yml")
                        )
                })
                .collect();
            paths.sort();

            for path in paths {
                match parse_agent_file(&path, self.default_max_iterations) {
                    Ok(config) => {
                        debug!(agent = %config.name, path = %path.display(), "Loaded agent file");
                        configs.push(config);
                    }
                    Err(e) => warn!(path = %path.display(), error = %e, "Skipping agent file"),
                }
            }
        }
        configs
    }

    /// Builtins overridden by file definitions, sorted by name
    #[must_use]
    pub fn load_all(&self) -> Vec<AgentConfig> {
        let mut merged: BTreeMap<String, AgentConfig> = builtin_agents()
            .into_iter()
            .map(|c| {
                let c = c.with_max_iterations(self.default_max_iterations);
                (c.name.clone(), c)
            })
            .collect();
        for config in self.load_files() {
            merged.insert(config.name.clone(), config);
        }
        merged.into_values().collect()
    }
}
