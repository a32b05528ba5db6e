//! Persistent memory
//!
//! The orchestrator asks the [`MemoryStore`] for context before each run and
//! records a short summary after runs that used tools. [`JsonMemoryStore`]
//! keeps entries in a single JSON file under the project's `.lidco`
//! directory.

#[cfg(test)]
mod tests;

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Entries included in a context block
const CONTEXT_ENTRIES: usize = 20;

/// One remembered fact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    /// Unique key; recording an existing key replaces it
    pub key: String,
    /// Remembered text
    pub content: String,
    /// Free-form category (e.g. "task", "pattern")
    pub category: String,
    /// Tags used for scoping
    #[serde(default)]
    pub tags: Vec<String>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Who recorded it
    #[serde(default)]
    pub source: String,
}

impl MemoryEntry {
    /// Create an entry stamped now
    pub fn new(
        key: impl Into<String>,
        content: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            content: content.into(),
            category: category.into(),
            tags: Vec::new(),
            created_at: Utc::now(),
            source: String::new(),
        }
    }

    /// Attach tags
    #[must_use]
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Set the source
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    fn in_scope(&self, scope: &str) -> bool {
        scope.is_empty() || self.category == scope || self.tags.iter().any(|t| t == scope)
    }
}

/// Long-lived memory consulted by the orchestrator
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MemoryStore: Send + Sync {
    /// Context block for a scope (an agent name, a category, or "" for all)
    async fn load_context(&self, scope: &str) -> Result<String>;

    /// Remember an entry
    async fn record(&self, entry: MemoryEntry) -> Result<()>;
}

/// JSON-file memory store with a size cap
#[derive(Debug)]
pub struct JsonMemoryStore {
    path: PathBuf,
    max_entries: usize,
    entries: Mutex<Vec<MemoryEntry>>,
}

impl JsonMemoryStore {
    /// Open a store, reading existing entries if the file exists.
    ///
    /// A corrupt file is logged and treated as empty; it is overwritten on
    /// the next write.
    pub async fn open(path: impl Into<PathBuf>, max_entries: usize) -> Result<Self> {
        let path = path.into();
        let entries = match tokio::fs::read_to_string(&path).await {
            Ok(text) => serde_json::from_str::<Vec<MemoryEntry>>(&text).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable memory file");
                Vec::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        debug!(path = %path.display(), entries = entries.len(), "Memory store opened");

        Ok(Self {
            path,
            max_entries: max_entries.max(1),
            entries: Mutex::new(entries),
        })
    }

    /// Default location for a project
    #[must_use]
    pub fn default_path(project_dir: &Path) -> PathBuf {
        project_dir.join(".lidco").join("memory.json")
    }

    /// File backing this store
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All entries, oldest first
    pub async fn entries(&self) -> Vec<MemoryEntry> {
        self.entries.lock().await.clone()
    }

    async fn persist(&self, entries: &[MemoryEntry]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(entries)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| Error::Memory(format!("cannot replace {}: {e}", self.path.display())))
    }
}

#[async_trait::async_trait]
impl MemoryStore for JsonMemoryStore {
    async fn load_context(&self, scope: &str) -> Result<String> {
        let entries = self.entries.lock().await;
        let mut lines: Vec<String> = entries
            .iter()
            .rev()
            .filter(|e| e.in_scope(scope))
            .take(CONTEXT_ENTRIES)
            .map(|e| format!("- [{}] {}: {}", e.category, e.key, e.content))
            .collect();
        if lines.is_empty() {
            return Ok(String::new());
        }
        lines.reverse();
        Ok(format!("## Memory\n{}", lines.join("\n")))
    }

    async fn record(&self, entry: MemoryEntry) -> Result<()> {
        let mut entries = self.entries.lock().await;
        entries.retain(|e| e.key != entry.key);
        entries.push(entry);
        if entries.len() > self.max_entries {
            let excess = entries.len() - self.max_entries;
            entries.drain(..excess);
        }
        self.persist(&entries).await
    }
}
