//! Project context
//!
//! A short description of the project injected into every agent's system
//! message: name, detected type and a shallow directory tree.
//!
//! The tree honours `.gitignore` and skips hidden entries. Common build
//! directories are skipped even in projects without ignore files.

use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

/// Build output directories left out of the tree
const SKIP_DIRS: &[&str] = &[
    "node_modules",
    "target",
    "__pycache__",
    "venv",
    "dist",
    "build",
    "vendor",
];

/// Marker file to project type
const PROJECT_MARKERS: &[(&str, &str)] = &[
    ("Cargo.toml", "rust"),
    ("package.json", "node"),
    ("pyproject.toml", "python"),
    ("setup.py", "python"),
    ("requirements.txt", "python"),
    ("go.mod", "go"),
    ("pom.xml", "java"),
    ("build.gradle", "java"),
    ("Gemfile", "ruby"),
    ("composer.json", "php"),
    ("CMakeLists.txt", "cpp"),
];

const MAX_DEPTH: usize = 2;
const MAX_TREE_ENTRIES: usize = 200;

/// Produces the project section of an agent's context
#[async_trait::async_trait]
pub trait ProjectContextBuilder: Send + Sync {
    /// Build the context text; empty when nothing is known
    async fn build(&self) -> String;
}

/// Scans a project directory
#[derive(Debug, Clone)]
pub struct DirectoryContext {
    root: PathBuf,
}

impl DirectoryContext {
    /// Create a builder for `root`
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Project types detected from marker files, in marker order, deduplicated
    #[must_use]
    pub fn detect_types(&self) -> Vec<&'static str> {
        let mut types = Vec::new();
        for (marker, kind) in PROJECT_MARKERS {
            if self.root.join(marker).is_file() && !types.contains(kind) {
                types.push(*kind);
            }
        }
        types
    }

    /// Indented tree, directories first, bounded in depth and size
    #[must_use]
    pub fn tree(&self) -> Vec<String> {
        let mut lines = walk(&self.root);
        if lines.len() > MAX_TREE_ENTRIES {
            let hidden = lines.len() - MAX_TREE_ENTRIES;
            lines.truncate(MAX_TREE_ENTRIES);
            lines.push(format!("... ({hidden} more entries)"));
        }
        lines
    }

    fn render(&self) -> String {
        let name = self
            .root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.root.display().to_string());
        let types = self.detect_types();
        let kind = if types.is_empty() {
            "unknown".to_string()
        } else {
            types.join(", ")
        };

        let mut out = format!(
            "## Project\nName: {name}\nPath: {}\nType: {kind}\n",
            self.root.display()
        );
        let tree = self.tree();
        if !tree.is_empty() {
            out.push_str("\n### Structure\n");
            out.push_str(&tree.join("\n"));
            out.push('\n');
        }
        out
    }
}

fn walk(root: &Path) -> Vec<String> {
    let walker = WalkBuilder::new(root)
        .max_depth(Some(MAX_DEPTH))
        .require_git(false)
        .filter_entry(|entry| {
            let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
            let name = entry.file_name().to_string_lossy();
            !(is_dir && SKIP_DIRS.iter().any(|skip| *skip == name))
        })
        .sort_by_file_path(|a, b| b.is_dir().cmp(&a.is_dir()).then_with(|| a.cmp(b)))
        .build();

    let mut lines = Vec::new();
    for entry in walker.flatten() {
        // One past the cap so `tree` can report the overflow
        if lines.len() > MAX_TREE_ENTRIES {
            break;
        }
        let depth = entry.depth();
        if depth == 0 {
            continue;
        }
        let indent = "  ".repeat(depth - 1);
        let name = entry.file_name().to_string_lossy();
        if entry.file_type().is_some_and(|t| t.is_dir()) {
            lines.push(format!("{indent}{name}/"));
        } else {
            lines.push(format!("{indent}{name}"));
        }
    }
    lines
}

#[async_trait::async_trait]
impl ProjectContextBuilder for DirectoryContext {
    async fn build(&self) -> String {
        let this = self.clone();
        tokio::task::spawn_blocking(move || this.render())
            .await
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("src/agents/deep")).unwrap();
        std::fs::create_dir_all(root.join("target/debug")).unwrap();
        std::fs::create_dir_all(root.join(".git")).unwrap();
        std::fs::write(root.join("Cargo.toml"), "").unwrap();
        std::fs::write(root.join("package.json"), "{}").unwrap();
        std::fs::write(root.join("src/lib.rs"), "").unwrap();
        std::fs::write(root.join("src/agents/deep/x.rs"), "").unwrap();
        dir
    }

    #[test]
    fn test_detect_types() {
        let dir = fixture();
        assert_eq!(DirectoryContext::new(dir.path()).detect_types(), vec!["rust", "node"]);
        let empty = tempfile::tempdir().unwrap();
        assert!(DirectoryContext::new(empty.path()).detect_types().is_empty());
    }

    #[test]
    fn test_tree_depth_and_skips() {
        let dir = fixture();
        let tree = DirectoryContext::new(dir.path()).tree();

        assert_eq!(
            tree,
            vec!["src/", "  agents/", "  lib.rs", "Cargo.toml", "package.json"]
        );
    }

    #[test]
    fn test_tree_honours_gitignore() {
        let dir = fixture();
        std::fs::create_dir_all(dir.path().join("generated")).unwrap();
        std::fs::write(dir.path().join("generated/out.txt"), "").unwrap();
        std::fs::write(dir.path().join("notes.log"), "").unwrap();
        std::fs::write(dir.path().join(".gitignore"), "generated/\n*.log\n").unwrap();

        let tree = DirectoryContext::new(dir.path()).tree();
        assert!(!tree.iter().any(|l| l.contains("generated") || l.contains("notes.log")));
        assert!(tree.contains(&"Cargo.toml".to_string()));
    }

    #[tokio::test]
    async fn test_build() {
        let dir = fixture();
        let text = DirectoryContext::new(dir.path()).build().await;
        assert!(text.starts_with("## Project\n"));
        assert!(text.contains("Type: rust, node"));
        assert!(text.contains("### Structure\nsrc/"));
    }
}
