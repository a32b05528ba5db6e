//! Builtin tools
//!
//! Every builtin resolves paths through a [`Workspace`] so nothing outside the
//! project root is touched.

mod bash;
mod file;
mod git;
mod search;
mod workspace;

pub use bash::BashTool;
pub use file::{FileEditTool, FileReadTool, FileWriteTool};
pub use git::GitTool;
pub use search::{GlobTool, GrepTool};
pub use workspace::Workspace;

use crate::registry::ToolRegistry;
use std::path::Path;
use std::sync::Arc;

/// Register every builtin tool rooted at `project_dir`
pub fn register_builtins(registry: &mut ToolRegistry, project_dir: &Path) {
    let workspace = Workspace::new(project_dir);
    registry.register(Arc::new(FileReadTool::new(workspace.clone())));
    registry.register(Arc::new(FileWriteTool::new(workspace.clone())));
    registry.register(Arc::new(FileEditTool::new(workspace.clone())));
    registry.register(Arc::new(GlobTool::new(workspace.clone())));
    registry.register(Arc::new(GrepTool::new(workspace.clone())));
    registry.register(Arc::new(GitTool::new(workspace.clone())));
    registry.register(Arc::new(BashTool::new(workspace)));
}
