//! Search tools: glob, grep
//!
//! Both walk the workspace with [`walk_files`], which honours `.gitignore`
//! and `.ignore` files and skips hidden entries.

mod glob;
mod grep;


pub use glob::GlobTool;
pub use grep::GrepTool;

use crate::error::{Error, Result};
use globset::{GlobBuilder, GlobMatcher};
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Collect every regular file below `dir`, sorted
pub(crate) fn walk_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkBuilder::new(dir)
        .require_git(false)
        .build()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                debug!(error = %e, "Skipping unreadable entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()))
        .map(ignore::DirEntry::into_path)
        .collect();
    files.sort();
    files
}

/// Compile a glob where `*` and `?` stop at `/` and `**` spans directories
pub(crate) fn compile_glob(pattern: &str) -> Result<GlobMatcher> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map(|glob| glob.compile_matcher())
        .map_err(|e| Error::InvalidArguments(format!("bad glob '{pattern}': {e}")))
}
