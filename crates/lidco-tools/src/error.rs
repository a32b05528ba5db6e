//! Error types for lidco-tools

use thiserror::Error;

/// Tool error type.
///
/// These never escape [`crate::ToolRegistry::execute`]; the registry turns
/// every variant into a failed [`crate::ToolResult`].
#[derive(Debug, Error)]
pub enum Error {
    /// Tool not found
    #[error("Unknown tool: {0}")]
    NotFound(String),

    /// Arguments do not match the tool's schema
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// Tool ran and failed
    #[error("{0}")]
    Execution(String),

    /// Permission gate refused the call
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Tool exceeded its time limit
    #[error("timed out after {0}s")]
    Timeout(u64),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
