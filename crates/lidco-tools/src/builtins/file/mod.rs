//! File tools: file_read, file_write, file_edit

mod edit;
mod read;
mod write;


pub use edit::FileEditTool;
pub use read::FileReadTool;
pub use write::FileWriteTool;
