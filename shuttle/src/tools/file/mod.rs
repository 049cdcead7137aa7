//! File tools: `read_file`, `list_dir`, `write_file`, all sandboxed under one
//! working folder via [`path::resolve_path_under`].

mod ls;
mod path;
mod read_file;
mod write_file;

pub use ls::{LsTool, TOOL_LS};
pub use path::resolve_path_under;
pub use read_file::{ReadFileTool, TOOL_READ_FILE};
pub use write_file::{TOOL_WRITE_FILE, WriteFileTool};
