//! Tool registry and the concrete tool catalogue (spec §4.2 step 7, §9 tool table).
//!
//! Generalizes the teacher's `tool_source`/`tools` split into one module: a small
//! [`Tool`] capability trait (kept from `tools/trait.rs`), a [`ToolRegistry`]
//! aggregating concrete tools by name, and the concrete tools this runtime ships:
//! `read_file`/`list_dir`/`write_file` under the working folder, `shell_exec`, and
//! `web_fetch`. `finish` is not a tool — it is the ReAct loop's terminal action,
//! handled directly by the executor (spec §4.2 step 6).

mod registry;
mod spec;
#[allow(clippy::module_inception)]
mod r#trait;

pub mod file;
pub mod shell;
pub mod web;

pub use r#trait::Tool;
pub use registry::ToolRegistry;
pub use spec::{ToolCallContent, ToolCallContext, ToolSpec};
