//! Shared tool-call types (spec §4.2 step 7, §9 "small capability sets").

use serde_json::Value;

/// Declares one tool to the model/executor: name, description, JSON schema.
#[derive(Clone, Debug)]
pub struct ToolSpec {
    pub name: String,
    pub description: Option<String>,
    pub input_schema: Value,
}

/// Plain-text result of a tool call; folded into a `Message::Tool` observation.
#[derive(Clone, Debug, Default)]
pub struct ToolCallContent {
    pub text: String,
}

/// Per-call context a tool may consult (e.g. recent turns for a memory-aware tool).
/// The concrete file/shell/web tools in this crate ignore it, but it stays part of
/// `Tool::call`'s signature for tools that need the calling session's turns.
#[derive(Clone, Debug, Default)]
pub struct ToolCallContext {
    pub session_key: Option<String>,
    pub recent_messages: Vec<crate::message::Message>,
}
