use async_trait::async_trait;

use crate::error::ToolSourceError;

use super::{ToolCallContent, ToolCallContext, ToolSpec};

/// Represents a single tool that can be called by the LLM.
///
/// Each tool has a unique name, a specification (description and JSON schema),
/// and implements the call logic. Tools are registered with [`super::ToolRegistry`]
/// and dispatched by the executor after alias resolution (spec §4.2 step 7).
#[async_trait]
pub trait Tool: Send + Sync {
    /// Returns the unique name of this tool.
    ///
    /// Must be unique across all tools registered in a `ToolRegistry`.
    fn name(&self) -> &str;

    /// Returns the specification for this tool: name, description, input schema.
    fn spec(&self) -> ToolSpec;

    /// Executes the tool with the given arguments and optional context.
    ///
    /// Returns the plain-text observation folded into a `Message::Tool` turn.
    async fn call(
        &self,
        args: serde_json::Value,
        ctx: Option<&ToolCallContext>,
    ) -> Result<ToolCallContent, ToolSourceError>;
}
