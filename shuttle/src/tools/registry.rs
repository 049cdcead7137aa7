//! `ToolRegistry` — aggregates concrete tools behind one name-keyed lookup,
//! consulted by the executor after alias resolution (spec §4.2 step 7).

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::ToolSourceError;

use super::{Tool, ToolCallContent, ToolCallContext, ToolSpec};

#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn list(&self) -> Vec<ToolSpec> {
        self.tools.values().map(|t| t.spec()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub async fn call(
        &self,
        name: &str,
        args: serde_json::Value,
        ctx: Option<&ToolCallContext>,
    ) -> Result<ToolCallContent, ToolSourceError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolSourceError::UnknownTool(name.to_string()))?;
        tool.call(args, ctx).await
    }
}
