//! Deterministic provider for tests (grounded on the teacher's `MockLlm`).

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::GatewayError;
use crate::gateway::{ChatResponse, Provider, ToolDefinition};
use crate::message::Message;
use crate::model::GenerationParams;

enum Behavior {
    Fixed(String),
    Sequence(Vec<String>),
    Failing,
}

pub struct MockProvider {
    name: String,
    behavior: Behavior,
    cursor: AtomicUsize,
}

impl MockProvider {
    pub fn fixed(name: &str, content: &str) -> Self {
        Self {
            name: name.to_string(),
            behavior: Behavior::Fixed(content.to_string()),
            cursor: AtomicUsize::new(0),
        }
    }

    /// Returns each string in order on successive calls, repeating the last one
    /// once exhausted. Useful for multi-iteration ReAct tests.
    pub fn sequence(name: &str, replies: Vec<&str>) -> Self {
        Self {
            name: name.to_string(),
            behavior: Behavior::Sequence(replies.into_iter().map(String::from).collect()),
            cursor: AtomicUsize::new(0),
        }
    }

    pub fn failing(name: &str) -> Self {
        Self {
            name: name.to_string(),
            behavior: Behavior::Failing,
            cursor: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn chat(
        &self,
        _messages: &[Message],
        _tools: &[ToolDefinition],
        model_id: &str,
        _params: GenerationParams,
    ) -> Result<ChatResponse, GatewayError> {
        match &self.behavior {
            Behavior::Fixed(content) => Ok(ChatResponse {
                content: content.clone(),
                tool_calls: vec![],
                used_provider: self.name.clone(),
                used_model: model_id.to_string(),
                used_level: None,
                usage: None,
            }),
            Behavior::Sequence(replies) => {
                let i = self.cursor.fetch_add(1, Ordering::SeqCst);
                let content = replies.get(i).or_else(|| replies.last()).cloned().unwrap_or_default();
                Ok(ChatResponse {
                    content,
                    tool_calls: vec![],
                    used_provider: self.name.clone(),
                    used_model: model_id.to_string(),
                    used_level: None,
                    usage: None,
                })
            }
            Behavior::Failing => Err(GatewayError::Transport {
                provider: self.name.clone(),
                message: "mock transport failure".to_string(),
            }),
        }
    }
}
