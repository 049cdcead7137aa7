//! OpenAI-compatible HTTP provider (spec §6 "Provider HTTP").
//!
//! Grounded on the teacher's `async-openai`-based client config pattern (see
//! `memory::openai_embedder::OpenAIEmbedder::with_config`): one `OpenAIConfig`
//! per registered provider, pointed at that provider's `baseUrl`/`apiKey`.

use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestToolMessageArgs,
    ChatCompletionRequestUserMessageArgs, ChatCompletionTool, ChatCompletionToolType,
    CreateChatCompletionRequestArgs, FunctionObjectArgs,
};
use async_trait::async_trait;

use crate::error::GatewayError;
use crate::gateway::{ChatResponse, Provider, ToolDefinition, Usage};
use crate::message::Message;
use crate::model::GenerationParams;

pub struct HttpProvider {
    name: String,
    config: OpenAIConfig,
}

impl HttpProvider {
    pub fn new(name: impl Into<String>, base_url: &str, api_key: Option<&str>) -> Self {
        let mut config = OpenAIConfig::new().with_api_base(base_url);
        if let Some(key) = api_key {
            config = config.with_api_key(key);
        }
        Self {
            name: name.into(),
            config,
        }
    }

    fn to_openai_messages(messages: &[Message]) -> Vec<ChatCompletionRequestMessage> {
        messages
            .iter()
            .filter_map(|m| match m {
                Message::System(content) => ChatCompletionRequestSystemMessageArgs::default()
                    .content(content.clone())
                    .build()
                    .ok()
                    .map(Into::into),
                Message::User(turn) => ChatCompletionRequestUserMessageArgs::default()
                    .content(turn.content.clone())
                    .build()
                    .ok()
                    .map(Into::into),
                Message::Assistant(turn) => ChatCompletionRequestAssistantMessageArgs::default()
                    .content(turn.content.clone())
                    .build()
                    .ok()
                    .map(Into::into),
                Message::Tool(turn) => ChatCompletionRequestToolMessageArgs::default()
                    .content(turn.content.clone())
                    .tool_call_id(turn.tool_call_id.clone())
                    .build()
                    .ok()
                    .map(Into::into),
            })
            .collect()
    }

    fn to_openai_tools(tools: &[ToolDefinition]) -> Vec<ChatCompletionTool> {
        tools
            .iter()
            .filter_map(|t| {
                FunctionObjectArgs::default()
                    .name(t.name.clone())
                    .description(t.description.clone())
                    .parameters(t.input_schema.clone())
                    .build()
                    .ok()
                    .map(|f| ChatCompletionTool {
                        r#type: ChatCompletionToolType::Function,
                        function: f,
                    })
            })
            .collect()
    }
}

#[async_trait]
impl Provider for HttpProvider {
    async fn chat(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        model_id: &str,
        params: GenerationParams,
    ) -> Result<ChatResponse, GatewayError> {
        let client = async_openai::Client::with_config(self.config.clone());
        let mut builder = CreateChatCompletionRequestArgs::default();
        builder.model(model_id).messages(Self::to_openai_messages(messages));
        if let Some(v) = params.max_tokens {
            builder.max_tokens(v);
        }
        if let Some(v) = params.temperature {
            builder.temperature(v);
        }
        if let Some(v) = params.top_p {
            builder.top_p(v);
        }
        if let Some(v) = params.frequency_penalty {
            builder.frequency_penalty(v);
        }
        if !tools.is_empty() {
            builder.tools(Self::to_openai_tools(tools));
        }
        let request = builder.build().map_err(|e| GatewayError::Transport {
            provider: self.name.clone(),
            message: e.to_string(),
        })?;

        let response = client
            .chat()
            .create(request)
            .await
            .map_err(|e| GatewayError::Transport {
                provider: self.name.clone(),
                message: e.to_string(),
            })?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| GatewayError::Transport {
                provider: self.name.clone(),
                message: "empty choices in response".to_string(),
            })?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| crate::gateway::ToolCallRequest {
                id: tc.id,
                name: tc.function.name,
                arguments: serde_json::from_str(&tc.function.arguments)
                    .unwrap_or(serde_json::Value::Null),
            })
            .collect();

        Ok(ChatResponse {
            content: choice.message.content.unwrap_or_default(),
            tool_calls,
            used_provider: self.name.clone(),
            used_model: model_id.to_string(),
            used_level: None,
            usage: response.usage.map(|u| Usage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
        })
    }
}
