//! LLM Gateway (spec §4.4) — a registry of providers keyed by name, each serving a
//! set of model patterns at a priority; `chat` resolves `"<provider>/<id>"`,
//! forwards to that provider, and on transport/5xx/timeout errors retries the next
//! provider (by ascending priority) whose pattern matches the model id.

mod http_provider;
mod mock_provider;

pub use http_provider::HttpProvider;
pub use mock_provider::MockProvider;

use async_trait::async_trait;

use crate::error::GatewayError;
use crate::message::Message;
use crate::model::{split_model_key, GenerationParams};

/// Token usage reported by a provider, when available (spec §4.4).
#[derive(Clone, Copy, Debug, Default)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub total_tokens: u32,
}

/// Result of one `chat` call (spec §4.4).
#[derive(Clone, Debug)]
pub struct ChatResponse {
    pub content: String,
    pub tool_calls: Vec<ToolCallRequest>,
    pub used_provider: String,
    pub used_model: String,
    pub used_level: Option<String>,
    pub usage: Option<Usage>,
}

impl ChatResponse {
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// A tool invocation requested by the model via native function-calling. The
/// core ReAct loop (spec §4.2) is text-only and never sends `tools`, so this is
/// populated only by callers (e.g. the intent pre-pass never sets it) that opt
/// into native tool calling; kept for gateway completeness per spec §4.4.
#[derive(Clone, Debug)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

/// A tool definition offered to the provider, only forwarded when both the caller
/// supplied a non-empty list *and* the resolved model's `tool` capability is true
/// (spec §4.4).
#[derive(Clone, Debug)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

/// One provider registration: base URL, optional key, served model patterns,
/// fallback priority (lower = more preferred), and capability table (spec §4.4).
pub struct ProviderEntry {
    pub name: String,
    pub priority: i32,
    /// Model id patterns this provider serves; `"*"` is a catch-all.
    pub model_patterns: Vec<String>,
    pub client: Box<dyn Provider>,
}

impl ProviderEntry {
    fn matches(&self, model_id: &str) -> bool {
        self.model_patterns
            .iter()
            .any(|p| p == "*" || p == model_id)
    }
}

/// Capability surface a concrete provider exposes (spec §9 "Polymorphic
/// provider/channel/tool... keep these as small capability sets").
#[async_trait]
pub trait Provider: Send + Sync {
    async fn chat(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        model_id: &str,
        params: GenerationParams,
    ) -> Result<ChatResponse, GatewayError>;

    /// Optional discovery; default providers that don't support `GET /models`
    /// just report their statically configured ids.
    async fn list_models(&self) -> Vec<String> {
        Vec::new()
    }

    fn capabilities(&self, _model_id: &str) -> Option<crate::model::ModelCapability> {
        None
    }
}

/// Registry of providers; resolves `"<provider>/<id>"`, forwards, and falls back
/// across priority-ordered providers on transport failure (spec §4.4).
#[derive(Default)]
pub struct GatewayRegistry {
    providers: Vec<ProviderEntry>,
}

impl GatewayRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, entry: ProviderEntry) {
        self.providers.push(entry);
        self.providers.sort_by_key(|p| p.priority);
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name.as_str()).collect()
    }

    /// Resolves `model = "<provider>/<id>"`, calls that provider; on transport
    /// error tries the next provider (ascending priority) whose pattern matches
    /// `id`, until one succeeds or all are exhausted.
    pub async fn chat(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        model: &str,
        params: GenerationParams,
    ) -> Result<ChatResponse, GatewayError> {
        let (provider_name, model_id) = split_model_key(model)
            .ok_or_else(|| GatewayError::MalformedModelKey(model.to_string()))?;

        let primary = self
            .providers
            .iter()
            .find(|p| p.name == provider_name)
            .ok_or_else(|| GatewayError::NoProvider(model.to_string()))?;

        let effective_tools: &[ToolDefinition] =
            if !tools.is_empty() && primary.client.capabilities(model_id).map(|c| c.tool).unwrap_or(true) {
                tools
            } else {
                &[]
            };

        match primary.client.chat(messages, effective_tools, model_id, params).await {
            Ok(resp) => return Ok(resp),
            Err(first_err) => {
                tracing::warn!(provider = %primary.name, error = %first_err, "gateway: primary provider failed, trying fallbacks");
                for fallback in self
                    .providers
                    .iter()
                    .filter(|p| p.name != provider_name && p.matches(model_id))
                {
                    match fallback.client.chat(messages, effective_tools, model_id, params).await {
                        Ok(resp) => return Ok(resp),
                        Err(e) => {
                            tracing::warn!(provider = %fallback.name, error = %e, "gateway: fallback provider failed");
                            continue;
                        }
                    }
                }
                Err(GatewayError::Exhausted(model.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MockProvider;

    fn params() -> GenerationParams {
        GenerationParams::default()
    }

    #[tokio::test]
    async fn resolves_provider_slash_model() {
        let mut reg = GatewayRegistry::new();
        reg.register(ProviderEntry {
            name: "openai".into(),
            priority: 0,
            model_patterns: vec!["*".into()],
            client: Box::new(MockProvider::fixed("openai", "hello")),
        });
        let resp = reg
            .chat(&[Message::user("hi")], &[], "openai/gpt-4o-mini", params())
            .await
            .unwrap();
        assert_eq!(resp.content, "hello");
        assert_eq!(resp.used_provider, "openai");
    }

    #[tokio::test]
    async fn falls_back_to_next_priority_provider_on_failure() {
        let mut reg = GatewayRegistry::new();
        reg.register(ProviderEntry {
            name: "primary".into(),
            priority: 0,
            model_patterns: vec!["*".into()],
            client: Box::new(MockProvider::failing("primary")),
        });
        reg.register(ProviderEntry {
            name: "backup".into(),
            priority: 1,
            model_patterns: vec!["*".into()],
            client: Box::new(MockProvider::fixed("backup", "from backup")),
        });
        let resp = reg
            .chat(&[Message::user("hi")], &[], "primary/gpt", params())
            .await
            .unwrap();
        assert_eq!(resp.used_provider, "backup");
        assert_eq!(resp.content, "from backup");
    }

    #[tokio::test]
    async fn exhausted_when_every_provider_fails() {
        let mut reg = GatewayRegistry::new();
        reg.register(ProviderEntry {
            name: "primary".into(),
            priority: 0,
            model_patterns: vec!["*".into()],
            client: Box::new(MockProvider::failing("primary")),
        });
        let err = reg
            .chat(&[Message::user("hi")], &[], "primary/gpt", params())
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Exhausted(_)));
    }

    #[tokio::test]
    async fn malformed_model_key_is_rejected() {
        let reg = GatewayRegistry::new();
        let err = reg.chat(&[], &[], "no-slash-here", params()).await.unwrap_err();
        assert!(matches!(err, GatewayError::MalformedModelKey(_)));
    }
}
