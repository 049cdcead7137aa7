//! Intent pre-pass (spec §4.3) — a cheap LLM call at iteration 1 that proposes
//! which concrete model should serve the turn, picked from a catalogue built from
//! the registered pool (vision models only, when the turn carries images).

use crate::gateway::GatewayRegistry;
use crate::json_extract::extract_first_json_object;
use crate::model::GenerationParams;
use crate::message::Message;
use crate::router::pool::ModelPool;

const INTENT_SYSTEM_PROMPT: &str = "You are a routing assistant. Given the catalogue of \
available models below and the user's message, reply with exactly one JSON object \
`{\"model\": \"<provider>/<id>\", \"reason\": \"<short reason>\"}` naming the single best \
model from the catalogue for this message. Do not add any other text.";

fn build_catalogue(pool: &ModelPool, has_images: bool) -> Vec<String> {
    pool.iter()
        .filter(|m| !has_images || m.vision)
        .map(|m| m.key())
        .collect()
}

/// Runs the intent pre-pass; returns `Some((model_key, reason))` only when the
/// reply names a model present in the (possibly vision-filtered) catalogue.
/// Any other outcome — transport failure, unparsable reply, unknown model, or a
/// named model lacking vision when images are present — returns `None` so the
/// caller falls back to rule/complexity routing (spec §4.3).
pub async fn intent_pre_pass(
    pool: &ModelPool,
    gateway: &GatewayRegistry,
    intent_model: &str,
    turn_content: &str,
    has_images: bool,
) -> Option<(String, String)> {
    let catalogue = build_catalogue(pool, has_images);
    if catalogue.is_empty() {
        return None;
    }

    let catalogue_block = catalogue.join("\n");
    let messages = vec![
        Message::system(format!("{INTENT_SYSTEM_PROMPT}\n\nCatalogue:\n{catalogue_block}")),
        Message::user(turn_content),
    ];

    let params = GenerationParams {
        max_tokens: Some(100),
        temperature: Some(0.0),
        ..Default::default()
    };

    let response = gateway.chat(&messages, &[], intent_model, params).await.ok()?;
    let value = extract_first_json_object(&response.content)?;
    let model = value.get("model")?.as_str()?.to_string();
    let reason = value
        .get("reason")
        .and_then(|v| v.as_str())
        .unwrap_or("intent pre-pass")
        .to_string();

    if !catalogue.iter().any(|k| k == &model) {
        return None;
    }
    if has_images && !pool.iter().any(|m| m.key() == model && m.vision) {
        return None;
    }
    Some((model, reason))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{GatewayRegistry, MockProvider, ProviderEntry};
    use crate::model::{GenerationParams as GP, Level, ModelCapability};

    fn pool_with(models: Vec<ModelCapability>) -> ModelPool {
        let mut pool = ModelPool::new();
        for m in models {
            pool.register(m);
        }
        pool
    }

    fn cap(id: &str, provider: &str, level: Level, vision: bool) -> ModelCapability {
        ModelCapability {
            id: id.into(),
            provider: provider.into(),
            level,
            vision,
            think: false,
            tool: true,
            params: GP::default(),
        }
    }

    #[tokio::test]
    async fn accepts_model_named_in_catalogue() {
        let pool = pool_with(vec![cap("gpt-4o-mini", "openai", Level::Medium, false)]);
        let mut gw = GatewayRegistry::new();
        gw.register(ProviderEntry {
            name: "openai".into(),
            priority: 0,
            model_patterns: vec!["*".into()],
            client: Box::new(MockProvider::fixed(
                "openai",
                r#"{"model": "openai/gpt-4o-mini", "reason": "simple question"}"#,
            )),
        });
        let result = intent_pre_pass(&pool, &gw, "openai/gpt-4o-mini", "hi", false).await;
        assert_eq!(result.unwrap().0, "openai/gpt-4o-mini");
    }

    #[tokio::test]
    async fn rejects_model_not_in_catalogue() {
        let pool = pool_with(vec![cap("gpt-4o-mini", "openai", Level::Medium, false)]);
        let mut gw = GatewayRegistry::new();
        gw.register(ProviderEntry {
            name: "openai".into(),
            priority: 0,
            model_patterns: vec!["*".into()],
            client: Box::new(MockProvider::fixed(
                "openai",
                r#"{"model": "openai/not-real", "reason": "x"}"#,
            )),
        });
        let result = intent_pre_pass(&pool, &gw, "openai/gpt-4o-mini", "hi", false).await;
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn rejects_non_vision_model_when_images_present() {
        let pool = pool_with(vec![cap("gpt-4o-mini", "openai", Level::Medium, false)]);
        let mut gw = GatewayRegistry::new();
        gw.register(ProviderEntry {
            name: "openai".into(),
            priority: 0,
            model_patterns: vec!["*".into()],
            client: Box::new(MockProvider::fixed(
                "openai",
                r#"{"model": "openai/gpt-4o-mini", "reason": "x"}"#,
            )),
        });
        let result = intent_pre_pass(&pool, &gw, "openai/gpt-4o-mini", "look at this", true).await;
        assert!(result.is_none());
    }
}
