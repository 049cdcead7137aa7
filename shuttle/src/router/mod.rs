//! Model Router (spec §4.3) — fingerprints each turn (complexity, modality, tool
//! need) and picks a concrete model from the capability-tagged [`ModelPool`].
//!
//! Grounded on the teacher's `model_spec::cached`/`composite` resolver-composition
//! pattern (try a fast path, fall back to a slower composed resolver): the intent
//! pre-pass is the fast path that the deterministic rule/complexity scorer falls
//! back to (spec §4.3 "Auto mode, iteration 1... If the reply names a model that
//! is not in the catalogue, fall back to rule/complexity routing").

mod intent;
mod pool;
mod rules;

pub use intent::intent_pre_pass;
pub use pool::ModelPool;
pub use rules::{complexity_score, first_matching_rule_level, needs_tool, RoutingRule, RoutingWeights};

use crate::error::RouterError;
use crate::gateway::GatewayRegistry;
use crate::message::Message;
use crate::model::{Level, ModelCapability};

/// Input to one `route` call (spec §4.3).
pub struct RouteInput<'a> {
    pub messages: &'a [Message],
    pub media: &'a [String],
    pub iteration: u32,
}

/// Output of one `route` call (spec §4.3).
#[derive(Clone, Debug)]
pub struct RouteDecision {
    pub model: String,
    pub capability: ModelCapability,
    pub complexity: i32,
    pub reason: String,
}

pub struct Router {
    pool: ModelPool,
    rules: Vec<RoutingRule>,
    weights: RoutingWeights,
    auto: bool,
    max: bool,
    default_chat_model: String,
    intent_model: Option<String>,
}

impl Router {
    pub fn new(
        pool: ModelPool,
        rules: Vec<RoutingRule>,
        weights: RoutingWeights,
        auto: bool,
        max: bool,
        default_chat_model: String,
        intent_model: Option<String>,
    ) -> Self {
        Self {
            pool,
            rules,
            weights,
            auto,
            max,
            default_chat_model,
            intent_model,
        }
    }

    fn find_capability(&self, key: &str) -> Option<ModelCapability> {
        self.pool.iter().find(|m| m.key() == key).cloned()
    }

    fn last_user_content(messages: &[Message]) -> String {
        messages
            .iter()
            .rev()
            .find_map(|m| match m {
                Message::User(t) => Some(t.content.clone()),
                _ => None,
            })
            .unwrap_or_default()
    }

    /// Routes one iteration. `gateway` is consulted only for the intent
    /// pre-pass (iteration 1, auto mode, with an `intent_model` configured).
    pub async fn route(
        &self,
        input: RouteInput<'_>,
        gateway: Option<&GatewayRegistry>,
    ) -> Result<RouteDecision, RouterError> {
        if self.pool.is_empty() {
            return Err(RouterError::EmptyPool);
        }

        if !self.auto {
            let capability = self
                .find_capability(&self.default_chat_model)
                .ok_or(RouterError::EmptyPool)?;
            return Ok(RouteDecision {
                model: capability.key(),
                complexity: 0,
                reason: "non-auto mode: default chat model".to_string(),
                capability,
            });
        }

        let content = Self::last_user_content(input.messages);
        let num_turns = input.messages.len();
        let complexity = complexity_score(&content, num_turns, self.weights);
        let has_images = !input.media.is_empty();

        if input.iteration == 1 {
            if let (Some(intent_model), Some(gw)) = (&self.intent_model, gateway) {
                if let Some((model, reason)) =
                    intent_pre_pass(&self.pool, gw, intent_model, &content, has_images).await
                {
                    if let Some(capability) = self.find_capability(&model) {
                        return Ok(RouteDecision {
                            model,
                            capability,
                            complexity,
                            reason,
                        });
                    }
                }
            }
        }

        self.route_deterministic(&content, num_turns, has_images, complexity)
    }

    fn route_deterministic(
        &self,
        content: &str,
        num_turns: usize,
        has_images: bool,
        complexity: i32,
    ) -> Result<RouteDecision, RouterError> {
        let base_level = Level::from_complexity(complexity);
        let require_tool = needs_tool(content);

        // Step 1: vision override.
        if has_images && self.pool.any_vision() {
            if let Some(capability) = self.pool.select_vision_nearest(base_level, self.max) {
                return Ok(RouteDecision {
                    model: capability.key(),
                    capability: capability.clone(),
                    complexity,
                    reason: format!("图片消息 (image message): nearest vision model to level {base_level}"),
                });
            }
        }

        // Step 2: max mode. Step 3: rule match. Step 4: complexity-derived level.
        let target_level = if self.max {
            Level::Ultra
        } else if let Some(rule_level) = first_matching_rule_level(&self.rules, content) {
            rule_level
        } else {
            base_level
        };

        let reason_prefix = if self.max {
            "max mode: targeting ultra".to_string()
        } else if first_matching_rule_level(&self.rules, content).is_some() {
            format!("matched routing rule: targeting {target_level}")
        } else {
            format!("complexity score {complexity} -> {target_level}")
        };

        let capability = self
            .pool
            .select(target_level, false, require_tool, self.max)
            .ok_or(RouterError::EmptyPool)?;

        let reason = if require_tool {
            format!("{reason_prefix}; tool-need heuristic matched, requiring tool=true (turns={num_turns})")
        } else {
            format!("{reason_prefix} (turns={num_turns})")
        };

        Ok(RouteDecision {
            model: capability.key(),
            capability: capability.clone(),
            complexity,
            reason,
        })
    }
}
