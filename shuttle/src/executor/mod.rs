//! Agent Executor (spec §4.2) — the text-based ReAct loop.
//!
//! The teacher's ReAct implementation is built around native function-calling; this
//! loop is a plain async loop (not a generic state graph) that reuses the teacher's
//! separation of concerns — a "think" step (call the gateway), a "parse" step (ReAct
//! object extraction), an "act" step (tool dispatch via [`crate::tools::ToolRegistry`])
//! — without a generic state-graph/node/channel-merge machinery, which spec §4.2 notes
//! is out of scope for a single bounded loop.

mod alias;
mod redact;

pub mod prompt;

pub use prompt::SystemPromptParts;
pub use redact::redact;

use serde_json::Value;

use crate::bus::{InboundMessage, OutboundMessage};
use crate::error::ExecutorError;
use crate::gateway::GatewayRegistry;
use crate::json_extract::extract_first_json_object;
use crate::message::{new_shared_history, Message, SharedSessionHistory};
use crate::model::GenerationParams;
use crate::router::{RouteInput, Router};
use crate::tools::{ToolRegistry, ToolSpec};

const FINISH_ACTION: &str = "finish";

/// Returned to the channel when the loop exhausts `maxIterations` without a
/// `finish` (spec §4.2 "On loop exhaustion").
const TRUNCATED_NOTICE: &str =
    "I've run out of reasoning steps for this turn without reaching a final answer. Please rephrase or narrow the request.";
/// Returned to the channel when a gateway exception escapes the loop (spec §4.2
/// "Failure behavior": "Gateway exceptions propagate once; the surrounding loop
/// catches them and returns a generic apology").
const APOLOGY_NOTICE: &str = "Sorry, something went wrong while processing that. Please try again.";
/// Substituted for media the selected model cannot see (spec §4.2 Assembly step 3).
const MEDIA_PLACEHOLDER: &str = "[media attached, but the selected model is not vision-capable]";

/// Tunables and injected prompt material for one [`Executor`] (spec §4.2 "Inputs").
pub struct ExecutorConfig {
    pub max_iterations: u32,
    pub default_params: GenerationParams,
    pub system_prompt: SystemPromptParts,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_iterations: 20,
            default_params: GenerationParams::default(),
            system_prompt: SystemPromptParts::default(),
        }
    }
}

enum LoopOutcome {
    Finished(String),
    Truncated(String),
}

/// Drives the ReAct loop for a process's inbound messages and owns
/// [`SessionHistory`] — the only component that mutates it (spec §5 "Shared
/// resources": "each is owned by exactly one component ... and mutated only by
/// that owner").
pub struct Executor {
    history: SharedSessionHistory,
    config: ExecutorConfig,
}

impl Executor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self::with_history(config, new_shared_history())
    }

    /// Builds an executor over a history handle shared with another owner
    /// (e.g. a [`crate::summarizer::Summarizer`] task rolling idle sessions
    /// into memory summaries — spec §4.7).
    pub fn with_history(config: ExecutorConfig, history: SharedSessionHistory) -> Self {
        Self { history, config }
    }

    /// Clones the shared history handle, e.g. to hand to a [`crate::summarizer::Summarizer`].
    pub fn shared_history(&self) -> SharedSessionHistory {
        self.history.clone()
    }

    /// Read-only snapshot of one session's turns, oldest first.
    pub fn history(&self, key: &str) -> Vec<Message> {
        self.history.lock().unwrap().get(key)
    }

    /// Processes one inbound message to completion. Never returns an error: a
    /// gateway failure is caught and turned into [`APOLOGY_NOTICE`] (spec §4.2
    /// "Failure behavior").
    pub async fn handle_message(
        &mut self,
        inbound: &InboundMessage,
        router: &Router,
        gateway: &GatewayRegistry,
        tools: &ToolRegistry,
    ) -> OutboundMessage {
        let session_key = inbound.session_key();
        let assembled = self.assemble(&session_key, inbound);

        let outcome = Self::run_loop(assembled, &self.config, router, gateway, tools).await;

        let content = match outcome {
            Ok(LoopOutcome::Finished(reply)) => {
                self.history.lock().unwrap().push_turn(
                    &session_key,
                    Message::user_with_media(inbound.content.clone(), inbound.media.clone()),
                    Message::assistant(reply.clone()),
                );
                reply
            }
            Ok(LoopOutcome::Truncated(notice)) => notice,
            Err(err) => {
                tracing::error!(session = %session_key, error = %err, "executor: turn failed");
                redact(APOLOGY_NOTICE)
            }
        };

        OutboundMessage {
            channel: inbound.channel.clone(),
            chat_id: inbound.chat_id.clone(),
            content,
            media: Vec::new(),
            metadata: serde_json::json!({}),
        }
    }

    /// Assembles `(1) system block, (2) recent history (<=50 turns), (3) current
    /// user turn` (spec §4.2 Assembly).
    fn assemble(&self, session_key: &str, inbound: &InboundMessage) -> Vec<Message> {
        let mut messages = vec![Message::system(self.config.system_prompt.render())];
        messages.extend(self.history.lock().unwrap().get(session_key));
        messages.push(Message::user_with_media(inbound.content.clone(), inbound.media.clone()));
        messages
    }

    async fn run_loop(
        assembled: Vec<Message>,
        config: &ExecutorConfig,
        router: &Router,
        gateway: &GatewayRegistry,
        tools: &ToolRegistry,
    ) -> Result<LoopOutcome, ExecutorError> {
        let tool_catalog = tools.list();
        let mut working = assembled;
        // The ReAct system prompt is injected at iteration 0, right after the
        // identity/skills system block (spec §4.2 Assembly).
        working.insert(1, Message::system(prompt::react_system_prompt(&tool_catalog)));

        let media = last_user_media(&working);
        let mut iteration: u32 = 1;

        loop {
            let decision = router
                .route(
                    RouteInput {
                        messages: &working,
                        media: &media,
                        iteration,
                    },
                    Some(gateway),
                )
                .await?;
            let params = decision.capability.params.merged_over(&config.default_params);
            let iter_messages = strip_media_if_not_vision(&working, decision.capability.vision);

            let response = gateway.chat(&iter_messages, &[], &decision.model, params).await?;

            let Some(parsed) = extract_first_json_object(&response.content) else {
                return Ok(LoopOutcome::Finished(response.content));
            };

            let action = parsed.get("action").and_then(Value::as_str).unwrap_or_default();
            let action_input = parsed.get("action_input").cloned().unwrap_or(Value::Null);
            let resolved = alias::resolve_action(action, tools);

            if resolved.as_deref() == Some(FINISH_ACTION) {
                return Ok(LoopOutcome::Finished(stringify_action_input(&action_input)));
            }

            let observation = match resolved {
                None => error_observation(action, &format!("unknown action `{action}`")),
                Some(tool_name) => {
                    let spec = tool_catalog.iter().find(|s| s.name == tool_name);
                    let args = spec
                        .map(|s| normalize_tool_args(&action_input, s))
                        .unwrap_or_else(|| action_input.clone());
                    match tools.call(&tool_name, args, None).await {
                        Ok(content) => content.text,
                        Err(err) => error_observation(&tool_name, &redact(&err.to_string())),
                    }
                }
            };

            working.push(Message::assistant(response.content.clone()));
            working.push(Message::user(format!("Observation: {observation}")));

            iteration += 1;
            if iteration > config.max_iterations {
                return Ok(LoopOutcome::Truncated(TRUNCATED_NOTICE.to_string()));
            }
        }
    }
}

fn error_observation(tool: &str, message: &str) -> String {
    serde_json::json!({ "error": true, "message": message, "tool": tool }).to_string()
}

fn last_user_media(messages: &[Message]) -> Vec<String> {
    messages
        .iter()
        .rev()
        .find_map(|m| match m {
            Message::User(t) if !t.media.is_empty() => Some(t.media.clone()),
            _ => None,
        })
        .unwrap_or_default()
}

/// Clears media on every user turn and appends [`MEDIA_PLACEHOLDER`] when the
/// selected model lacks vision (spec §4.2 Assembly step 3 / Loop step 3).
fn strip_media_if_not_vision(messages: &[Message], vision: bool) -> Vec<Message> {
    if vision {
        return messages.to_vec();
    }
    messages
        .iter()
        .map(|m| match m {
            Message::User(turn) if !turn.media.is_empty() => {
                Message::user(format!("{}\n{}", turn.content, MEDIA_PLACEHOLDER))
            }
            other => other.clone(),
        })
        .collect()
}

/// `action_input` is passed through as-is when the model already produced the
/// tool's expected object shape; a bare scalar is wrapped under the tool's sole
/// required field when there is exactly one, else under a generic `"input"` key.
fn normalize_tool_args(action_input: &Value, spec: &ToolSpec) -> Value {
    if action_input.is_object() {
        return action_input.clone();
    }
    let required: Vec<&str> = spec
        .input_schema
        .get("required")
        .and_then(Value::as_array)
        .map(|arr| arr.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    match required.as_slice() {
        [single] => serde_json::json!({ *single: action_input.clone() }),
        _ => serde_json::json!({ "input": action_input.clone() }),
    }
}

fn stringify_action_input(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
