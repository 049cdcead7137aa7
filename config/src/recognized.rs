//! Typed view over the recognized configuration surface of the agent runtime.
//!
//! Parses the `agents`, `providers`, `routing`, and `memory` tables documented in the
//! runtime's external-interfaces spec. Unknown keys are ignored (forward-compatible);
//! missing optional fields fall back to the runtime defaults given in each struct's
//! `Default` impl.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RuntimeConfigError {
    #[error("read {0}: {1}")]
    Read(std::path::PathBuf, std::io::Error),
    #[error("parse toml: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level recognized configuration document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub agents: AgentsConfig,
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    #[serde(default)]
    pub routing: RoutingConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
}

impl RuntimeConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, RuntimeConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: &std::path::Path) -> Result<Self, RuntimeConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RuntimeConfigError::Read(path.to_path_buf(), e))?;
        Self::from_toml_str(&content)
    }
}

/// `agents.*` — executor and router top-level knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentsConfig {
    #[serde(default = "default_workspace")]
    pub workspace: String,
    #[serde(default)]
    pub models: AgentsModels,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    pub top_k: Option<u32>,
    pub top_p: Option<f32>,
    pub frequency_penalty: Option<f32>,
    #[serde(default = "default_max_tool_iterations")]
    pub max_tool_iterations: u32,
    #[serde(default)]
    pub auto: bool,
    #[serde(default)]
    pub max: bool,
}

fn default_workspace() -> String {
    ".".to_string()
}
fn default_max_tokens() -> u32 {
    4096
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tool_iterations() -> u32 {
    20
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            workspace: default_workspace(),
            models: AgentsModels::default(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            top_k: None,
            top_p: None,
            frequency_penalty: None,
            max_tool_iterations: default_max_tool_iterations(),
            auto: false,
            max: false,
        }
    }
}

/// `agents.models.*` — named model-key slots. Each value is a fully-qualified
/// `"<provider>/<model>"` key, resolved against the provider registry at startup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentsModels {
    pub chat: Option<String>,
    pub intent: Option<String>,
    pub vision: Option<String>,
    pub embed: Option<String>,
    pub coder: Option<String>,
}

/// `providers.<name>` — one LLM provider registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    #[serde(default)]
    pub models: Vec<ModelConfigEntry>,
    #[serde(default)]
    pub priority: i32,
}

/// A model entry under `providers.<name>.models`: either a bare model id string
/// (defaults filled in) or an inline capability table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModelConfigEntry {
    Id(String),
    Full(ModelCapabilityConfig),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelCapabilityConfig {
    pub id: String,
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub vision: bool,
    #[serde(default)]
    pub think: bool,
    #[serde(default = "default_true")]
    pub tool: bool,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub top_k: Option<u32>,
    pub top_p: Option<f32>,
    pub frequency_penalty: Option<f32>,
}

fn default_level() -> String {
    "medium".to_string()
}
fn default_true() -> bool {
    true
}

/// `routing.*` — rule-based + complexity-score routing tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub rules: Vec<RoutingRuleConfig>,
    #[serde(default = "default_base_score")]
    pub base_score: i32,
    #[serde(default = "default_length_weight")]
    pub length_weight: i32,
    #[serde(default = "default_code_block_score")]
    pub code_block_score: i32,
    #[serde(default = "default_tool_call_score")]
    pub tool_call_score: i32,
    #[serde(default = "default_multi_turn_score")]
    pub multi_turn_score: i32,
}

fn default_base_score() -> i32 {
    10
}
fn default_length_weight() -> i32 {
    1
}
fn default_code_block_score() -> i32 {
    15
}
fn default_tool_call_score() -> i32 {
    15
}
fn default_multi_turn_score() -> i32 {
    2
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            rules: Vec::new(),
            base_score: default_base_score(),
            length_weight: default_length_weight(),
            code_block_score: default_code_block_score(),
            tool_call_score: default_tool_call_score(),
            multi_turn_score: default_multi_turn_score(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingRuleConfig {
    #[serde(default)]
    pub keywords: Vec<String>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub level: String,
    #[serde(default)]
    pub priority: i32,
}

/// `memory.*` — store + migration tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_storage_path")]
    pub storage_path: String,
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,
    #[serde(default = "default_retention_days")]
    pub short_term_retention_days: u32,
    #[serde(default)]
    pub auto_summarize: bool,
    #[serde(default = "default_summarize_threshold")]
    pub summarize_threshold: usize,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout: u64,
    #[serde(default)]
    pub multi_embed: MultiEmbedConfig,
}

fn default_storage_path() -> String {
    "./data/memory".to_string()
}
fn default_search_limit() -> usize {
    10
}
fn default_retention_days() -> u32 {
    30
}
fn default_summarize_threshold() -> usize {
    20
}
fn default_idle_timeout() -> u64 {
    10 * 60 * 1000
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            storage_path: default_storage_path(),
            search_limit: default_search_limit(),
            short_term_retention_days: default_retention_days(),
            auto_summarize: false,
            summarize_threshold: default_summarize_threshold(),
            idle_timeout: default_idle_timeout(),
            multi_embed: MultiEmbedConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiEmbedConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_max_models")]
    pub max_models: u32,
    #[serde(default)]
    pub auto_migrate: bool,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// `0` means adaptive pacing (see migration engine).
    #[serde(default)]
    pub migrate_interval: u64,
}

fn default_max_models() -> u32 {
    3
}
fn default_batch_size() -> usize {
    50
}

impl Default for MultiEmbedConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_models: default_max_models(),
            auto_migrate: false,
            batch_size: default_batch_size(),
            migrate_interval: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_round_trip_on_empty_document() {
        let cfg = RuntimeConfig::from_toml_str("").unwrap();
        assert_eq!(cfg.agents.workspace, ".");
        assert_eq!(cfg.agents.max_tool_iterations, 20);
        assert!(!cfg.routing.enabled);
        assert!(cfg.memory.enabled);
        assert_eq!(cfg.memory.multi_embed.batch_size, 50);
    }

    #[test]
    fn parses_full_document() {
        let toml_str = r#"
[agents]
workspace = "/home/bot"
auto = true
max = false
max_tool_iterations = 12

[agents.models]
chat = "openai/gpt-4o-mini"
intent = "openai/gpt-4o-mini"

[providers.openai]
base_url = "https://api.openai.com/v1"
api_key = "sk-test"
priority = 0
models = ["gpt-4o-mini", { id = "gpt-4o", level = "high", vision = true }]

[routing]
enabled = true
base_score = 5

[[routing.rules]]
keywords = ["重构", "refactor"]
level = "high"
priority = 10

[memory]
storage_path = "/data/mem"
short_term_retention_days = 7

[memory.multi_embed]
enabled = true
max_models = 2
batch_size = 25
"#;
        let cfg = RuntimeConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(cfg.agents.workspace, "/home/bot");
        assert!(cfg.agents.auto);
        assert_eq!(cfg.agents.max_tool_iterations, 12);
        assert_eq!(
            cfg.agents.models.chat.as_deref(),
            Some("openai/gpt-4o-mini")
        );

        let openai = cfg.providers.get("openai").expect("openai provider");
        assert_eq!(openai.base_url, "https://api.openai.com/v1");
        assert_eq!(openai.models.len(), 2);
        match &openai.models[1] {
            ModelConfigEntry::Full(c) => {
                assert_eq!(c.id, "gpt-4o");
                assert_eq!(c.level, "high");
                assert!(c.vision);
            }
            ModelConfigEntry::Id(_) => panic!("expected full entry"),
        }

        assert!(cfg.routing.enabled);
        assert_eq!(cfg.routing.rules.len(), 1);
        assert_eq!(cfg.routing.rules[0].level, "high");

        assert_eq!(cfg.memory.storage_path, "/data/mem");
        assert_eq!(cfg.memory.short_term_retention_days, 7);
        assert!(cfg.memory.multi_embed.enabled);
        assert_eq!(cfg.memory.multi_embed.max_models, 2);
    }

    #[test]
    fn invalid_document_is_a_parse_error() {
        let err = RuntimeConfig::from_toml_str("not valid [[[").unwrap_err();
        assert!(matches!(err, RuntimeConfigError::Parse(_)));
    }
}
