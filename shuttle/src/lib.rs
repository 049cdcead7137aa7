//! # Shuttle
//!
//! The core agent runtime of a lightweight personal AI-assistant framework: a
//! bus-fed [`Executor`] drives a bounded tool-using ReAct loop against a
//! capability-routed pool of LLM providers, while a migration-aware
//! [`memory::MemoryStore`] persists long-term conversational memory across
//! embedding-model changes.
//!
//! ## Subsystems
//!
//! - [`bus`]: bounded inbound/outbound FIFO queues between channel adapters
//!   and the executor ([`MessageBus`]).
//! - [`channel`]: the channel-adapter capability trait ([`Channel`]) and a
//!   reference console implementation; concrete chat platforms (Feishu, QQ,
//!   …) are external collaborators per the spec's scope.
//! - [`executor`]: the ReAct loop itself — prompt assembly, iteration
//!   bounding, action alias resolution, error redaction ([`Executor`],
//!   [`ExecutorConfig`]).
//! - [`router`]: request fingerprinting (complexity/modality/tool-need),
//!   intent pre-pass, and capability-based model selection ([`Router`]).
//! - [`gateway`]: the provider registry and fallback-by-priority `chat` call
//!   ([`GatewayRegistry`]).
//! - [`model`]: the closed `Level` enum, [`ModelCapability`], and generation
//!   parameter merging.
//! - [`memory`]: the dual-index (vector + keyword) entry store with dynamic
//!   per-embedding-model columns ([`MemoryStore`]).
//! - [`migration`]: resumable background re-embedding between embedding
//!   models with adaptive pacing ([`MigrationEngine`]).
//! - [`summarizer`]: idle/long-session rollup into memory summaries
//!   ([`Summarizer`]).
//! - [`tools`]: the tool capability trait, registry, and concrete tools
//!   (`read_file`, `list_dir`, `write_file`, `shell_exec`, `web_fetch`).
//! - [`message`]: the `Message` sum type and the bounded, LRU-evicted
//!   [`message::SessionHistory`].
//! - [`error`]: one narrow `thiserror` enum per subsystem.
//!
//! Key types are re-exported at crate root: `use shuttle::{Executor, Router, MemoryStore};`.

pub mod bus;
pub mod channel;
pub mod error;
pub mod executor;
pub mod gateway;
pub mod json_extract;
pub mod memory;
pub mod message;
pub mod migration;
pub mod model;
pub mod router;
pub mod summarizer;
pub mod tools;

pub use bus::{BusConsumer, InboundMessage, MessageBus, OutboundMessage};
pub use channel::{Channel, ConsoleChannel, CONSOLE_CHANNEL};
pub use error::{
    ExecutorError, GatewayError, MigrationError, RouterError, StoreError, SummarizerError,
    ToolSourceError,
};
pub use executor::{Executor, ExecutorConfig, SystemPromptParts};
pub use gateway::{
    ChatResponse, GatewayRegistry, HttpProvider, MockProvider, ProviderEntry, ToolCallRequest,
    Usage,
};
pub use memory::{
    Embedder, MemoryEntry, MemoryStore, MockEmbedder, OpenAIEmbedder, SearchMode, SearchOptions,
    StoreInput,
};
pub use message::{session_key, Message, SessionHistory, SharedSessionHistory};
pub use migration::{FailedRecord, MigrationEngine, MigrationState, MigrationStatus};
pub use model::{GenerationParams, Level, ModelCapability};
pub use router::{ModelPool, RouteInput, Router, RoutingRule, RoutingWeights};
pub use summarizer::{Summarizer, SummarizerConfig};
pub use tools::{Tool, ToolRegistry};
