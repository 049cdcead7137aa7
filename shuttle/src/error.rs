//! Per-subsystem error enums.
//!
//! The runtime follows the teacher's convention of one narrow `thiserror` enum per
//! subsystem rather than a single crate-wide error: it keeps the propagation rule of
//! §7 visible at each call site (inside the ReAct loop, failures become observations;
//! outside it, they become a single apology).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("no provider registered for model `{0}`")]
    NoProvider(String),
    #[error("provider `{provider}` rejected the request: {message}")]
    Transport { provider: String, message: String },
    #[error("all providers exhausted for model `{0}`")]
    Exhausted(String),
    #[error("malformed model key `{0}` (expected `<provider>/<id>`)")]
    MalformedModelKey(String),
}

#[derive(Error, Debug)]
pub enum RouterError {
    #[error("model pool is empty")]
    EmptyPool,
    #[error("gateway error during intent pre-pass: {0}")]
    Gateway(#[from] GatewayError),
}

#[derive(Error, Debug)]
pub enum ToolSourceError {
    #[error("unknown tool `{0}`")]
    UnknownTool(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("transport error: {0}")]
    Transport(String),
}

#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Router(#[from] RouterError),
    #[error("tool execution failed: {0}")]
    Tool(#[from] ToolSourceError),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("storage error: {0}")]
    Storage(String),
    #[error("embedding error: {0}")]
    Embedding(String),
    #[error("vector dimension mismatch: column expects {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("unknown embedding column `{0}`")]
    UnknownColumn(String),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum SummarizerError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Error, Debug)]
pub enum MigrationError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("state serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("a migration is already running")]
    AlreadyRunning,
}
