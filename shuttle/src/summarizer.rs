//! Summarizer (spec §4.7) — a background, process-wide `tokio::task` that rolls
//! long or idle sessions into a single memory entry.
//!
//! Grounded on the teacher's `ResolverRefresher` periodic-task shape
//! (`model_spec::refresher`): spawn + `tokio::time::interval` loop + cooperative
//! stop via an aborted/notified handle. Unlike the refresher, the summarizer
//! mutates shared state owned by the executor (the session-history map), so it
//! holds a [`SharedSessionHistory`] clone rather than its own private state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::gateway::GatewayRegistry;
use crate::memory::{MemoryStore, StoreInput, ENTRY_TYPE_SUMMARY};
use crate::message::{Message, SharedSessionHistory};
use crate::model::GenerationParams;

/// Default per-message-length fallback if the model produces an unbounded reply.
const DEFAULT_MAX_LENGTH: usize = 2000;

const SUMMARY_SYSTEM_PROMPT: &str =
    "Summarize the following conversation into a short, dense memory note. \
     Capture decisions, facts, and open threads; omit pleasantries. \
     Reply with the summary text only, no preamble.";

/// Tunables for one [`Summarizer`] (spec §4.7, §6 `memory.*`).
#[derive(Clone, Debug)]
pub struct SummarizerConfig {
    /// Roll up a session once it holds at least this many turns (`memory.summarizeThreshold`).
    pub min_messages: usize,
    /// Roll up a session once it has been idle at least this long (`memory.idleTimeout`, ms).
    pub idle_timeout_ms: i64,
    /// How often the background task scans for due sessions.
    pub poll_interval: Duration,
    /// Upper bound on the stored summary's length, in characters.
    pub max_length: usize,
    /// `<provider>/<id>` model key used for the rollup call.
    pub model: String,
}

impl SummarizerConfig {
    pub fn new(min_messages: usize, idle_timeout_ms: u64, model: impl Into<String>) -> Self {
        Self {
            min_messages,
            idle_timeout_ms: idle_timeout_ms as i64,
            poll_interval: Duration::from_secs(30),
            max_length: DEFAULT_MAX_LENGTH,
            model: model.into(),
        }
    }
}

/// Background session-history roll-up task.
///
/// Failures are logged and retried on the next scan; they never propagate to
/// the executor's foreground loop (spec §4.7 "Failure behavior").
pub struct Summarizer {
    history: SharedSessionHistory,
    store: Arc<MemoryStore>,
    gateway: Arc<GatewayRegistry>,
    config: SummarizerConfig,
    stop: Notify,
    stopped: AtomicBool,
}

impl Summarizer {
    pub fn new(
        history: SharedSessionHistory,
        store: Arc<MemoryStore>,
        gateway: Arc<GatewayRegistry>,
        config: SummarizerConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            history,
            store,
            gateway,
            config,
            stop: Notify::new(),
            stopped: AtomicBool::new(false),
        })
    }

    /// Spawns the periodic scan loop (teacher's `ResolverRefresher::spawn` shape:
    /// `tokio::time::interval` with `MissedTickBehavior::Skip` so a stalled task
    /// does not burst-catch-up on wake).
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.config.poll_interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if self.stopped.load(Ordering::Acquire) {
                            break;
                        }
                        self.scan_and_summarize().await;
                    }
                    _ = self.stop.notified() => break,
                }
            }
        })
    }

    /// Cooperative stop: the next tick (or an in-flight wait) observes this and
    /// exits instead of running another pass.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
        self.stop.notify_waiters();
    }

    /// One scan pass, exposed directly so tests can drive it deterministically
    /// instead of waiting on real wall-clock ticks.
    pub async fn scan_and_summarize(&self) {
        let due = {
            let history = self.history.lock().unwrap();
            history.due_for_summary(self.config.min_messages, self.config.idle_timeout_ms, now_ms())
        };
        for key in due {
            if let Err(err) = self.summarize_session(&key).await {
                tracing::warn!(session = %key, error = %err, "summarizer: rollup failed, will retry next scan");
            }
        }
    }

    async fn summarize_session(&self, session_key: &str) -> Result<(), crate::error::SummarizerError> {
        let turns = {
            let history = self.history.lock().unwrap();
            history.get(session_key)
        };
        if turns.is_empty() {
            return Ok(());
        }

        let transcript = render_transcript(&turns);
        let messages = vec![Message::system(SUMMARY_SYSTEM_PROMPT), Message::user(transcript)];
        let params = GenerationParams {
            max_tokens: Some(512),
            temperature: Some(0.2),
            ..Default::default()
        };
        let response = self
            .gateway
            .chat(&messages, &[], &self.config.model, params)
            .await?;
        let summary_text = truncate_chars(response.content.trim(), self.config.max_length);

        self.store
            .store(StoreInput {
                content: summary_text,
                metadata: serde_json::json!({ "session_key": session_key }),
                session_id: Some(session_key.to_string()),
                entry_type: ENTRY_TYPE_SUMMARY.to_string(),
                precomputed_vector: None,
            })
            .await?;

        tracing::info!(session = %session_key, "summarizer: rolled up session into a memory summary");
        self.history.lock().unwrap().replace(session_key, Vec::new());
        Ok(())
    }
}

fn render_transcript(turns: &[Message]) -> String {
    turns
        .iter()
        .map(|m| {
            let role = match m {
                Message::System(_) => "system",
                Message::User(_) => "user",
                Message::Assistant(_) => "assistant",
                Message::Tool(_) => "tool",
            };
            format!("{role}: {}", m.content())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn truncate_chars(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }
    text.chars().take(max_len).collect()
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{GatewayRegistry, MockProvider, ProviderEntry};
    use crate::memory::MockEmbedder;
    use crate::message::new_shared_history;

    fn gateway_with(reply: &str) -> Arc<GatewayRegistry> {
        let mut gateway = GatewayRegistry::new();
        gateway.register(ProviderEntry {
            name: "mock".into(),
            priority: 0,
            model_patterns: vec!["*".into()],
            client: Box::new(MockProvider::fixed("mock", reply)),
        });
        Arc::new(gateway)
    }

    async fn store_at(dir: &std::path::Path) -> Arc<MemoryStore> {
        Arc::new(
            MemoryStore::open(
                dir.to_path_buf(),
                Some(Arc::new(MockEmbedder::new(8))),
                Some("mock/embed".into()),
                3,
            )
            .await
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn session_past_min_messages_is_rolled_up_and_cleared() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_at(tmp.path()).await;
        let gateway = gateway_with("the user asked about invoices and got a walkthrough");
        let history = new_shared_history();
        {
            let mut h = history.lock().unwrap();
            h.push_turn("console:c1", Message::user("hi"), Message::assistant("hello"));
            h.push_turn("console:c1", Message::user("invoices?"), Message::assistant("sure"));
        }

        let config = SummarizerConfig::new(4, u64::MAX, "mock/summarize");
        let summarizer = Summarizer::new(history.clone(), store.clone(), gateway, config);
        summarizer.scan_and_summarize().await;

        assert!(history.lock().unwrap().get("console:c1").is_empty());
        let found = store
            .search(
                "invoices",
                crate::memory::SearchOptions {
                    mode: crate::memory::SearchMode::Fulltext,
                    entry_type: Some(ENTRY_TYPE_SUMMARY.to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(!found.is_empty());
    }

    #[tokio::test]
    async fn session_below_threshold_and_not_idle_is_left_untouched() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_at(tmp.path()).await;
        let gateway = gateway_with("unused");
        let history = new_shared_history();
        history
            .lock()
            .unwrap()
            .push_turn("console:c1", Message::user("hi"), Message::assistant("hello"));

        let config = SummarizerConfig::new(10, i64::MAX as u64, "mock/summarize");
        let summarizer = Summarizer::new(history.clone(), store, gateway, config);
        summarizer.scan_and_summarize().await;

        assert_eq!(history.lock().unwrap().get("console:c1").len(), 2);
    }

    #[tokio::test]
    async fn gateway_failure_is_logged_and_history_is_left_intact() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_at(tmp.path()).await;
        let mut gateway = GatewayRegistry::new();
        gateway.register(ProviderEntry {
            name: "mock".into(),
            priority: 0,
            model_patterns: vec!["*".into()],
            client: Box::new(MockProvider::failing("mock")),
        });
        let history = new_shared_history();
        history
            .lock()
            .unwrap()
            .push_turn("console:c1", Message::user("hi"), Message::assistant("hello"));

        let config = SummarizerConfig::new(1, u64::MAX, "mock/summarize");
        let summarizer = Summarizer::new(history.clone(), store, Arc::new(gateway), config);
        summarizer.scan_and_summarize().await;

        assert_eq!(history.lock().unwrap().get("console:c1").len(), 2);
    }

    #[tokio::test]
    async fn spawned_task_stops_cooperatively() {
        let tmp = tempfile::tempdir().unwrap();
        let store = store_at(tmp.path()).await;
        let gateway = gateway_with("rolled up");
        let history = new_shared_history();
        let mut config = SummarizerConfig::new(100, u64::MAX, "mock/summarize");
        config.poll_interval = Duration::from_millis(5);
        let summarizer = Summarizer::new(history, store, gateway, config);
        let handle = summarizer.clone().spawn();
        summarizer.stop();
        tokio::time::timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();
    }
}
