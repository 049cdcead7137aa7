//! Channel adapters (spec §2 "out-of-scope collaborators", §6 added) — the
//! boundary between an external surface (console, chat platform, etc.) and the
//! [`crate::bus::MessageBus`].
//!
//! The spec treats channels as interfaces only: "channel adapters are external
//! collaborators". This mirrors the teacher's `ToolSource`/`Tool` shape — a small
//! capability trait, composed via registries rather than inheritance — applied
//! here to the inbound/outbound boundary instead of tool dispatch. `ConsoleChannel`
//! is the one reference implementation, used the way the teacher ships a minimal
//! concrete adapter alongside an otherwise-external-collaborator trait.

use std::io::Write as _;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;

use crate::bus::{InboundMessage, MessageBus, OutboundMessage};

/// Name used by [`ConsoleChannel`] in [`InboundMessage::channel`]/[`OutboundMessage::channel`].
pub const CONSOLE_CHANNEL: &str = "console";

/// A surface that turns external input into [`InboundMessage`]s and renders
/// [`OutboundMessage`]s back to its medium.
///
/// `start`/`stop` bound the adapter's background work (e.g. a read loop);
/// `send` delivers one already-routed outbound message; `is_running` lets a
/// supervisor poll liveness without holding a lock on adapter internals.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Stable identifier, used as [`InboundMessage::channel`]/[`OutboundMessage::channel`].
    fn name(&self) -> &str;

    /// Begins producing inbound messages onto `bus`. Returns once the adapter's
    /// background work is running; it keeps running until `stop` is called.
    async fn start(&self, bus: MessageBus);

    /// Stops the adapter's background work. Idempotent.
    async fn stop(&self);

    /// Delivers one outbound message to this channel's medium.
    async fn send(&self, message: OutboundMessage) -> std::io::Result<()>;

    /// Whether the adapter's background work is currently running.
    fn is_running(&self) -> bool;
}

/// Reference [`Channel`] implementation: reads lines from stdin as inbound
/// messages for a single fixed chat id, and writes outbound replies to stdout.
/// Used in examples and tests in place of a real chat-platform adapter.
pub struct ConsoleChannel {
    sender_id: String,
    chat_id: String,
    running: Arc<AtomicBool>,
    reader_task: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl ConsoleChannel {
    pub fn new(sender_id: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            sender_id: sender_id.into(),
            chat_id: chat_id.into(),
            running: Arc::new(AtomicBool::new(false)),
            reader_task: std::sync::Mutex::new(None),
        }
    }
}

#[async_trait]
impl Channel for ConsoleChannel {
    fn name(&self) -> &str {
        CONSOLE_CHANNEL
    }

    async fn start(&self, bus: MessageBus) {
        if self.running.swap(true, Ordering::AcqRel) {
            return;
        }
        let sender_id = self.sender_id.clone();
        let chat_id = self.chat_id.clone();
        let running = self.running.clone();
        let handle = tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            while running.load(Ordering::Acquire) {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let msg = InboundMessage {
                            channel: CONSOLE_CHANNEL.to_string(),
                            sender_id: sender_id.clone(),
                            chat_id: chat_id.clone(),
                            content: line,
                            media: Vec::new(),
                            timestamp_ms: chrono::Utc::now().timestamp_millis(),
                            current_dir: std::env::current_dir()
                                .ok()
                                .and_then(|p| p.to_str().map(str::to_string)),
                            metadata: serde_json::json!({}),
                        };
                        if bus.publish_inbound(msg).await.is_err() {
                            tracing::warn!("console channel: inbound bus full, dropping line");
                        }
                    }
                    Ok(None) => break,
                    Err(err) => {
                        tracing::error!(error = %err, "console channel: stdin read failed");
                        break;
                    }
                }
            }
            running.store(false, Ordering::Release);
        });
        *self.reader_task.lock().unwrap() = Some(handle);
    }

    async fn stop(&self) {
        self.running.store(false, Ordering::Release);
        let handle = self.reader_task.lock().unwrap().take();
        if let Some(handle) = handle {
            handle.abort();
        }
    }

    async fn send(&self, message: OutboundMessage) -> std::io::Result<()> {
        let mut stdout = std::io::stdout();
        writeln!(stdout, "{}", message.content)?;
        stdout.flush()
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RecordingChannel {
        name: String,
        running: AtomicBool,
        sent: std::sync::Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Channel for RecordingChannel {
        fn name(&self) -> &str {
            &self.name
        }

        async fn start(&self, _bus: MessageBus) {
            self.running.store(true, Ordering::Release);
        }

        async fn stop(&self) {
            self.running.store(false, Ordering::Release);
        }

        async fn send(&self, message: OutboundMessage) -> std::io::Result<()> {
            self.sent.lock().unwrap().push(message.content);
            Ok(())
        }

        fn is_running(&self) -> bool {
            self.running.load(Ordering::Acquire)
        }
    }

    #[tokio::test]
    async fn start_and_stop_flip_is_running() {
        let channel = RecordingChannel {
            name: "test".into(),
            running: AtomicBool::new(false),
            sent: std::sync::Mutex::new(Vec::new()),
        };
        let (bus, _inbound, _outbound) = MessageBus::with_default_capacity();
        assert!(!channel.is_running());
        channel.start(bus).await;
        assert!(channel.is_running());
        channel.stop().await;
        assert!(!channel.is_running());
    }

    #[tokio::test]
    async fn send_records_outbound_content() {
        let channel = RecordingChannel {
            name: "test".into(),
            running: AtomicBool::new(false),
            sent: std::sync::Mutex::new(Vec::new()),
        };
        channel
            .send(OutboundMessage {
                channel: "test".into(),
                chat_id: "c1".into(),
                content: "hello".into(),
                media: vec![],
                metadata: serde_json::json!({}),
            })
            .await
            .unwrap();
        assert_eq!(channel.sent.lock().unwrap().as_slice(), ["hello".to_string()]);
    }

    #[tokio::test]
    async fn console_channel_starts_stops_and_is_idempotent() {
        let channel = ConsoleChannel::new("tester", "c1");
        let (bus, _inbound, _outbound) = MessageBus::with_default_capacity();
        assert!(!channel.is_running());
        channel.start(bus.clone()).await;
        assert!(channel.is_running());
        // starting again while already running is a no-op, not a second reader task
        channel.start(bus).await;
        channel.stop().await;
        assert!(!channel.is_running());
    }
}
