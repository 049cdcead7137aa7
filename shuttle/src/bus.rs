//! Message Bus (spec §4.1) — bounded inbound/outbound FIFO queues between channel
//! adapters and the executor. FIFO is only guaranteed within one `(channel, chatId)`;
//! `tokio::sync::mpsc` already gives FIFO per single queue, which is all one process
//! needs here since there is no cross-session ordering requirement.

use tokio::sync::mpsc;

/// A message as it enters the bus from a channel adapter (spec §6 inbound shape).
#[derive(Clone, Debug)]
pub struct InboundMessage {
    pub channel: String,
    pub sender_id: String,
    pub chat_id: String,
    pub content: String,
    pub media: Vec<String>,
    pub timestamp_ms: i64,
    pub current_dir: Option<String>,
    pub metadata: serde_json::Value,
}

impl InboundMessage {
    pub fn session_key(&self) -> String {
        crate::message::session_key(&self.channel, &self.chat_id)
    }
}

/// A message as it leaves the bus toward a channel adapter (spec §6 outbound shape).
#[derive(Clone, Debug)]
pub struct OutboundMessage {
    pub channel: String,
    pub chat_id: String,
    pub content: String,
    pub media: Vec<String>,
    pub metadata: serde_json::Value,
}

/// Advisory high-water mark; default is effectively unbounded (spec §4.1).
pub const DEFAULT_CAPACITY: usize = 10_000;

/// Two bounded FIFO queues shared by producer channels and the executor.
///
/// Cloning a `MessageBus` clones the sender handles only; all clones share the same
/// underlying queues. Producers must tolerate dropped enqueues under backpressure —
/// `publish_inbound`/`publish_outbound` return `Err` rather than blocking forever
/// when the queue is full, so a channel adapter can log-and-drop instead of wedging.
#[derive(Clone)]
pub struct MessageBus {
    inbound_tx: mpsc::Sender<InboundMessage>,
    outbound_tx: mpsc::Sender<OutboundMessage>,
}

/// Consumer half, not `Clone`: only one executor should drain inbound, and only
/// one dispatcher should drain outbound, consistent with "one worker per role".
pub struct BusConsumer<T> {
    rx: mpsc::Receiver<T>,
}

impl<T> BusConsumer<T> {
    pub async fn consume(&mut self) -> Option<T> {
        self.rx.recv().await
    }
}

impl MessageBus {
    /// Builds a bus with the given capacity, returning the shared handle plus the
    /// two consumer halves (inbound for the executor, outbound for channel dispatch).
    pub fn new(capacity: usize) -> (Self, BusConsumer<InboundMessage>, BusConsumer<OutboundMessage>) {
        let (inbound_tx, inbound_rx) = mpsc::channel(capacity.max(1));
        let (outbound_tx, outbound_rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                inbound_tx,
                outbound_tx,
            },
            BusConsumer { rx: inbound_rx },
            BusConsumer { rx: outbound_rx },
        )
    }

    pub fn with_default_capacity() -> (Self, BusConsumer<InboundMessage>, BusConsumer<OutboundMessage>) {
        Self::new(DEFAULT_CAPACITY)
    }

    /// Enqueues an inbound message. Returns `Err` (instead of blocking) when the
    /// queue is at capacity so callers can apply their own backpressure policy.
    pub async fn publish_inbound(&self, msg: InboundMessage) -> Result<(), mpsc::error::TrySendError<InboundMessage>> {
        self.inbound_tx.try_send(msg)
    }

    pub async fn publish_outbound(&self, msg: OutboundMessage) -> Result<(), mpsc::error::TrySendError<OutboundMessage>> {
        self.outbound_tx.try_send(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fifo_within_a_session() {
        let (bus, mut inbound, _outbound) = MessageBus::new(8);
        for i in 0..3 {
            bus.publish_inbound(InboundMessage {
                channel: "feishu".into(),
                sender_id: "u1".into(),
                chat_id: "c1".into(),
                content: format!("msg{i}"),
                media: vec![],
                timestamp_ms: i,
                current_dir: None,
                metadata: serde_json::json!({}),
            })
            .await
            .unwrap();
        }
        for i in 0..3 {
            let msg = inbound.consume().await.unwrap();
            assert_eq!(msg.content, format!("msg{i}"));
        }
    }

    #[tokio::test]
    async fn full_queue_returns_err_instead_of_blocking() {
        let (bus, _inbound, _outbound) = MessageBus::new(1);
        let make = |n: i64| InboundMessage {
            channel: "c".into(),
            sender_id: "u".into(),
            chat_id: "c1".into(),
            content: "x".into(),
            media: vec![],
            timestamp_ms: n,
            current_dir: None,
            metadata: serde_json::json!({}),
        };
        bus.publish_inbound(make(1)).await.unwrap();
        assert!(bus.publish_inbound(make(2)).await.is_err());
    }
}
