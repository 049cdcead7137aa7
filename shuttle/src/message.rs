//! `Message` — the closed sum type that flows through gateway calls and session
//! history, and `SessionHistory` — the process-wide, bounded, LRU-evicted map of
//! per-session turn sequences (spec §3 session-history invariants).

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

/// One turn in a conversation passed to the LLM gateway.
///
/// System turns are never persisted in [`SessionHistory`] — they are reassembled
/// fresh every turn by the executor (spec §3 "system turns are never stored").
#[derive(Clone, Debug, PartialEq)]
pub enum Message {
    System(String),
    User(UserTurn),
    Assistant(AssistantTurn),
    Tool(ToolTurn),
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Message::System(content.into())
    }

    pub fn user(content: impl Into<String>) -> Self {
        Message::User(UserTurn {
            content: content.into(),
            media: Vec::new(),
        })
    }

    pub fn user_with_media(content: impl Into<String>, media: Vec<String>) -> Self {
        Message::User(UserTurn {
            content: content.into(),
            media,
        })
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Message::Assistant(AssistantTurn {
            content: content.into(),
            tool_call_id: None,
        })
    }

    pub fn tool_observation(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Message::Tool(ToolTurn {
            tool_call_id: tool_call_id.into(),
            content: content.into(),
        })
    }

    /// Text content regardless of variant, used for complexity scoring and logging.
    pub fn content(&self) -> &str {
        match self {
            Message::System(s) => s,
            Message::User(t) => &t.content,
            Message::Assistant(t) => &t.content,
            Message::Tool(t) => &t.content,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct UserTurn {
    pub content: String,
    /// Resolved media references (URIs or data URIs); folded into the request only
    /// when the selected model is vision-capable (spec §4.2 Assembly).
    pub media: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AssistantTurn {
    pub content: String,
    pub tool_call_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ToolTurn {
    pub tool_call_id: String,
    pub content: String,
}

/// Maximum turns retained per session (spec §3).
pub const MAX_TURNS_PER_SESSION: usize = 50;
/// Maximum sessions retained process-wide, LRU-evicted on insert (spec §3).
pub const MAX_SESSIONS: usize = 1000;

/// `channel:chatId` session key.
pub fn session_key(channel: &str, chat_id: &str) -> String {
    format!("{channel}:{chat_id}")
}

/// Owned, bounded store of per-session turn sequences.
///
/// Narrow mutation API per the teacher's "shared mutable state... owned structure,
/// never expose raw handles" design note (spec §9): callers push completed
/// `(user, assistant)` pairs, never a raw `Vec<Message>` handle.
#[derive(Default)]
pub struct SessionHistory {
    sessions: HashMap<String, VecDeque<Message>>,
    /// Insertion/touch order, oldest first, for LRU eviction.
    order: VecDeque<String>,
    /// Epoch-ms timestamp of the last `push_turn`/`replace` per session, used by
    /// the summarizer's idle-timeout trigger (spec §4.7).
    last_touched: HashMap<String, i64>,
}

/// Shared handle used by the [`crate::summarizer::Summarizer`] background task,
/// which mutates the same map the executor owns (spec §4.7 "trim the live
/// history accordingly"). A `std::sync::Mutex` is sufficient: every critical
/// section is a short, non-blocking map operation (spec §9 "use a mutex only
/// around the session-map LRU").
pub type SharedSessionHistory = Arc<Mutex<SessionHistory>>;

/// Constructs a fresh, empty shared history handle.
pub fn new_shared_history() -> SharedSessionHistory {
    Arc::new(Mutex::new(SessionHistory::new()))
}

impl SessionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read-only snapshot of a session's turns, oldest first.
    pub fn get(&self, key: &str) -> Vec<Message> {
        self.sessions
            .get(key)
            .map(|d| d.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Number of turns (user+assistant pairs count as two) currently held for
    /// a session.
    pub fn turn_count(&self, key: &str) -> usize {
        self.sessions.get(key).map(VecDeque::len).unwrap_or(0)
    }

    /// Epoch-ms of the last activity on a session, if it exists.
    pub fn last_touched_ms(&self, key: &str) -> Option<i64> {
        self.last_touched.get(key).copied()
    }

    /// Session keys that have accumulated at least `min_messages` turns, or
    /// have gone idle for at least `idle_timeout_ms`, and so are due for the
    /// summarizer to roll up (spec §4.7 "scans `SessionHistory` for sessions
    /// past `minMessages`/`idleTimeout`").
    pub fn due_for_summary(&self, min_messages: usize, idle_timeout_ms: i64, now_ms: i64) -> Vec<String> {
        self.sessions
            .iter()
            .filter(|(_, turns)| !turns.is_empty())
            .filter(|(key, turns)| {
                turns.len() >= min_messages
                    || self
                        .last_touched
                        .get(key.as_str())
                        .is_some_and(|touched| now_ms.saturating_sub(*touched) >= idle_timeout_ms)
            })
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Appends a `(user, assistant)` pair to a session, trims to
    /// [`MAX_TURNS_PER_SESSION`], touches the LRU order, and evicts the oldest
    /// session if the process-wide count now exceeds [`MAX_SESSIONS`].
    pub fn push_turn(&mut self, key: &str, user: Message, assistant: Message) {
        let is_new = !self.sessions.contains_key(key);
        let entry = self.sessions.entry(key.to_string()).or_default();
        entry.push_back(user);
        entry.push_back(assistant);
        while entry.len() > MAX_TURNS_PER_SESSION {
            entry.pop_front();
        }

        self.touch(key);
        if is_new && self.sessions.len() > MAX_SESSIONS {
            self.evict_oldest();
        }
    }

    /// Replaces a session's turns wholesale (used by the summarizer after it
    /// rolls a session's history into a memory summary).
    pub fn replace(&mut self, key: &str, turns: Vec<Message>) {
        let mut deque: VecDeque<Message> = turns.into();
        while deque.len() > MAX_TURNS_PER_SESSION {
            deque.pop_front();
        }
        self.sessions.insert(key.to_string(), deque);
        self.touch(key);
    }

    fn touch(&mut self, key: &str) {
        self.order.retain(|k| k != key);
        self.order.push_back(key.to_string());
        self.last_touched.insert(key.to_string(), now_ms());
    }

    fn evict_oldest(&mut self) {
        if let Some(oldest) = self.order.pop_front() {
            self.sessions.remove(&oldest);
            self.last_touched.remove(&oldest);
        }
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_to_fifty_turns() {
        let mut hist = SessionHistory::new();
        for i in 0..40 {
            hist.push_turn("c:1", Message::user(format!("u{i}")), Message::assistant("a"));
        }
        assert_eq!(hist.get("c:1").len(), MAX_TURNS_PER_SESSION);
    }

    #[test]
    fn evicts_oldest_session_past_capacity() {
        let mut hist = SessionHistory::new();
        for i in 0..(MAX_SESSIONS + 5) {
            hist.push_turn(
                &format!("c:{i}"),
                Message::user("hi"),
                Message::assistant("ok"),
            );
        }
        assert_eq!(hist.session_count(), MAX_SESSIONS);
        assert!(hist.get("c:0").is_empty());
        assert!(!hist.get(&format!("c:{}", MAX_SESSIONS + 4)).is_empty());
    }

    #[test]
    fn touching_a_session_protects_it_from_eviction() {
        let mut hist = SessionHistory::new();
        for i in 0..MAX_SESSIONS {
            hist.push_turn(&format!("c:{i}"), Message::user("hi"), Message::assistant("ok"));
        }
        // touch c:0 again so it is no longer the oldest
        hist.push_turn("c:0", Message::user("hi2"), Message::assistant("ok2"));
        hist.push_turn("c:new", Message::user("hi"), Message::assistant("ok"));
        assert!(!hist.get("c:0").is_empty());
        assert!(hist.get("c:1").is_empty());
    }

    #[test]
    fn due_for_summary_by_turn_count_not_idle() {
        let mut hist = SessionHistory::new();
        for i in 0..3 {
            hist.push_turn("c:1", Message::user(format!("u{i}")), Message::assistant("a"));
        }
        assert_eq!(hist.turn_count("c:1"), 6);
        let due = hist.due_for_summary(6, i64::MAX, 0);
        assert_eq!(due, vec!["c:1".to_string()]);
        assert!(hist.due_for_summary(7, i64::MAX, 0).is_empty());
    }

    #[test]
    fn due_for_summary_by_idle_timeout() {
        let mut hist = SessionHistory::new();
        hist.push_turn("c:1", Message::user("hi"), Message::assistant("ok"));
        let touched = hist.last_touched_ms("c:1").unwrap();
        assert!(hist.due_for_summary(1000, 60_000, touched + 1000).is_empty());
        assert_eq!(
            hist.due_for_summary(1000, 60_000, touched + 61_000),
            vec!["c:1".to_string()]
        );
    }
}
