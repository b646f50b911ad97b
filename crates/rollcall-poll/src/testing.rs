//! Recording fake transport for tests.

use async_trait::async_trait;
use rollcall_core::config::{RollcallConfig, TransportMode};
use rollcall_core::error::{Result, RollcallError};
use rollcall_core::traits::Transport;
use rollcall_core::types::{ChatMember, PollHandle};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Chat id used by [`test_config`].
pub const TEST_CHAT_ID: i64 = -1001;

/// Config with a token, chat id and polling mode so it validates.
pub fn test_config() -> RollcallConfig {
    let mut config = RollcallConfig::default();
    config.telegram.bot_token = "1:test".into();
    config.telegram.chat_id = TEST_CHAT_ID;
    config.telegram.mode = TransportMode::Polling;
    config
}

/// Roster entry shorthand.
pub fn member(id: &str, first_name: &str, handle: Option<&str>, is_automated: bool) -> ChatMember {
    ChatMember {
        id: id.to_string(),
        first_name: first_name.to_string(),
        display_name: first_name.to_string(),
        handle: handle.map(str::to_string),
        is_automated,
    }
}

/// One outbound platform call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Poll {
        chat_id: i64,
        question: String,
        options: Vec<String>,
        anonymous: bool,
    },
    Message {
        chat_id: i64,
        text: String,
    },
}

/// Transport that records calls and can be told to fail.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<Sent>>,
    members: Mutex<Vec<ChatMember>>,
    fail_poll: AtomicBool,
    fail_members: AtomicBool,
    /// Fail every message whose text starts with this prefix ("" = all).
    fail_messages_with: Mutex<Option<String>>,
    polls_published: AtomicU64,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_members(members: Vec<ChatMember>) -> Self {
        let t = Self::default();
        *t.members.lock().unwrap() = members;
        t
    }

    pub fn fail_poll(&self, fail: bool) {
        self.fail_poll.store(fail, Ordering::SeqCst);
    }

    pub fn fail_members(&self, fail: bool) {
        self.fail_members.store(fail, Ordering::SeqCst);
    }

    pub fn fail_messages_starting_with(&self, prefix: Option<&str>) {
        *self.fail_messages_with.lock().unwrap() = prefix.map(str::to_string);
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    /// Text messages as `(chat_id, text)`.
    pub fn messages(&self) -> Vec<(i64, String)> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Message { chat_id, text } => Some((chat_id, text)),
                Sent::Poll { .. } => None,
            })
            .collect()
    }

    /// Number of polls published so far.
    pub fn poll_count(&self) -> usize {
        self.sent()
            .iter()
            .filter(|s| matches!(s, Sent::Poll { .. }))
            .count()
    }

    pub fn clear_sent(&self) {
        self.sent.lock().unwrap().clear();
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    fn name(&self) -> &str {
        "recording"
    }

    async fn send_poll(
        &self,
        chat_id: i64,
        question: &str,
        options: &[String],
        anonymous: bool,
    ) -> Result<PollHandle> {
        if self.fail_poll.load(Ordering::SeqCst) {
            return Err(RollcallError::Transport("Bad Request: not enough rights to send polls".into()));
        }
        self.sent.lock().unwrap().push(Sent::Poll {
            chat_id,
            question: question.to_string(),
            options: options.to_vec(),
            anonymous,
        });
        let n = self.polls_published.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(PollHandle {
            poll_id: format!("poll-{n}"),
            message_id: n as i64,
        })
    }

    async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
        if let Some(prefix) = self.fail_messages_with.lock().unwrap().as_deref()
            && text.starts_with(prefix)
        {
            return Err(RollcallError::Transport("Forbidden: bot was kicked".into()));
        }
        self.sent.lock().unwrap().push(Sent::Message {
            chat_id,
            text: text.to_string(),
        });
        Ok(())
    }

    async fn list_privileged_members(&self, _chat_id: i64) -> Result<Vec<ChatMember>> {
        if self.fail_members.load(Ordering::SeqCst) {
            return Err(RollcallError::Transport("Bad Request: chat not found".into()));
        }
        Ok(self.members.lock().unwrap().clone())
    }
}
