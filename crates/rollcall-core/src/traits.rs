//! Seams between the poll logic and the outside world.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ChatMember, PollHandle, PollState};

/// Messaging platform client.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Platform name, for logs.
    fn name(&self) -> &str;

    /// Publish a single-answer poll.
    async fn send_poll(
        &self,
        chat_id: i64,
        question: &str,
        options: &[String],
        anonymous: bool,
    ) -> Result<PollHandle>;

    /// Send a plain text message.
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<()>;

    /// Privileged members of the chat (administrators), used as the roster.
    async fn list_privileged_members(&self, chat_id: i64) -> Result<Vec<ChatMember>>;
}

/// Durable home of the single [`PollState`] document.
///
/// `load` never fails: missing or unreadable storage yields the default
/// state. `save` replaces the whole document and must not expose partial
/// writes to a later `load`.
pub trait PollStore: Send + Sync {
    fn load(&self) -> PollState;
    fn save(&self, state: &PollState) -> Result<()>;
}
