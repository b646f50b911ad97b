//! # Rollcall Poll
//! The poll lifecycle — send → collect answers → remind → clear.
//!
//! [`PollService`] is the only owner of the read-modify-write cycle on the
//! persisted [`PollState`](rollcall_core::PollState). Every operation
//! reloads the document from the store; nothing is cached between calls.
//! Writers hold one async mutex for the whole load→mutate→save sequence so
//! concurrent webhook deliveries and scheduler triggers never interleave.

pub mod answers;
pub mod commands;
pub mod lifecycle;
pub mod reminder;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use rollcall_core::config::{MessagesConfig, PollConfig, RollcallConfig};
use rollcall_core::error::Result;
use rollcall_core::traits::{PollStore, Transport};
use rollcall_core::types::InboundEvent;
use std::sync::Arc;

pub use answers::RecordOutcome;
pub use commands::Command;
pub use lifecycle::SendOutcome;
pub use reminder::{Reminder, ReminderOutcome};

/// Poll operations bound to one group chat.
pub struct PollService {
    store: Arc<dyn PollStore>,
    transport: Arc<dyn Transport>,
    chat_id: i64,
    tz: Tz,
    messages: MessagesConfig,
    poll: PollConfig,
    write_lock: tokio::sync::Mutex<()>,
}

impl PollService {
    pub fn new(
        store: Arc<dyn PollStore>,
        transport: Arc<dyn Transport>,
        config: &RollcallConfig,
    ) -> Result<Self> {
        tracing::debug!(
            "Poll service for chat {} via {}",
            config.telegram.chat_id,
            transport.name()
        );
        Ok(Self {
            store,
            transport,
            chat_id: config.telegram.chat_id,
            tz: config.schedule.timezone()?,
            messages: config.messages.clone(),
            poll: config.poll.clone(),
            write_lock: tokio::sync::Mutex::new(()),
        })
    }

    /// Target group chat.
    pub fn chat_id(&self) -> i64 {
        self.chat_id
    }

    /// Today's date in the configured timezone.
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.tz).date_naive()
    }

    pub fn messages(&self) -> &MessagesConfig {
        &self.messages
    }

    /// React to one inbound event. Votes are recorded silently; known
    /// commands are answered in the chat they came from. Returns the reply
    /// that was sent, if any.
    pub async fn handle_event(&self, event: InboundEvent) -> Option<String> {
        match event {
            InboundEvent::Vote(vote) => {
                if let Err(e) = self.record_answer(vote).await {
                    tracing::error!("❌ Failed to record vote: {e}");
                }
                None
            }
            InboundEvent::Command {
                chat_id,
                name,
                sender,
            } => {
                let Some(command) = Command::parse(&name) else {
                    tracing::debug!("Ignoring unknown command /{name} from {sender}");
                    return None;
                };
                tracing::info!("💬 /{name} from {sender} in chat {chat_id}");
                let reply = self.handle_command(command, chat_id).await;
                if let Err(e) = self.transport.send_message(chat_id, &reply).await {
                    tracing::error!("❌ Reply to /{name} failed: {e}");
                }
                Some(reply)
            }
        }
    }
}
