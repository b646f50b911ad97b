//! Poll publishing with the same-day duplicate guard.

use chrono::NaiveDate;
use rollcall_core::error::Result;
use rollcall_core::types::{PollHandle, PollState};

use crate::PollService;

/// What `send_poll` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// A new poll was published and the state reset.
    Sent(PollHandle),
    /// Scheduled send skipped: a poll already went out today.
    AlreadySent,
}

impl PollService {
    /// Publish the weekly poll. Scheduled sends (`manual == false`) are
    /// skipped when a poll was already sent today in the configured timezone.
    pub async fn send_poll(&self, manual: bool) -> Result<SendOutcome> {
        self.send_poll_on(manual, self.today()).await
    }

    /// [`send_poll`](Self::send_poll) with an explicit "today".
    pub async fn send_poll_on(&self, manual: bool, today: NaiveDate) -> Result<SendOutcome> {
        let _guard = self.write_lock.lock().await;

        if !manual && self.store.load().sent_on(today) {
            tracing::info!("⏭️ Poll already sent on {today}, skipping scheduled send");
            return Ok(SendOutcome::AlreadySent);
        }

        // Publish first: on failure nothing is written.
        let handle = self
            .transport
            .send_poll(
                self.chat_id,
                &self.messages.question,
                &self.messages.options(),
                self.poll.anonymous,
            )
            .await?;

        if let Err(e) = self
            .store
            .save(&PollState::for_new_poll(handle.poll_id.clone(), today))
        {
            // Without the saved date the fallback trigger will publish again.
            tracing::error!(
                "❌ Poll {} was published but its state was not saved; \
                 the next scheduled trigger today may send a duplicate: {e}",
                handle.poll_id
            );
            return Err(e);
        }
        tracing::info!(
            "📤 Poll {} sent to chat {} ({})",
            handle.poll_id,
            self.chat_id,
            if manual { "manual" } else { "scheduled" }
        );

        if let Err(e) = self
            .transport
            .send_message(self.chat_id, &self.messages.follow_up)
            .await
        {
            tracing::warn!("⚠️ Poll sent but follow-up message failed: {e}");
        }

        Ok(SendOutcome::Sent(handle))
    }
}
