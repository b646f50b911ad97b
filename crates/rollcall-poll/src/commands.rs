//! Chat commands. Every known command produces a reply, including on failure.

use rollcall_core::types::PollState;

use crate::PollService;
use crate::lifecycle::SendOutcome;

/// Commands the bot answers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Status,
    Answers,
    Clear,
    SendPoll,
    Id,
    Debug,
}

impl Command {
    /// Parse a bare command name (no slash, no `@botname`).
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "start" => Some(Self::Start),
            "help" => Some(Self::Help),
            "status" => Some(Self::Status),
            "answers" => Some(Self::Answers),
            "clear" => Some(Self::Clear),
            "sendpoll" => Some(Self::SendPoll),
            "id" => Some(Self::Id),
            "debug" => Some(Self::Debug),
            _ => None,
        }
    }
}

impl PollService {
    /// Run a command issued in `chat_id` and return the reply text.
    pub async fn handle_command(&self, command: Command, chat_id: i64) -> String {
        match command {
            Command::Start | Command::Help => self.messages.start.clone(),
            Command::Status => self.status_text(),
            Command::Answers => self.answers_text(),
            Command::Clear => self.clear().await,
            Command::SendPoll => match self.send_poll(true).await {
                Ok(SendOutcome::Sent(_) | SendOutcome::AlreadySent) => {
                    self.messages.poll_sent.clone()
                }
                Err(e) => {
                    tracing::error!("❌ Manual poll send failed: {e}");
                    format!("{}: {}", self.messages.poll_failed, e.reason())
                }
            },
            Command::Id => format!("Chat ID: {chat_id}"),
            Command::Debug => {
                let matches = chat_id == self.chat_id;
                format!(
                    "Chat ID: {chat_id}\nConfigured chat: {}\nMatch: {}",
                    self.chat_id,
                    if matches { "✅" } else { "❌" }
                )
            }
        }
    }

    /// Respondent and affirmative counts.
    pub fn status_text(&self) -> String {
        let state = self.store.load();
        format!(
            "📊 Answered: {}\n✅ Said \"{}\": {}",
            state.total(),
            self.messages.affirmative,
            state.affirmative_count()
        )
    }

    /// One line per respondent, or the "nobody answered" text.
    pub fn answers_text(&self) -> String {
        let state = self.store.load();
        if state.answers.is_empty() {
            return self.messages.no_answers.clone();
        }
        let mut text = String::from("📋 Answers:");
        for record in state.answers.values() {
            let label = if record.is_affirmative() {
                &self.messages.affirmative
            } else {
                &self.messages.negative
            };
            text.push_str(&format!("\n• {} — {label}", record.display_name));
        }
        text
    }

    async fn clear(&self) -> String {
        let _guard = self.write_lock.lock().await;
        match self.store.save(&PollState::default()) {
            Ok(()) => {
                tracing::info!("🧹 Poll state cleared");
                self.messages.cleared.clone()
            }
            Err(e) => {
                tracing::error!("❌ Clear failed: {e}");
                format!("❌ {e}")
            }
        }
    }
}
