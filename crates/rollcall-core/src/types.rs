//! Data model — the persisted poll document and the shapes exchanged with the
//! messaging platform.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Option index of the "yes" answer. Fixed contract with poll creation.
pub const AFFIRMATIVE_OPTION: u32 = 0;
/// Option index of the "no" answer.
pub const NEGATIVE_OPTION: u32 = 1;

/// The single persisted document.
///
/// Field aliases accept files written by the earlier bot
/// (`poll_id`, `poll_sent_at`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PollState {
    /// Identifier of the most recently sent poll.
    #[serde(alias = "poll_id")]
    pub poll_id: Option<String>,
    /// Answers keyed by user id.
    pub answers: BTreeMap<String, AnswerRecord>,
    /// Calendar day (configured timezone) of the last send.
    #[serde(alias = "poll_sent_at")]
    pub last_sent_date: Option<NaiveDate>,
}

/// One user's answer to the current poll.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRecord {
    #[serde(alias = "name", default)]
    pub display_name: String,
    #[serde(alias = "option_ids", default)]
    pub selected_option_indexes: BTreeSet<u32>,
}

impl AnswerRecord {
    pub fn new(display_name: impl Into<String>, selected: impl IntoIterator<Item = u32>) -> Self {
        Self {
            display_name: display_name.into(),
            selected_option_indexes: selected.into_iter().collect(),
        }
    }

    /// True when the affirmative option is among the selections.
    pub fn is_affirmative(&self) -> bool {
        self.selected_option_indexes.contains(&AFFIRMATIVE_OPTION)
    }
}

impl PollState {
    /// Fresh state for a poll that was just published.
    pub fn for_new_poll(poll_id: impl Into<String>, sent_on: NaiveDate) -> Self {
        Self {
            poll_id: Some(poll_id.into()),
            answers: BTreeMap::new(),
            last_sent_date: Some(sent_on),
        }
    }

    /// Number of respondents.
    pub fn total(&self) -> usize {
        self.answers.len()
    }

    /// Number of respondents whose selection contains the affirmative option.
    pub fn affirmative_count(&self) -> usize {
        self.answers.values().filter(|a| a.is_affirmative()).count()
    }

    /// Whether a scheduled send already happened on `today`.
    pub fn sent_on(&self, today: NaiveDate) -> bool {
        self.last_sent_date == Some(today)
    }
}

/// Inbound vote event, converted from the platform's poll answer update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteEvent {
    pub poll_id: String,
    pub user_id: String,
    pub display_name: String,
    /// Empty when the user retracted their vote.
    pub selected_option_indexes: BTreeSet<u32>,
}

/// Something the bot must react to, independent of how it was delivered
/// (webhook or long polling).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// A `/command` sent in a chat. `name` is lowercase without the slash
    /// or `@botname` suffix.
    Command {
        chat_id: i64,
        name: String,
        sender: String,
    },
    Vote(VoteEvent),
}

/// Result of publishing a poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollHandle {
    pub poll_id: String,
    pub message_id: i64,
}

/// Entry of the privileged-member listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMember {
    pub id: String,
    pub first_name: String,
    /// Full name (first + last).
    pub display_name: String,
    /// Username without the leading `@`.
    pub handle: Option<String>,
    pub is_automated: bool,
}

impl ChatMember {
    /// `@handle` if the member has one.
    pub fn mention(&self) -> Option<String> {
        self.handle
            .as_deref()
            .filter(|h| !h.is_empty())
            .map(|h| format!("@{h}"))
    }
}
