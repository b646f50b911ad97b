//! Roster reconciliation and the morning reminder.
//!
//! The privileged-member listing stands in for "everyone in the group".
//! Members who answered "no" are left out of the message entirely.

use rollcall_core::config::MessagesConfig;
use rollcall_core::error::Result;
use rollcall_core::types::{ChatMember, PollState};

use crate::PollService;

/// Who to name in the reminder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reminder {
    /// Labels of members whose answer includes the affirmative option.
    pub affirmative: Vec<String>,
    /// Labels of members with no recorded answer.
    pub missing: Vec<String>,
}

/// How a reminder run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReminderOutcome {
    Sent { affirmative: usize, missing: usize },
    /// Fetch or send failed; an error notice was attempted instead.
    Failed(String),
}

/// Split the roster against the recorded answers. Automated accounts are
/// skipped; member order is preserved.
pub fn classify(state: &PollState, members: &[ChatMember]) -> Reminder {
    let mut reminder = Reminder::default();
    for member in members.iter().filter(|m| !m.is_automated) {
        match state.answers.get(&member.id) {
            None => reminder
                .missing
                .push(member.mention().unwrap_or_else(|| member.first_name.clone())),
            Some(answer) if answer.is_affirmative() => reminder
                .affirmative
                .push(member.mention().unwrap_or_else(|| answer.display_name.clone())),
            Some(_) => {}
        }
    }
    reminder
}

/// Render the reminder text: greeting, then one line per non-empty group.
pub fn compose_reminder(reminder: &Reminder, messages: &MessagesConfig) -> String {
    let mut lines = vec![messages.reminder_greeting.clone()];
    if !reminder.affirmative.is_empty() {
        lines.push(format!(
            "{}: {}",
            messages.reminder_yes,
            reminder.affirmative.join(", ")
        ));
    }
    if !reminder.missing.is_empty() {
        lines.push(format!(
            "{}: {}",
            messages.reminder_missing,
            reminder.missing.join(", ")
        ));
    }
    lines.join("\n")
}

impl PollService {
    /// Build and send the reminder. Failures are reported to the chat on a
    /// best-effort basis and never propagate.
    pub async fn generate_reminder(&self) -> ReminderOutcome {
        match self.try_remind().await {
            Ok(reminder) => {
                tracing::info!(
                    "🔔 Reminder sent: {} coming, {} missing",
                    reminder.affirmative.len(),
                    reminder.missing.len()
                );
                ReminderOutcome::Sent {
                    affirmative: reminder.affirmative.len(),
                    missing: reminder.missing.len(),
                }
            }
            Err(e) => {
                let reason = e.reason();
                tracing::error!("❌ Reminder failed: {e}");
                let notice = format!("{}: {reason}", self.messages.reminder_error);
                if let Err(e) = self.transport.send_message(self.chat_id, &notice).await {
                    tracing::warn!("⚠️ Could not report reminder failure: {e}");
                }
                ReminderOutcome::Failed(reason)
            }
        }
    }

    async fn try_remind(&self) -> Result<Reminder> {
        let state = self.store.load();
        let members = self.transport.list_privileged_members(self.chat_id).await?;
        let reminder = classify(&state, &members);
        let text = compose_reminder(&reminder, &self.messages);
        self.transport.send_message(self.chat_id, &text).await?;
        Ok(reminder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingTransport, TEST_CHAT_ID, member, test_config};
    use rollcall_core::types::AnswerRecord;
    use rollcall_scheduler::MemoryStore;
    use std::sync::Arc;

    fn answered(entries: &[(&str, &str, &[u32])]) -> PollState {
        let mut state = PollState {
            poll_id: Some("P1".into()),
            ..PollState::default()
        };
        for (id, name, selected) in entries {
            state
                .answers
                .insert(id.to_string(), AnswerRecord::new(*name, selected.iter().copied()));
        }
        state
    }

    #[test]
    fn test_classification() {
        let state = answered(&[("2", "Yes Person", &[0]), ("3", "No Person", &[1])]);
        let members = vec![
            member("1", "Silent", None, false),
            member("2", "Yes", None, false),
            member("3", "No", Some("nope"), false),
            member("9", "Botty", None, true),
        ];
        let reminder = classify(&state, &members);
        assert_eq!(reminder.missing, vec!["Silent"]);
        // Falls back to the name captured at vote time
        assert_eq!(reminder.affirmative, vec!["Yes Person"]);
    }

    #[test]
    fn test_handles_preferred_over_names() {
        let state = answered(&[("2", "Ana", &[0])]);
        let members = vec![
            member("1", "Bob", Some("bob"), false),
            member("2", "Ana", Some("ana_p"), false),
        ];
        let reminder = classify(&state, &members);
        assert_eq!(reminder.affirmative, vec!["@ana_p"]);
        assert_eq!(reminder.missing, vec!["@bob"]);
    }

    #[test]
    fn test_empty_handle_falls_back() {
        let state = PollState::default();
        let members = vec![member("1", "Bob", Some(""), false)];
        assert_eq!(classify(&state, &members).missing, vec!["Bob"]);
    }

    #[test]
    fn test_retracted_vote_is_neither() {
        let state = answered(&[("1", "Bob", &[])]);
        let members = vec![member("1", "Bob", None, false)];
        assert_eq!(classify(&state, &members), Reminder::default());
    }

    #[test]
    fn test_compose_omits_empty_groups() {
        let messages = MessagesConfig::default();
        let text = compose_reminder(&Reminder::default(), &messages);
        assert_eq!(text, messages.reminder_greeting);

        let text = compose_reminder(
            &Reminder {
                affirmative: vec![],
                missing: vec!["a".into(), "b".into()],
            },
            &messages,
        );
        assert_eq!(
            text,
            format!("{}\n{}: a, b", messages.reminder_greeting, messages.reminder_missing)
        );
    }

    #[tokio::test]
    async fn test_ana_bob_scenario() {
        let store = Arc::new(MemoryStore::with_state(answered(&[("1", "Ana", &[0])])));
        let transport = Arc::new(RecordingTransport::with_members(vec![
            member("1", "Ana", Some("ana"), false),
            member("2", "Bob", None, false),
        ]));
        let svc = PollService::new(store, transport.clone(), &test_config()).unwrap();

        let outcome = svc.generate_reminder().await;
        assert_eq!(
            outcome,
            ReminderOutcome::Sent {
                affirmative: 1,
                missing: 1
            }
        );

        let messages = transport.messages();
        assert_eq!(messages.len(), 1);
        let (chat, text) = &messages[0];
        assert_eq!(*chat, TEST_CHAT_ID);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], svc.messages().reminder_greeting);
        assert!(lines[1].starts_with(&svc.messages().reminder_yes));
        assert!(lines[1].ends_with("@ana"));
        assert!(lines[2].starts_with(&svc.messages().reminder_missing));
        assert!(lines[2].ends_with("Bob"));
    }

    #[tokio::test]
    async fn test_member_fetch_failure_sends_notice() {
        let transport = Arc::new(RecordingTransport::new());
        transport.fail_members(true);
        let svc =
            PollService::new(Arc::new(MemoryStore::new()), transport.clone(), &test_config())
                .unwrap();

        let outcome = svc.generate_reminder().await;
        let ReminderOutcome::Failed(reason) = outcome else {
            panic!("expected failure");
        };
        assert!(reason.contains("chat not found"));

        let messages = transport.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].1.starts_with(&svc.messages().reminder_error));
        assert!(messages[0].1.contains("chat not found"));
    }

    #[tokio::test]
    async fn test_send_failure_sends_notice() {
        let transport = Arc::new(RecordingTransport::with_members(vec![member(
            "1", "Bob", None, false,
        )]));
        let greeting = MessagesConfig::default().reminder_greeting;
        transport.fail_messages_starting_with(Some(greeting.as_str()));
        let svc =
            PollService::new(Arc::new(MemoryStore::new()), transport.clone(), &test_config())
                .unwrap();

        let outcome = svc.generate_reminder().await;
        assert!(matches!(outcome, ReminderOutcome::Failed(_)));
        let messages = transport.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].1.contains("bot was kicked"));
    }
}
