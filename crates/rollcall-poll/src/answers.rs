//! Vote recording.

use rollcall_core::error::Result;
use rollcall_core::types::{AnswerRecord, VoteEvent};

use crate::PollService;

/// Whether a vote made it into the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Recorded,
    /// Vote for a poll other than the stored one; ignored.
    Stale,
}

impl PollService {
    /// Upsert the voter's answer. The stored selection is replaced wholesale,
    /// so replays of the same event are idempotent and an empty selection
    /// (a retracted vote) is kept as an empty answer.
    ///
    /// With `validate_poll_id`, a vote is dropped only when a poll id is
    /// stored and differs; after a clear every vote is accepted.
    pub async fn record_answer(&self, vote: VoteEvent) -> Result<RecordOutcome> {
        let _guard = self.write_lock.lock().await;
        let mut state = self.store.load();

        if self.poll.validate_poll_id
            && let Some(current) = state.poll_id.as_deref()
            && current != vote.poll_id
        {
            tracing::debug!(
                "Ignoring vote from {} for poll {} (current: {:?})",
                vote.user_id,
                vote.poll_id,
                state.poll_id
            );
            return Ok(RecordOutcome::Stale);
        }

        tracing::info!(
            "🗳️ {} ({}) voted {:?}",
            vote.display_name,
            vote.user_id,
            vote.selected_option_indexes
        );
        state.answers.insert(
            vote.user_id,
            AnswerRecord::new(vote.display_name, vote.selected_option_indexes),
        );
        self.store.save(&state)?;
        Ok(RecordOutcome::Recorded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::Command;
    use crate::testing::{RecordingTransport, TEST_CHAT_ID, test_config};
    use rollcall_core::traits::PollStore;
    use rollcall_core::types::PollState;
    use rollcall_scheduler::MemoryStore;
    use std::collections::BTreeSet;
    use std::sync::Arc;

    fn vote(poll_id: &str, user: &str, name: &str, selected: &[u32]) -> VoteEvent {
        VoteEvent {
            poll_id: poll_id.into(),
            user_id: user.into(),
            display_name: name.into(),
            selected_option_indexes: selected.iter().copied().collect(),
        }
    }

    fn service_with(validate: bool) -> (PollService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::with_state(PollState {
            poll_id: Some("P1".into()),
            ..PollState::default()
        }));
        let mut config = test_config();
        config.poll.validate_poll_id = validate;
        let svc = PollService::new(store.clone(), Arc::new(RecordingTransport::new()), &config)
            .unwrap();
        (svc, store)
    }

    #[tokio::test]
    async fn test_last_vote_wins() {
        let (svc, store) = service_with(true);
        svc.record_answer(vote("P1", "42", "Ana Pop", &[0])).await.unwrap();
        svc.record_answer(vote("P1", "42", "Ana Pop", &[1])).await.unwrap();

        let state = store.load();
        assert_eq!(state.answers.len(), 1);
        let record = &state.answers["42"];
        assert_eq!(record.display_name, "Ana Pop");
        assert_eq!(record.selected_option_indexes, BTreeSet::from([1]));
    }

    #[tokio::test]
    async fn test_replay_is_idempotent() {
        let (svc, store) = service_with(true);
        svc.record_answer(vote("P1", "7", "Bob", &[0])).await.unwrap();
        let once = store.load();
        svc.record_answer(vote("P1", "7", "Bob", &[0])).await.unwrap();
        assert_eq!(store.load(), once);
    }

    #[tokio::test]
    async fn test_retraction_stores_empty_selection() {
        let (svc, store) = service_with(true);
        svc.record_answer(vote("P1", "7", "Bob", &[0])).await.unwrap();
        svc.record_answer(vote("P1", "7", "Bob", &[])).await.unwrap();

        let state = store.load();
        assert!(state.answers["7"].selected_option_indexes.is_empty());
        assert_eq!(state.total(), 1);
        assert_eq!(state.affirmative_count(), 0);
    }

    #[tokio::test]
    async fn test_vote_for_old_poll_is_stale() {
        let (svc, store) = service_with(true);
        let outcome = svc.record_answer(vote("P0", "7", "Bob", &[0])).await.unwrap();
        assert_eq!(outcome, RecordOutcome::Stale);
        assert!(store.load().answers.is_empty());
    }

    #[tokio::test]
    async fn test_vote_after_clear_is_recorded() {
        for validate in [false, true] {
            let (svc, store) = service_with(validate);
            svc.handle_command(Command::Clear, TEST_CHAT_ID).await;

            let outcome = svc.record_answer(vote("P1", "7", "Bob", &[0])).await.unwrap();
            assert_eq!(outcome, RecordOutcome::Recorded);
            assert_eq!(store.load().affirmative_count(), 1);
            assert_eq!(
                svc.status_text(),
                "📊 Answered: 1\n✅ Said \"Yes\": 1"
            );
        }
    }

    #[tokio::test]
    async fn test_default_config_records_any_poll_id() {
        let (svc, store) = service_with(test_config().poll.validate_poll_id);
        let outcome = svc.record_answer(vote("P0", "7", "Bob", &[1])).await.unwrap();
        assert_eq!(outcome, RecordOutcome::Recorded);
        assert_eq!(store.load().total(), 1);
    }

    #[tokio::test]
    async fn test_validation_disabled_records_anything() {
        let (svc, store) = service_with(false);
        let outcome = svc.record_answer(vote("P0", "7", "Bob", &[0])).await.unwrap();
        assert_eq!(outcome, RecordOutcome::Recorded);
        assert_eq!(store.load().answers.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_votes_all_land() {
        let (svc, store) = service_with(true);
        let svc = Arc::new(svc);
        let handles: Vec<_> = (0..20)
            .map(|i| {
                let svc = svc.clone();
                tokio::spawn(async move {
                    svc.record_answer(vote("P1", &i.to_string(), "Voter", &[i % 2]))
                        .await
                        .unwrap()
                })
            })
            .collect();
        for h in handles {
            h.await.unwrap();
        }
        let state = store.load();
        assert_eq!(state.total(), 20);
        assert_eq!(state.affirmative_count(), 10);
    }
}
