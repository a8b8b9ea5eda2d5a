use std::sync::Arc;

use dashmap::DashMap;
use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::{
    models::{PollEntity, PollOptionEntity, PollOutcomeEntity, PollStatusEntity},
    poll_store::PollStore,
    storage::{StorageError, StorageResult},
};

/// Process-local store used when no database is configured, and by tests.
#[derive(Clone, Default)]
pub struct InMemoryPollStore {
    polls: Arc<DashMap<Uuid, PollEntity>>,
}

impl InMemoryPollStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of a stored record.
    pub fn get(&self, id: Uuid) -> Option<PollEntity> {
        self.polls.get(&id).map(|entry| entry.value().clone())
    }

    fn with_record<F>(&self, id: Uuid, update: F) -> StorageResult<()>
    where
        F: FnOnce(&mut PollEntity),
    {
        let mut entry = self
            .polls
            .get_mut(&id)
            .ok_or(StorageError::MissingRecord { id })?;
        update(entry.value_mut());
        Ok(())
    }

    fn ended(&self, limit: usize) -> Vec<PollEntity> {
        let mut ended = self
            .polls
            .iter()
            .filter(|entry| entry.status == PollStatusEntity::Ended)
            .map(|entry| entry.value().clone())
            .collect::<Vec<_>>();
        ended.sort_by(|a, b| b.ended_at.cmp(&a.ended_at));
        ended.truncate(limit);
        ended
    }
}

impl PollStore for InMemoryPollStore {
    fn create_record(&self, poll: PollEntity) -> BoxFuture<'static, StorageResult<()>> {
        self.polls.insert(poll.id, poll);
        Box::pin(async { Ok(()) })
    }

    fn update_options(
        &self,
        id: Uuid,
        options: Vec<PollOptionEntity>,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let result = self.with_record(id, |poll| poll.options = options);
        Box::pin(async move { result })
    }

    fn finalize_ended(
        &self,
        id: Uuid,
        outcome: PollOutcomeEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let result = self.with_record(id, |poll| {
            poll.status = PollStatusEntity::Ended;
            poll.ended_at = Some(outcome.ended_at);
            poll.options = outcome.options;
            poll.correct_answers_count = outcome.correct_answers_count;
        });
        Box::pin(async move { result })
    }

    fn list_ended(&self, limit: usize) -> BoxFuture<'static, StorageResult<Vec<PollEntity>>> {
        let polls = self.ended(limit);
        Box::pin(async move { Ok(polls) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, SystemTime};

    use super::*;

    fn record(question: &str) -> PollEntity {
        PollEntity {
            id: Uuid::new_v4(),
            question: question.into(),
            options: vec![
                PollOptionEntity {
                    id: 0,
                    text: "yes".into(),
                    votes: 0,
                },
                PollOptionEntity {
                    id: 1,
                    text: "no".into(),
                    votes: 0,
                },
            ],
            status: PollStatusEntity::Active,
            created_at: SystemTime::now(),
            ended_at: None,
            max_time_seconds: 30,
            correct_option_id: Some(0),
            correct_answers_count: 0,
        }
    }

    fn outcome(ended_at: SystemTime, correct: u32) -> PollOutcomeEntity {
        PollOutcomeEntity {
            ended_at,
            options: Vec::new(),
            correct_answers_count: correct,
        }
    }

    #[tokio::test]
    async fn history_lists_ended_polls_newest_first() {
        let store = InMemoryPollStore::new();
        let base = SystemTime::now();
        let mut ids = Vec::new();
        for (offset, question) in ["first", "second", "third"].iter().enumerate() {
            let poll = record(question);
            ids.push(poll.id);
            store.create_record(poll).await.unwrap();
            store
                .finalize_ended(
                    ids[offset],
                    outcome(base + Duration::from_secs(offset as u64), 1),
                )
                .await
                .unwrap();
        }
        store.create_record(record("still running")).await.unwrap();

        let history = store.list_ended(2).await.unwrap();
        let questions = history
            .iter()
            .map(|poll| poll.question.as_str())
            .collect::<Vec<_>>();
        assert_eq!(questions, vec!["third", "second"]);
    }

    #[tokio::test]
    async fn updates_overwrite_tallies() {
        let store = InMemoryPollStore::new();
        let poll = record("tally");
        let id = poll.id;
        store.create_record(poll).await.unwrap();

        let mut options = store.get(id).unwrap().options;
        options[1].votes = 3;
        store.update_options(id, options).await.unwrap();
        assert_eq!(store.get(id).unwrap().options[1].votes, 3);
    }

    #[tokio::test]
    async fn updating_unknown_poll_fails() {
        let store = InMemoryPollStore::new();
        let err = store
            .update_options(Uuid::new_v4(), Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::MissingRecord { .. }));
    }
}
