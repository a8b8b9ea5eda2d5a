use std::sync::Arc;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Collection, Database, IndexModel,
    bson::{DateTime, doc},
    options::IndexOptions,
};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
    models::{MongoPollDocument, doc_id, options_bson},
};
use crate::dao::{
    models::{PollEntity, PollOptionEntity, PollOutcomeEntity},
    poll_store::PollStore,
    storage::StorageResult,
};

const POLL_COLLECTION_NAME: &str = "polls";

/// MongoDB-backed poll history.
#[derive(Clone)]
pub struct MongoPollStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    database: RwLock<Database>,
    config: MongoConfig,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = self.database.read().await.clone();
        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (_client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        *self.database.write().await = database;
        Ok(())
    }
}

impl MongoPollStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (_client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let store = Self {
            inner: Arc::new(MongoInner {
                database: RwLock::new(database),
                config,
            }),
        };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let index = IndexModel::builder()
            .keys(doc! { "status": 1, "ended_at": -1 })
            .options(
                IndexOptions::builder()
                    .name(Some("poll_history_idx".to_owned()))
                    .build(),
            )
            .build();

        self.collection()
            .await
            .create_index(index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: POLL_COLLECTION_NAME,
                index: "status,ended_at",
                source,
            })?;
        Ok(())
    }

    async fn collection(&self) -> Collection<MongoPollDocument> {
        let database = self.inner.database.read().await;
        database.collection::<MongoPollDocument>(POLL_COLLECTION_NAME)
    }

    async fn create_record(&self, poll: PollEntity) -> MongoResult<()> {
        let id = poll.id;
        let document = MongoPollDocument::from(poll);
        self.collection()
            .await
            .replace_one(doc_id(id), &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::WritePoll { id, source })?;
        Ok(())
    }

    async fn update_options(&self, id: Uuid, options: Vec<PollOptionEntity>) -> MongoResult<()> {
        let result = self
            .collection()
            .await
            .update_one(doc_id(id), doc! { "$set": { "options": options_bson(&options) } })
            .await
            .map_err(|source| MongoDaoError::WritePoll { id, source })?;

        if result.matched_count == 0 {
            return Err(MongoDaoError::MissingPoll { id });
        }
        Ok(())
    }

    async fn finalize_ended(&self, id: Uuid, outcome: PollOutcomeEntity) -> MongoResult<()> {
        let update = doc! {
            "$set": {
                "status": "ended",
                "ended_at": DateTime::from_system_time(outcome.ended_at),
                "options": options_bson(&outcome.options),
                "correct_answers_count": i64::from(outcome.correct_answers_count),
            }
        };
        let result = self
            .collection()
            .await
            .update_one(doc_id(id), update)
            .await
            .map_err(|source| MongoDaoError::WritePoll { id, source })?;

        if result.matched_count == 0 {
            return Err(MongoDaoError::MissingPoll { id });
        }
        Ok(())
    }

    async fn list_ended(&self, limit: usize) -> MongoResult<Vec<PollEntity>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let documents: Vec<MongoPollDocument> = self
            .collection()
            .await
            .find(doc! { "status": "ended" })
            .sort(doc! { "ended_at": -1 })
            .limit(limit)
            .await
            .map_err(|source| MongoDaoError::ListPolls { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListPolls { source })?;

        documents.into_iter().map(PollEntity::try_from).collect()
    }
}

impl PollStore for MongoPollStore {
    fn create_record(&self, poll: PollEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.create_record(poll).await.map_err(Into::into) })
    }

    fn update_options(
        &self,
        id: Uuid,
        options: Vec<PollOptionEntity>,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.update_options(id, options).await.map_err(Into::into) })
    }

    fn finalize_ended(
        &self,
        id: Uuid,
        outcome: PollOutcomeEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.finalize_ended(id, outcome).await.map_err(Into::into) })
    }

    fn list_ended(&self, limit: usize) -> BoxFuture<'static, StorageResult<Vec<PollEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_ended(limit).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
