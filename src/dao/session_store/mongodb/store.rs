use std::sync::Arc;

use futures::future::BoxFuture;
use mongodb::{Client, Collection, Database, IndexModel, bson::doc, options::IndexOptions};
use tokio::sync::RwLock;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult, is_duplicate_key},
    models::{MongoSessionDocument, doc_id, prefix_filter, stale_filter},
};
use crate::dao::{
    models::SessionEntity,
    session_store::SessionStore,
    storage::{StorageError, StorageResult},
};

const SESSION_COLLECTION_NAME: &str = "sessions";

#[derive(Clone)]
pub struct MongoSessionStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    #[allow(dead_code)]
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = self.state.read().await.database.clone();
        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

impl MongoSessionStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let store = Self {
            inner: Arc::new(MongoInner {
                state: RwLock::new(MongoState { client, database }),
                config,
            }),
        };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let index = IndexModel::builder()
            .keys(doc! {"last_active": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("session_last_active_idx".to_owned()))
                    .build(),
            )
            .build();

        self.collection()
            .await
            .create_index(index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: SESSION_COLLECTION_NAME,
                index: "last_active",
                source,
            })?;

        Ok(())
    }

    async fn collection(&self) -> Collection<MongoSessionDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoSessionDocument>(SESSION_COLLECTION_NAME)
    }

    async fn create(&self, session: SessionEntity) -> MongoResult<()> {
        let id = session.id.clone();
        let document: MongoSessionDocument = session.into();
        self.collection()
            .await
            .insert_one(&document)
            .await
            .map_err(|source| {
                if is_duplicate_key(&source) {
                    MongoDaoError::DuplicateSession { id: id.clone() }
                } else {
                    MongoDaoError::SaveSession {
                        id: id.clone(),
                        source,
                    }
                }
            })?;
        Ok(())
    }

    async fn find_one(&self, id: &str, prefix: bool) -> MongoResult<Option<SessionEntity>> {
        let filter = if prefix { prefix_filter(id) } else { doc_id(id) };
        let document = self
            .collection()
            .await
            .find_one(filter)
            .await
            .map_err(|source| MongoDaoError::LoadSession {
                id: id.to_owned(),
                source,
            })?;
        Ok(document.map(Into::into))
    }

    async fn update(&self, session: SessionEntity) -> StorageResult<()> {
        let id = session.id.clone();
        let document: MongoSessionDocument = session.into();
        let result = self
            .collection()
            .await
            .replace_one(doc_id(&id), &document)
            .await
            .map_err(|source| MongoDaoError::SaveSession {
                id: id.clone(),
                source,
            })?;

        if result.matched_count == 0 {
            return Err(StorageError::not_found(id));
        }
        Ok(())
    }

    async fn purge_stale(&self, cutoff_ms: i64) -> MongoResult<u64> {
        let result = self
            .collection()
            .await
            .delete_many(stale_filter(cutoff_ms))
            .await
            .map_err(|source| MongoDaoError::PurgeSessions { source })?;
        Ok(result.deleted_count)
    }
}

impl SessionStore for MongoSessionStore {
    fn create(&self, session: SessionEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.create(session).await.map_err(Into::into) })
    }

    fn find_exact(&self, id: String) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_one(&id, false).await.map_err(Into::into) })
    }

    fn find_by_prefix(
        &self,
        prefix: String,
    ) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_one(&prefix, true).await.map_err(Into::into) })
    }

    fn update(&self, session: SessionEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.update(session).await })
    }

    fn purge_stale(&self, cutoff_ms: i64) -> BoxFuture<'static, StorageResult<u64>> {
        let store = self.clone();
        Box::pin(async move { store.purge_stale(cutoff_ms).await.map_err(Into::into) })
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
