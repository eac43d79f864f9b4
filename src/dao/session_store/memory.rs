//! Process-local store backed by a concurrent map.

use std::sync::Arc;

use dashmap::{DashMap, mapref::entry::Entry};
use futures::future::BoxFuture;

use super::SessionStore;
use crate::dao::{
    models::SessionEntity,
    storage::{StorageError, StorageResult},
};

/// Volatile session store, used when no database is configured and in tests.
#[derive(Clone, Default)]
pub struct MemorySessionStore {
    sessions: Arc<DashMap<String, SessionEntity>>,
}

impl MemorySessionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether the store holds no session.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl SessionStore for MemorySessionStore {
    fn create(&self, session: SessionEntity) -> BoxFuture<'static, StorageResult<()>> {
        let sessions = self.sessions.clone();
        Box::pin(async move {
            match sessions.entry(session.id.clone()) {
                Entry::Occupied(_) => Err(StorageError::conflict(session.id)),
                Entry::Vacant(slot) => {
                    slot.insert(session);
                    Ok(())
                }
            }
        })
    }

    fn find_exact(&self, id: String) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>> {
        let sessions = self.sessions.clone();
        Box::pin(async move { Ok(sessions.get(&id).map(|entry| entry.value().clone())) })
    }

    fn find_by_prefix(
        &self,
        prefix: String,
    ) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>> {
        let sessions = self.sessions.clone();
        Box::pin(async move {
            Ok(sessions
                .iter()
                .find(|entry| entry.key().starts_with(&prefix))
                .map(|entry| entry.value().clone()))
        })
    }

    fn update(&self, session: SessionEntity) -> BoxFuture<'static, StorageResult<()>> {
        let sessions = self.sessions.clone();
        Box::pin(async move {
            match sessions.get_mut(&session.id) {
                Some(mut existing) => {
                    *existing = session;
                    Ok(())
                }
                None => Err(StorageError::not_found(session.id)),
            }
        })
    }

    fn purge_stale(&self, cutoff_ms: i64) -> BoxFuture<'static, StorageResult<u64>> {
        let sessions = self.sessions.clone();
        Box::pin(async move {
            let mut removed = 0;
            sessions.retain(|_, session| {
                let keep = session.last_active_ms >= cutoff_ms;
                if !keep {
                    removed += 1;
                }
                keep
            });
            Ok(removed)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}
