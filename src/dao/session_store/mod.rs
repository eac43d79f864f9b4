#[cfg(feature = "couch-store")]
pub mod couchdb;
pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use crate::dao::models::SessionEntity;
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;

pub use memory::MemorySessionStore;

/// Abstraction over the persistence layer: one JSON document per session, last writer wins.
pub trait SessionStore: Send + Sync {
    /// Insert a new session; fails with `Conflict` when the id is taken.
    fn create(&self, session: SessionEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Look a session up by its full identifier.
    fn find_exact(&self, id: String) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>>;
    /// Return any session whose identifier starts with `prefix`.
    fn find_by_prefix(
        &self,
        prefix: String,
    ) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>>;
    /// Overwrite the document and freshness timestamp; fails with `NotFound` when absent.
    fn update(&self, session: SessionEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Delete every session last written before `cutoff_ms`, returning how many were removed.
    fn purge_stale(&self, cutoff_ms: i64) -> BoxFuture<'static, StorageResult<u64>>;
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
