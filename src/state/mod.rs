pub mod ids;
pub mod session;
pub mod spin;
pub mod tiebreak;

use std::sync::Arc;

use tokio::sync::{RwLock, watch};

use crate::{
    config::AppConfig, dao::session_store::SessionStore, error::ServiceError,
    services::search_service::{CachedSearch, SEARCH_CACHE_TTL, SearchProvider},
};

pub type SharedState = Arc<AppState>;

/// Central application state holding the storage handle and collaborators.
pub struct AppState {
    session_store: RwLock<Option<Arc<dyn SessionStore>>>,
    degraded: watch::Sender<bool>,
    config: AppConfig,
    search: CachedSearch,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig, search: Arc<dyn SearchProvider>) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            session_store: RwLock::new(None),
            degraded: degraded_tx,
            config,
            search: CachedSearch::new(search, SEARCH_CACHE_TTL),
        })
    }

    /// Obtain a handle to the current session store, if one is installed.
    pub async fn session_store(&self) -> Option<Arc<dyn SessionStore>> {
        let guard = self.session_store.read().await;
        guard.as_ref().cloned()
    }

    /// Current session store, or [`ServiceError::Degraded`] while none is usable.
    pub async fn require_session_store(&self) -> Result<Arc<dyn SessionStore>, ServiceError> {
        if self.is_degraded() {
            return Err(ServiceError::Degraded);
        }
        self.session_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new session store implementation and leave degraded mode.
    pub async fn set_session_store(&self, store: Arc<dyn SessionStore>) {
        {
            let mut guard = self.session_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Remove the current session store and enter degraded mode.
    pub async fn clear_session_store(&self) {
        {
            let mut guard = self.session_store.write().await;
            guard.take();
        }
        self.update_degraded(true);
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update the degraded flag, notifying watchers only when the value changes.
    pub fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        });
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Catalog search collaborator, behind its result cache.
    pub fn search(&self) -> &CachedSearch {
        &self.search
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{dao::session_store::MemorySessionStore, services::search_service::DisabledSearch};

    #[tokio::test]
    async fn installing_a_store_leaves_degraded_mode() {
        let state = AppState::new(AppConfig::default(), Arc::new(DisabledSearch));
        let mut watcher = state.degraded_watcher();
        assert!(state.is_degraded());
        assert!(matches!(
            state.require_session_store().await,
            Err(ServiceError::Degraded)
        ));

        state
            .set_session_store(Arc::new(MemorySessionStore::new()))
            .await;
        assert!(watcher.has_changed().unwrap());
        assert!(!*watcher.borrow_and_update());
        assert!(state.require_session_store().await.is_ok());

        state.clear_session_store().await;
        assert!(state.is_degraded());
        assert!(state.session_store().await.is_none());
    }

    #[tokio::test]
    async fn unchanged_flag_does_not_notify() {
        let state = AppState::new(AppConfig::default(), Arc::new(DisabledSearch));
        let watcher = state.degraded_watcher();
        state.update_degraded(true);
        assert!(!watcher.has_changed().unwrap());
    }
}
