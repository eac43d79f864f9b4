//! Facade over the external game catalog used to populate new list entries.
//!
//! The catalog itself (credentials, query language) lives behind [`SearchProvider`]; this
//! module only adds query hygiene and a per-query result cache.

use std::{sync::Arc, time::Duration};

use dashmap::DashMap;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, warn};
use utoipa::ToSchema;

/// How long a catalog answer is reused for the same query.
pub const SEARCH_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

/// One catalog match offered to the user when adding a game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CatalogHit {
    /// Catalog identifier, reused as the game id.
    pub id: String,
    /// Game title.
    pub name: String,
    /// Cover art URL, when available.
    pub cover_url: Option<String>,
}

/// Failure reported by a catalog backend.
#[derive(Debug, Error)]
pub enum SearchError {
    /// The catalog could not be reached or rejected the request.
    #[error("catalog lookup failed: {0}")]
    Upstream(String),
}

/// External catalog lookup.
pub trait SearchProvider: Send + Sync {
    /// Search the catalog for `query`, already sanitized.
    fn search(&self, query: String) -> BoxFuture<'static, Result<Vec<CatalogHit>, SearchError>>;
}

/// Provider used when no catalog is configured: every query yields nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledSearch;

impl SearchProvider for DisabledSearch {
    fn search(&self, _query: String) -> BoxFuture<'static, Result<Vec<CatalogHit>, SearchError>> {
        Box::pin(async { Ok(Vec::new()) })
    }
}

/// Result of a cached lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOutcome {
    /// Matches, in catalog order.
    pub hits: Vec<CatalogHit>,
    /// Whether the answer came from the cache.
    pub cached: bool,
}

struct CacheEntry {
    hits: Vec<CatalogHit>,
    stored_at: Instant,
}

/// Caching decorator keyed by the lower-cased query.
pub struct CachedSearch {
    provider: Arc<dyn SearchProvider>,
    cache: DashMap<String, CacheEntry>,
    ttl: Duration,
}

impl CachedSearch {
    /// Wrap `provider` with a cache whose entries live for `ttl`.
    pub fn new(provider: Arc<dyn SearchProvider>, ttl: Duration) -> Self {
        Self {
            provider,
            cache: DashMap::new(),
            ttl,
        }
    }

    /// Look `query` up, serving a fresh cached answer when there is one.
    pub async fn lookup(&self, query: &str) -> Result<SearchOutcome, SearchError> {
        let key = query.trim().to_lowercase();
        if key.is_empty() {
            return Ok(SearchOutcome {
                hits: Vec::new(),
                cached: false,
            });
        }

        if let Some(hits) = self.cached(&key) {
            debug!(query = %key, "serving catalog search from cache");
            return Ok(SearchOutcome { hits, cached: true });
        }

        let hits = self
            .provider
            .search(sanitize_query(query))
            .await
            .inspect_err(|err| warn!(query = %key, error = %err, "catalog search failed"))?;

        self.evict_expired();
        self.cache.insert(
            key,
            CacheEntry {
                hits: hits.clone(),
                stored_at: Instant::now(),
            },
        );
        Ok(SearchOutcome {
            hits,
            cached: false,
        })
    }

    /// Drop every expired answer, so one-off queries do not pile up.
    fn evict_expired(&self) {
        let before = self.cache.len();
        self.cache
            .retain(|_, entry| entry.stored_at.elapsed() < self.ttl);
        let evicted = before.saturating_sub(self.cache.len());
        if evicted > 0 {
            debug!(evicted, "expired catalog searches evicted");
        }
    }

    fn cached(&self, key: &str) -> Option<Vec<CatalogHit>> {
        let entry = self.cache.get(key)?;
        if entry.stored_at.elapsed() < self.ttl {
            return Some(entry.hits.clone());
        }
        drop(entry);
        self.cache.remove(key);
        None
    }
}

/// Strip characters that would break out of the catalog's query string.
pub fn sanitize_query(query: &str) -> String {
    query
        .trim()
        .chars()
        .filter(|c| *c != '"' && *c != ';')
        .collect()
}
