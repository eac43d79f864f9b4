use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use utoipa::{IntoParams, ToSchema};

use crate::services::search_service::{CatalogHit, SearchOutcome};

/// Query string of the catalog search route.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct SearchQuery {
    /// Free-text query; an empty or missing value yields no results.
    pub q: Option<String>,
}

/// Catalog matches for a query.
#[skip_serializing_none]
#[derive(Debug, Serialize, ToSchema)]
pub struct SearchResponse {
    pub items: Vec<CatalogHit>,
    /// Whether the items were served from cache; absent for empty queries.
    pub cached: Option<bool>,
}

impl SearchResponse {
    /// Response for a blank query.
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            cached: None,
        }
    }
}

impl From<SearchOutcome> for SearchResponse {
    fn from(outcome: SearchOutcome) -> Self {
        Self {
            items: outcome.hits,
            cached: Some(outcome.cached),
        }
    }
}
