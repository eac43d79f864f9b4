use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};

use crate::{
    dto::search::{SearchQuery, SearchResponse},
    error::AppError,
    state::SharedState,
};

/// Catalog search routes.
pub fn router() -> Router<SharedState> {
    Router::new().route("/api/search", get(search))
}

/// Search the game catalog; answers are cached per query for an hour.
#[utoipa::path(
    get,
    path = "/api/search",
    tag = "search",
    params(SearchQuery),
    responses(
        (status = 200, description = "Catalog matches", body = SearchResponse),
        (status = 500, description = "Catalog lookup failed")
    )
)]
pub async fn search(
    State(state): State<SharedState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResponse>, AppError> {
    let Some(q) = query.q.filter(|q| !q.trim().is_empty()) else {
        return Ok(Json(SearchResponse::empty()));
    };

    let outcome = state
        .search()
        .lookup(&q)
        .await
        .map_err(|err| AppError::Internal(err.to_string()))?;
    Ok(Json(outcome.into()))
}
