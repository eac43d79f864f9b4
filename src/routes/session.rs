use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::JsonRejection},
    routing::{get, post},
};
use axum_valid::{Valid, ValidRejection};
use validator::Validate;

use crate::{
    dto::{
        session::{
            CreateSessionResponse, SessionLookupQuery, SessionPayload, SessionResponse,
            UpdateSessionResponse,
        },
        tiebreak::{SpinRequest, SpinResponse, TieBreakResponse},
    },
    error::AppError,
    services::session_service,
    state::SharedState,
};

/// Session document routes.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/session/create", post(create_session))
        .route("/api/session/{id}", get(get_session).post(update_session))
        .route("/api/session/{id}/tiebreak", get(get_tiebreak))
        .route("/api/session/{id}/spin", post(spin))
}

/// Create an empty session and return its identifier.
#[utoipa::path(
    post,
    path = "/api/session/create",
    tag = "session",
    responses(
        (status = 200, description = "Session created", body = CreateSessionResponse),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn create_session(
    State(state): State<SharedState>,
) -> Result<Json<CreateSessionResponse>, AppError> {
    let id = session_service::create_session(&state).await?;
    Ok(Json(CreateSessionResponse::new(id)))
}

/// Fetch a session by full id or short-id prefix.
#[utoipa::path(
    get,
    path = "/api/session/{id}",
    tag = "session",
    params(
        ("id" = String, Path, description = "Full session id or its 8 character prefix"),
        SessionLookupQuery
    ),
    responses(
        (status = 200, description = "Session document", body = SessionResponse),
        (status = 400, description = "Malformed identifier"),
        (status = 404, description = "No such session")
    )
)]
pub async fn get_session(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Query(query): Query<SessionLookupQuery>,
) -> Result<Json<SessionResponse>, AppError> {
    let session = session_service::load_session(&state, &id, query.exact).await?;
    Ok(Json(session.into()))
}

/// Replace the whole document of a session.
#[utoipa::path(
    post,
    path = "/api/session/{id}",
    tag = "session",
    params(("id" = String, Path, description = "Full session id")),
    request_body = SessionPayload,
    responses(
        (status = 200, description = "Document stored", body = UpdateSessionResponse),
        (status = 400, description = "Missing or invalid document"),
        (status = 404, description = "No such session")
    )
)]
pub async fn update_session(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    payload: Result<Valid<Json<SessionPayload>>, ValidRejection<JsonRejection>>,
) -> Result<Json<UpdateSessionResponse>, AppError> {
    let Valid(Json(payload)) =
        payload.map_err(|rejection| AppError::BadRequest(rejection.to_string()))?;
    session_service::save_session(&state, &id, payload.into()).await?;
    Ok(Json(UpdateSessionResponse { success: true }))
}

/// Tie-break pool of the session's current tallies.
#[utoipa::path(
    get,
    path = "/api/session/{id}/tiebreak",
    tag = "session",
    params(("id" = String, Path, description = "Full session id or its 8 character prefix")),
    responses(
        (status = 200, description = "Pool, or the reason no draw applies", body = TieBreakResponse),
        (status = 404, description = "No such session")
    )
)]
pub async fn get_tiebreak(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<TieBreakResponse>, AppError> {
    let selection = session_service::tiebreak(&state, &id).await?;
    Ok(Json(selection.into()))
}

/// Draw a winner among the tied games and return the timeline to animate it.
#[utoipa::path(
    post,
    path = "/api/session/{id}/spin",
    tag = "session",
    params(("id" = String, Path, description = "Full session id or its 8 character prefix")),
    request_body(content = SpinRequest, description = "Optional seed and starting rotation"),
    responses(
        (status = 200, description = "Resolved draw", body = SpinResponse),
        (status = 404, description = "No such session"),
        (status = 409, description = "No tie to break")
    )
)]
pub async fn spin(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    request: Option<Json<SpinRequest>>,
) -> Result<Json<SpinResponse>, AppError> {
    let request = request.map(|Json(request)| request).unwrap_or_default();
    request.validate()?;

    let (pool, plan) = session_service::spin(
        &state,
        &id,
        request.seed,
        request.start_rotation.unwrap_or(0.0),
    )
    .await?;

    SpinResponse::new(pool, plan)
        .map(Json)
        .ok_or_else(|| AppError::Internal("drawn winner is outside the pool".into()))
}
