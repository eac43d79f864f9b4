use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::{Request, header::AUTHORIZATION},
    middleware::{self, Next},
    response::Response,
    routing::post,
};

use crate::{
    dto::maintenance::CleanupResponse, error::AppError, services::retention, state::SharedState,
};

/// Scheduled maintenance endpoints, guarded by the cron secret.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route("/api/cron/cleanup", post(cleanup).get(cleanup))
        .route_layer(middleware::from_fn_with_state(state, require_cron_secret))
}

/// Delete sessions inactive for longer than the retention window.
#[utoipa::path(
    post,
    path = "/api/cron/cleanup",
    tag = "maintenance",
    params(("Authorization" = String, Header, description = "`Bearer <CRON_SECRET>` when a secret is configured")),
    responses(
        (status = 200, description = "Sweep finished", body = CleanupResponse),
        (status = 401, description = "Missing or wrong secret"),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn cleanup(State(state): State<SharedState>) -> Result<Json<CleanupResponse>, AppError> {
    let deleted = retention::purge_stale_sessions(&state).await?;
    Ok(Json(CleanupResponse {
        success: true,
        deleted,
    }))
}

async fn require_cron_secret(
    State(state): State<SharedState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let authorization = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    retention::authorize_cleanup(&state, authorization)?;
    Ok(next.run(req).await)
}
