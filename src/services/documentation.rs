use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI document for Squad Choice Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::session::create_session,
        crate::routes::session::get_session,
        crate::routes::session::update_session,
        crate::routes::session::get_tiebreak,
        crate::routes::session::spin,
        crate::routes::search::search,
        crate::routes::maintenance::cleanup,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::session::CreateSessionResponse,
            crate::dto::session::SessionResponse,
            crate::dto::session::SessionPayload,
            crate::dto::session::UpdateSessionResponse,
            crate::dto::tiebreak::TieBreakResponse,
            crate::dto::tiebreak::PoolTierDto,
            crate::dto::tiebreak::NotApplicableReason,
            crate::dto::tiebreak::SpinRequest,
            crate::dto::tiebreak::SpinResponse,
            crate::dto::tiebreak::SpinLegDto,
            crate::dto::tiebreak::SpinLegPhase,
            crate::dto::search::SearchResponse,
            crate::dto::maintenance::CleanupResponse,
            crate::services::search_service::CatalogHit,
            crate::state::session::User,
            crate::state::session::Game,
            crate::state::session::GameStatus,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "session", description = "Session documents and tie-break draws"),
        (name = "search", description = "Game catalog lookup"),
        (name = "maintenance", description = "Scheduled cleanup"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_route_is_documented() {
        let doc = ApiDoc::openapi();
        for path in [
            "/healthcheck",
            "/api/session/create",
            "/api/session/{id}",
            "/api/session/{id}/tiebreak",
            "/api/session/{id}/spin",
            "/api/search",
            "/api/cron/cleanup",
        ] {
            assert!(doc.paths.paths.contains_key(path), "{path} missing");
        }
    }
}
