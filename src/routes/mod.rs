use axum::Router;

use crate::state::SharedState;

pub mod docs;
pub mod health;
pub mod maintenance;
pub mod search;
pub mod session;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(session::router())
        .merge(search::router())
        .merge(maintenance::router(state.clone()));

    let docs_router = docs::router(state.clone());

    api_router.merge(docs_router).with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
    };
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::{
        config::AppConfig, dao::session_store::MemorySessionStore,
        services::search_service::DisabledSearch, state::AppState,
    };

    async fn app(config: AppConfig) -> Router {
        let state = AppState::new(config, Arc::new(DisabledSearch));
        state
            .set_session_store(Arc::new(MemorySessionStore::new()))
            .await;
        router(state)
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    fn post(uri: &str, body: &str) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_owned()))
            .unwrap()
    }

    fn post_empty(uri: &str) -> Request<Body> {
        Request::post(uri).body(Body::empty()).unwrap()
    }

    async fn created(app: &Router) -> String {
        let (status, body) = send(app, post_empty("/api/session/create")).await;
        assert_eq!(status, StatusCode::OK);
        body["sessionId"].as_str().unwrap().to_owned()
    }

    fn tied_document() -> String {
        json!({
            "users": [
                {"id": "u1", "name": "Ana", "color": "red"},
                {"id": "u2", "name": "Bo", "color": "blue"}
            ],
            "games": [
                {"id": "a", "title": "A", "addedBy": "Ana", "votes": ["u1"]},
                {"id": "b", "title": "B", "addedBy": "Bo", "votes": ["u2"]}
            ]
        })
        .to_string()
    }

    #[tokio::test]
    async fn short_ids_resolve_unless_the_lookup_is_exact() {
        let app = app(AppConfig::default()).await;
        let id = created(&app).await;
        let short = &id[..8];

        let (status, body) = send(&app, get(&format!("/api/session/{short}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sessionId"], id.as_str());
        assert_eq!(body["users"], json!([]));

        let (status, body) = send(&app, get(&format!("/api/session/{short}?exact=true"))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["message"].is_string());

        let (status, _) = send(&app, get(&format!("/api/session/{id}?exact=true"))).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn overwrite_rejects_malformed_documents() {
        let app = app(AppConfig::default()).await;
        let id = created(&app).await;
        let uri = format!("/api/session/{id}");

        for body in [
            "{not json",
            r#"{"users": "everyone"}"#,
            r#"{"users": [{"id": "u1", "name": "  ", "color": "red"}]}"#,
        ] {
            let (status, response) = send(&app, post(&uri, body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
            assert!(response["message"].is_string());
        }

        let (status, body) = send(&app, post(&uri, &tied_document())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);

        let (status, _) = send(&app, post("/api/session/zzzzzzzzzzzz", "{}")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn spin_needs_a_tie() {
        let app = app(AppConfig::default()).await;
        let id = created(&app).await;
        let spin = format!("/api/session/{id}/spin");

        let (status, _) = send(&app, post_empty(&spin)).await;
        assert_eq!(status, StatusCode::CONFLICT);

        send(&app, post(&format!("/api/session/{id}"), &tied_document())).await;
        let (status, first) = send(&app, post(&spin, r#"{"seed": 42}"#)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["pool"].as_array().unwrap().len(), 2);

        let (_, again) = send(&app, post(&spin, r#"{"seed": 42}"#)).await;
        assert_eq!(again["winnerIndex"], first["winnerIndex"]);

        assert_eq!(send(&app, post_empty(&spin)).await.0, StatusCode::OK);
    }

    #[tokio::test]
    async fn cleanup_requires_the_cron_secret() {
        let app = app(AppConfig::default().with_cron_secret(Some("s3cret".into()))).await;

        let (status, _) = send(&app, post_empty("/api/cron/cleanup")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let wrong = Request::post("/api/cron/cleanup")
            .header(header::AUTHORIZATION, "Bearer nope")
            .body(Body::empty())
            .unwrap();
        assert_eq!(send(&app, wrong).await.0, StatusCode::UNAUTHORIZED);

        let right = Request::get("/api/cron/cleanup")
            .header(header::AUTHORIZATION, "Bearer s3cret")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app, right).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["deleted"], 0);
    }
}
