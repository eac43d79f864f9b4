//! Transport between a session client and the shared store.

use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;

use crate::{
    client::error::ClientError,
    dto::session::{CreateSessionResponse, SessionResponse},
    services::session_service,
    state::{
        SharedState,
        session::{Session, SessionDocument},
    },
};

/// Operations a client needs from the shared store.
pub trait SessionApi: Send + Sync {
    /// Create an empty session and return its full id.
    fn create(&self) -> BoxFuture<'static, Result<String, ClientError>>;
    /// Read a session by full id, or by short-id prefix unless `exact` is set.
    fn fetch(&self, id: String, exact: bool) -> BoxFuture<'static, Result<Session, ClientError>>;
    /// Overwrite the whole document of a session.
    fn push(
        &self,
        id: String,
        document: SessionDocument,
    ) -> BoxFuture<'static, Result<(), ClientError>>;
}

/// Talks to a running server over its REST routes.
#[derive(Clone)]
pub struct HttpSessionApi {
    client: Client,
    base_url: Arc<str>,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl HttpSessionApi {
    /// Target the server at `base_url` (scheme and host, no trailing `/api`).
    pub fn new(base_url: &str) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    /// Reuse an existing HTTP client.
    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: Arc::from(base_url.trim_end_matches('/')),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/session/{}", self.base_url, path)
    }

    /// Map error statuses onto the client taxonomy, keeping the server message.
    async fn check(response: Response) -> Result<Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.message,
            Err(_) => status.to_string(),
        };
        Err(match status {
            StatusCode::NOT_FOUND => ClientError::NotFound(message),
            StatusCode::CONFLICT => ClientError::Conflict(message),
            StatusCode::BAD_REQUEST => ClientError::Validation(message),
            _ => ClientError::TransientIo(message),
        })
    }
}

impl SessionApi for HttpSessionApi {
    fn create(&self) -> BoxFuture<'static, Result<String, ClientError>> {
        let request = self.client.post(self.url("create"));
        Box::pin(async move {
            let response = Self::check(request.send().await?).await?;
            let created = response.json::<CreateSessionResponse>().await?;
            Ok(created.session_id)
        })
    }

    fn fetch(&self, id: String, exact: bool) -> BoxFuture<'static, Result<Session, ClientError>> {
        let request = self
            .client
            .get(self.url(&id))
            .query(&[("exact", exact)]);
        Box::pin(async move {
            let response = Self::check(request.send().await?).await?;
            let session = response.json::<SessionResponse>().await?;
            Ok(session.into())
        })
    }

    fn push(
        &self,
        id: String,
        document: SessionDocument,
    ) -> BoxFuture<'static, Result<(), ClientError>> {
        let request = self.client.post(self.url(&id)).json(&document);
        Box::pin(async move {
            Self::check(request.send().await?).await?;
            Ok(())
        })
    }
}

/// Calls the session services directly, sharing the server's state and store.
#[derive(Clone)]
pub struct InProcessSessionApi {
    state: SharedState,
}

impl InProcessSessionApi {
    /// Wrap the shared application state.
    pub fn new(state: SharedState) -> Self {
        Self { state }
    }
}

impl SessionApi for InProcessSessionApi {
    fn create(&self) -> BoxFuture<'static, Result<String, ClientError>> {
        let state = self.state.clone();
        Box::pin(async move { Ok(session_service::create_session(&state).await?) })
    }

    fn fetch(&self, id: String, exact: bool) -> BoxFuture<'static, Result<Session, ClientError>> {
        let state = self.state.clone();
        Box::pin(async move { Ok(session_service::load_session(&state, &id, exact).await?) })
    }

    fn push(
        &self,
        id: String,
        document: SessionDocument,
    ) -> BoxFuture<'static, Result<(), ClientError>> {
        let state = self.state.clone();
        Box::pin(async move { Ok(session_service::save_session(&state, &id, document).await?) })
    }
}

#[cfg(test)]
mod tests {
    use tokio::net::TcpListener;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::session_store::MemorySessionStore,
        routes,
        services::search_service::DisabledSearch,
        state::{AppState, session::User},
    };

    async fn serve(with_store: bool) -> HttpSessionApi {
        let state = AppState::new(AppConfig::default(), Arc::new(DisabledSearch));
        if with_store {
            state
                .set_session_store(Arc::new(MemorySessionStore::new()))
                .await;
        }
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, routes::router(state)).await.unwrap();
        });
        HttpSessionApi::new(&format!("http://{addr}/"))
    }

    #[tokio::test]
    async fn documents_round_trip_over_http() {
        let api = serve(true).await;
        let id = api.create().await.unwrap();

        let document = SessionDocument {
            users: vec![User {
                id: "u1".into(),
                name: "Ana".into(),
                color: "red".into(),
            }],
            games: Vec::new(),
        };
        api.push(id.clone(), document.clone()).await.unwrap();

        let by_prefix = api.fetch(id[..8].to_owned(), false).await.unwrap();
        assert_eq!(by_prefix.id, id);
        assert_eq!(by_prefix.document, document);
        assert!(by_prefix.last_active_ms > 0);
    }

    #[tokio::test]
    async fn error_statuses_map_onto_client_errors() {
        let api = serve(true).await;
        let id = api.create().await.unwrap();

        let exact_prefix = api.fetch(id[..8].to_owned(), true).await;
        assert!(matches!(exact_prefix, Err(ClientError::NotFound(_))));

        let blank = SessionDocument {
            users: vec![User {
                id: "u1".into(),
                name: " ".into(),
                color: "red".into(),
            }],
            games: Vec::new(),
        };
        assert!(matches!(
            api.push(id, blank).await,
            Err(ClientError::Validation(_))
        ));

        let degraded = serve(false).await;
        assert!(matches!(
            degraded.create().await,
            Err(ClientError::TransientIo(_))
        ));
    }
}
