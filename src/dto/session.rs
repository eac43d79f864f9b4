use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationErrors};

use crate::{
    dto::validation::{validate_display_name, validate_unique},
    state::{
        ids::short_id,
        session::{Game, Session, SessionDocument, User},
    },
};

/// Identifier of a freshly created session.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionResponse {
    pub session_id: String,
    /// Prefix shown to participants.
    pub short_id: String,
}

impl CreateSessionResponse {
    pub fn new(session_id: String) -> Self {
        Self {
            short_id: short_id(&session_id).to_owned(),
            session_id,
        }
    }
}

/// Query string of the session lookup route.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct SessionLookupQuery {
    /// Disable the short-id prefix fallback.
    #[serde(default)]
    pub exact: bool,
}

/// Session document with the metadata the store attached to it.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    /// Full identifier, even when the lookup used a short prefix.
    pub session_id: String,
    pub short_id: String,
    /// Last write time in epoch milliseconds.
    pub last_active: i64,
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub games: Vec<Game>,
}

impl From<Session> for SessionResponse {
    fn from(session: Session) -> Self {
        Self {
            short_id: short_id(&session.id).to_owned(),
            session_id: session.id,
            last_active: session.last_active_ms,
            users: session.document.users,
            games: session.document.games,
        }
    }
}

impl From<SessionResponse> for Session {
    fn from(response: SessionResponse) -> Self {
        Self {
            id: response.session_id,
            document: SessionDocument {
                users: response.users,
                games: response.games,
            },
            last_active_ms: response.last_active,
        }
    }
}

/// Full document pushed by a client; it replaces the stored one entirely.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SessionPayload {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub games: Vec<Game>,
}

impl Validate for SessionPayload {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Some(err) = self
            .users
            .iter()
            .find_map(|user| validate_display_name(&user.name).err())
        {
            errors.add("users", err);
        }

        if let Err(err) = validate_unique(
            self.users.iter().map(|user| user.id.as_str()),
            "duplicate_user_id",
        ) {
            errors.add("users", err);
        }

        if let Err(err) = validate_unique(
            self.games.iter().map(|game| game.id.as_str()),
            "duplicate_game_id",
        ) {
            errors.add("games", err);
        }

        if let Some(err) = self.games.iter().find_map(|game| {
            validate_unique(game.votes.iter().map(String::as_str), "duplicate_vote").err()
        }) {
            errors.add("games", err);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl From<SessionPayload> for SessionDocument {
    fn from(payload: SessionPayload) -> Self {
        Self {
            users: payload.users,
            games: payload.games,
        }
    }
}

/// Acknowledgement of a document overwrite.
#[derive(Debug, Serialize, ToSchema)]
pub struct UpdateSessionResponse {
    pub success: bool,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn payload(value: serde_json::Value) -> SessionPayload {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn well_formed_document_passes() {
        let body = payload(json!({
            "users": [{"id": "u1", "name": "Ana", "color": "red"}],
            "games": [{"id": 1942, "title": "Hades", "addedBy": "Ana", "votes": ["u1", "gone"]}]
        }));
        assert!(body.validate().is_ok());
        let document = SessionDocument::from(body);
        assert_eq!(document.games[0].id, "1942");
    }

    #[test]
    fn blank_names_and_duplicates_are_rejected() {
        let body = payload(json!({
            "users": [
                {"id": "u1", "name": " ", "color": "red"},
                {"id": "u1", "name": "Bo", "color": "blue"}
            ],
            "games": [
                {"id": "g", "title": "A", "votes": ["u1", "u1"]},
                {"id": "g", "title": "B"}
            ]
        }));
        let errors = body.validate().unwrap_err();
        let fields = errors.field_errors();
        assert_eq!(fields["users"].len(), 2);
        assert_eq!(fields["games"].len(), 2);
    }

    #[test]
    fn missing_lists_default_to_empty() {
        let body = payload(json!({}));
        assert!(body.validate().is_ok());
        assert_eq!(SessionDocument::from(body), SessionDocument::default());
    }

    #[test]
    fn response_exposes_the_full_id() {
        let response = SessionResponse::from(Session {
            id: "k3j9x0aa1b2c".into(),
            document: SessionDocument::default(),
            last_active_ms: 7,
        });
        let value = serde_json::to_value(response).unwrap();
        assert_eq!(value["sessionId"], "k3j9x0aa1b2c");
        assert_eq!(value["shortId"], "k3j9x0aa");
        assert_eq!(value["lastActive"], 7);
    }
}
