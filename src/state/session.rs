//! Shared session document and the pure edits every client applies before pushing it.
//!
//! Each edit takes the last known document and returns a brand-new one. Nothing here talks to
//! storage: the caller decides whether the result becomes an optimistic local state, a full
//! overwrite pushed to the store, or both.

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Identifier of a participant, unique within one session only.
pub type UserId = String;
/// Identifier of a game, taken from the external catalog.
pub type GameId = String;

/// Participant of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct User {
    /// Session-scoped identifier generated by the client that created the profile.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Opaque color token used by the presentation layer.
    pub color: String,
}

/// Whether a game is still up for vote or has already been played.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    /// Still competing for votes.
    #[default]
    Active,
    /// Already played; excluded from tie-breaks.
    Played,
}

impl GameStatus {
    /// The other status.
    pub fn toggled(self) -> Self {
        match self {
            GameStatus::Active => GameStatus::Played,
            GameStatus::Played => GameStatus::Active,
        }
    }
}

/// Candidate game on the shared list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    /// Catalog identifier (stored documents may hold it as a number).
    #[serde(deserialize_with = "catalog_id")]
    #[schema(value_type = String)]
    pub id: GameId,
    /// Display title.
    pub title: String,
    /// Cover art URL, when the catalog has one.
    #[serde(default)]
    pub cover: Option<String>,
    /// Name of the user who added the game, captured at insertion time.
    #[serde(default)]
    pub added_by: String,
    /// Ids of users who voted for the game; each id appears at most once.
    #[serde(default)]
    pub votes: Vec<UserId>,
    /// Lifecycle status.
    #[serde(default)]
    pub status: GameStatus,
}

impl Game {
    /// Number of votes cast for the game.
    pub fn vote_count(&self) -> usize {
        self.votes.len()
    }

    /// Whether the game still competes for votes.
    pub fn is_active(&self) -> bool {
        self.status == GameStatus::Active
    }

    /// Whether the given user currently votes for the game.
    pub fn has_vote_from(&self, user_id: &str) -> bool {
        self.votes.iter().any(|vote| vote == user_id)
    }
}

/// Catalog entry a user picked to add to the list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct NewGame {
    /// Catalog identifier.
    pub id: GameId,
    /// Display title.
    pub title: String,
    /// Cover art URL.
    pub cover: Option<String>,
}

/// Whole shared document of one session. The last accepted write replaces it entirely.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SessionDocument {
    /// Participants, in join order.
    #[serde(default)]
    pub users: Vec<User>,
    /// Candidate games, in insertion order.
    #[serde(default)]
    pub games: Vec<Game>,
}

/// A session document together with its store metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Full session identifier.
    pub id: String,
    /// Shared document.
    pub document: SessionDocument,
    /// Freshness timestamp (epoch milliseconds) assigned by the store on the last write.
    pub last_active_ms: i64,
}

/// Rejection produced by a document edit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    /// The referenced game is not on the list.
    #[error("game `{0}` is not part of the session")]
    UnknownGame(GameId),
    /// A game with the same id is already on the list.
    #[error("game `{0}` is already on the list")]
    DuplicateGame(GameId),
    /// The referenced user is not part of the session.
    #[error("user `{0}` is not part of the session")]
    UnknownUser(UserId),
    /// A user with the same id already exists.
    #[error("user `{0}` already exists")]
    DuplicateUser(UserId),
    /// A required text field was blank.
    #[error("{0} must not be empty")]
    Blank(&'static str),
}

impl SessionDocument {
    /// Look a user up by id.
    pub fn find_user(&self, user_id: &str) -> Option<&User> {
        self.users.iter().find(|user| user.id == user_id)
    }

    /// Look a user up by display name (exact match after trimming).
    pub fn find_user_by_name(&self, name: &str) -> Option<&User> {
        let name = name.trim();
        self.users.iter().find(|user| user.name == name)
    }

    /// Look a game up by id.
    pub fn find_game(&self, game_id: &str) -> Option<&Game> {
        self.games.iter().find(|game| game.id == game_id)
    }

    /// Games that still compete for votes, in list order.
    pub fn active_games(&self) -> impl Iterator<Item = &Game> {
        self.games.iter().filter(|game| game.is_active())
    }

    /// First palette entry no user of the session wears yet.
    pub fn first_unused_color<'a>(&self, palette: &'a [String]) -> Option<&'a String> {
        palette
            .iter()
            .find(|candidate| self.users.iter().all(|user| &user.color != *candidate))
    }

    /// Append a new participant.
    pub fn with_user(&self, user: User) -> Result<Self, EditError> {
        if user.name.trim().is_empty() {
            return Err(EditError::Blank("user name"));
        }
        if self.find_user(&user.id).is_some() {
            return Err(EditError::DuplicateUser(user.id));
        }

        let mut next = self.clone();
        next.users.push(User {
            name: user.name.trim().to_owned(),
            ..user
        });
        Ok(next)
    }

    /// Drop a participant and every vote they cast.
    ///
    /// Votes are stripped even when the user entry is already gone, so stale ids left behind by
    /// an earlier overwrite are cleaned up as well.
    pub fn without_user(&self, user_id: &str) -> Self {
        let mut next = self.clone();
        next.users.retain(|user| user.id != user_id);
        for game in &mut next.games {
            game.votes.retain(|vote| vote != user_id);
        }
        next
    }

    /// Append a catalog entry to the list on behalf of `added_by`.
    pub fn with_game(&self, game: NewGame, added_by: &User) -> Result<Self, EditError> {
        if game.id.trim().is_empty() {
            return Err(EditError::Blank("game id"));
        }
        if game.title.trim().is_empty() {
            return Err(EditError::Blank("game title"));
        }
        if self.find_game(&game.id).is_some() {
            return Err(EditError::DuplicateGame(game.id));
        }

        let mut next = self.clone();
        next.games.push(Game {
            id: game.id,
            title: game.title,
            cover: game.cover,
            added_by: added_by.name.clone(),
            votes: Vec::new(),
            status: GameStatus::Active,
        });
        Ok(next)
    }

    /// Remove a game from the list.
    pub fn without_game(&self, game_id: &str) -> Result<Self, EditError> {
        self.ensure_game(game_id)?;
        let mut next = self.clone();
        next.games.retain(|game| game.id != game_id);
        Ok(next)
    }

    /// Add the user's vote to the game, or take it back when already cast.
    ///
    /// Casting requires the user to be part of the session; withdrawing does not, so stale votes
    /// can always be removed.
    pub fn with_vote_toggled(&self, game_id: &str, user_id: &str) -> Result<Self, EditError> {
        let game = self.ensure_game(game_id)?;
        let casting = !game.has_vote_from(user_id);
        if casting && self.find_user(user_id).is_none() {
            return Err(EditError::UnknownUser(user_id.to_owned()));
        }

        Ok(self.map_game(game_id, |game| {
            if casting {
                game.votes.push(user_id.to_owned());
            } else {
                game.votes.retain(|vote| vote != user_id);
            }
        }))
    }

    /// Flip a game between active and played.
    pub fn with_status_toggled(&self, game_id: &str) -> Result<Self, EditError> {
        self.ensure_game(game_id)?;
        Ok(self.map_game(game_id, |game| game.status = game.status.toggled()))
    }

    /// Force a game into the given status.
    pub fn with_status(&self, game_id: &str, status: GameStatus) -> Result<Self, EditError> {
        self.ensure_game(game_id)?;
        Ok(self.map_game(game_id, |game| game.status = status))
    }

    fn ensure_game(&self, game_id: &str) -> Result<&Game, EditError> {
        self.find_game(game_id)
            .ok_or_else(|| EditError::UnknownGame(game_id.to_owned()))
    }

    fn map_game(&self, game_id: &str, edit: impl FnOnce(&mut Game)) -> Self {
        let mut next = self.clone();
        if let Some(game) = next.games.iter_mut().find(|game| game.id == game_id) {
            edit(game);
        }
        next
    }
}

/// Accept catalog ids stored either as JSON strings or numbers.
fn catalog_id<'de, D>(deserializer: D) -> Result<GameId, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Unsigned(u64),
        Signed(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(value) => value,
        RawId::Unsigned(value) => value.to_string(),
        RawId::Signed(value) => value.to_string(),
    })
}
