//! Who the local participant is, and how a shared link or the profile picker binds it.

use crate::{
    client::error::ClientError,
    config::FALLBACK_COLOR,
    state::{
        ids::new_user_id,
        session::{SessionDocument, User, UserId},
    },
};

/// Query parameter of a shared link carrying the user to log in as.
const JOIN_PARAM: &str = "u";

/// Identity sub-state of a loaded session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// Mutations are blocked until a profile is picked.
    NoUser,
    /// Edits are made on behalf of this user.
    Identified(User),
}

impl Identity {
    /// Bound user, if any.
    pub fn user(&self) -> Option<&User> {
        match self {
            Identity::NoUser => None,
            Identity::Identified(user) => Some(user),
        }
    }
}

/// User id carried by a shared link (`?u=<userId>`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinToken {
    user_id: UserId,
}

impl JoinToken {
    /// Token for a known user id; `None` when blank.
    pub fn new(user_id: impl Into<UserId>) -> Option<Self> {
        let user_id = user_id.into();
        let trimmed = user_id.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self {
            user_id: trimmed.to_owned(),
        })
    }

    /// Extract the token from a full URL or a bare query string.
    pub fn parse(link: &str) -> Option<Self> {
        let without_fragment = link.split('#').next().unwrap_or_default();
        let query = match without_fragment.split_once('?') {
            Some((_, query)) => query,
            None if without_fragment.contains('=') => without_fragment,
            None => return None,
        };

        query
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .find(|(key, _)| *key == JOIN_PARAM)
            .and_then(|(_, value)| Self::new(value))
    }

    /// User the link points at.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Identity the token resolves to against `document`.
    pub fn resolve(&self, document: &SessionDocument) -> Identity {
        match document.find_user(&self.user_id) {
            Some(user) => Identity::Identified(user.clone()),
            None => Identity::NoUser,
        }
    }
}

/// Choice made in the profile picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityChoice {
    /// Log in as an existing participant.
    Reclaim(UserId),
    /// Bind a known profile, appending it with its own id when the document lost it.
    Rejoin(User),
    /// Create a profile; a name already in use reclaims that user instead.
    Create {
        /// Display name.
        name: String,
        /// Color token; the first free palette entry when absent.
        color: Option<String>,
    },
}

/// Outcome of resolving a choice against the latest known document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIdentity {
    /// User to bind.
    pub user: User,
    /// Document to push when the user had to be appended.
    pub document: Option<SessionDocument>,
}

/// Resolve the picker choice. Only a brand-new profile produces a document to push.
pub fn resolve_identity(
    document: &SessionDocument,
    choice: IdentityChoice,
    palette: &[String],
) -> Result<ResolvedIdentity, ClientError> {
    match choice {
        IdentityChoice::Reclaim(user_id) => document
            .find_user(&user_id)
            .cloned()
            .map(|user| ResolvedIdentity {
                user,
                document: None,
            })
            .ok_or_else(|| ClientError::NotFound(format!("user `{user_id}` is not in the session"))),
        IdentityChoice::Rejoin(user) => match document.find_user(&user.id) {
            Some(existing) => Ok(ResolvedIdentity {
                user: existing.clone(),
                document: None,
            }),
            None => {
                let next = document.with_user(user)?;
                let user = next.users.last().cloned().ok_or_else(|| {
                    ClientError::Validation("user could not be appended".into())
                })?;
                Ok(ResolvedIdentity {
                    user,
                    document: Some(next),
                })
            }
        },
        IdentityChoice::Create { name, color } => {
            let name = name.trim();
            if name.is_empty() {
                return Err(ClientError::Validation("user name must not be empty".into()));
            }
            if let Some(existing) = document.find_user_by_name(name) {
                return Ok(ResolvedIdentity {
                    user: existing.clone(),
                    document: None,
                });
            }

            let color = color
                .filter(|color| !color.trim().is_empty())
                .or_else(|| document.first_unused_color(palette).cloned())
                .unwrap_or_else(|| FALLBACK_COLOR.to_owned());
            let user = User {
                id: new_user_id(),
                name: name.to_owned(),
                color,
            };
            let next = document.with_user(user.clone())?;
            Ok(ResolvedIdentity {
                user,
                document: Some(next),
            })
        }
    }
}

/// Identity to switch to after a pull replaced the document, if it changed.
///
/// An open identity picks up a pending join token once its user shows up. A bound identity follows
/// name or color changes of its entry; a bound user missing from the document stays bound and is
/// appended again by the next edit.
pub(crate) fn rebind(
    identity: &Identity,
    join: Option<&JoinToken>,
    document: &SessionDocument,
) -> Option<Identity> {
    match identity {
        Identity::NoUser => join
            .map(|token| token.resolve(document))
            .filter(|resolved| resolved.user().is_some()),
        Identity::Identified(user) => document
            .find_user(&user.id)
            .filter(|latest| *latest != user)
            .map(|latest| Identity::Identified(latest.clone())),
    }
}
