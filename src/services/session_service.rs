//! Session use cases behind the REST routes: creation, lookup by full or short id, whole-document
//! overwrite, and the server-side tie-break helpers.

use rand::rng;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
    dao::{models::SessionEntity, storage::StorageError},
    dto::validation::validate_session_id,
    error::ServiceError,
    state::{
        SharedState,
        ids::{SHORT_ID_LENGTH, new_session_id},
        session::{Session, SessionDocument},
        spin::{SpinConfig, SpinDraw, SpinPlan, plan_seeded, plan_spin},
        tiebreak::{NotApplicable, TieBreakPool, select_pool},
    },
};

/// Attempts at drawing an unused session id before giving up.
const CREATE_ATTEMPTS: u32 = 5;

/// Decode a stored row into a session.
pub fn decode_session(entity: SessionEntity) -> Result<Session, serde_json::Error> {
    let document = serde_json::from_value::<SessionDocument>(entity.data)?;
    Ok(Session {
        id: entity.id,
        document,
        last_active_ms: entity.last_active_ms,
    })
}

/// Encode a document for storage, stamped with the current time.
pub fn encode_session(id: &str, document: &SessionDocument) -> Result<SessionEntity, ServiceError> {
    let data = serde_json::to_value(document)
        .map_err(|err| ServiceError::InvalidInput(format!("unserializable document: {err}")))?;
    Ok(SessionEntity::fresh(id, data))
}

fn ensure_valid_id(id: &str) -> Result<(), ServiceError> {
    validate_session_id(id).map_err(|err| {
        ServiceError::InvalidInput(
            err.message
                .map(|message| message.into_owned())
                .unwrap_or_else(|| "invalid session id".into()),
        )
    })
}

/// Create an empty session under a fresh identifier.
pub async fn create_session(state: &SharedState) -> Result<String, ServiceError> {
    let store = state.require_session_store().await?;
    let data = serde_json::to_value(SessionDocument::default()).unwrap_or(Value::Null);

    for attempt in 1..=CREATE_ATTEMPTS {
        let id = new_session_id();
        match store.create(SessionEntity::fresh(&id, data.clone())).await {
            Ok(()) => {
                info!(session_id = %id, "session created");
                return Ok(id);
            }
            Err(StorageError::Conflict { .. }) => {
                warn!(session_id = %id, attempt, "session id collision; drawing another")
            }
            Err(err) => return Err(err.into()),
        }
    }

    Err(ServiceError::Conflict(
        "could not allocate an unused session id".into(),
    ))
}

/// Find a session by full id, falling back to a short-id prefix match unless `exact` is set.
pub async fn load_session(
    state: &SharedState,
    id: &str,
    exact: bool,
) -> Result<Session, ServiceError> {
    ensure_valid_id(id)?;
    let store = state.require_session_store().await?;

    let mut entity = store.find_exact(id.to_owned()).await?;
    if entity.is_none() && !exact && id.len() >= SHORT_ID_LENGTH {
        entity = store.find_by_prefix(id.to_owned()).await?;
        if let Some(found) = &entity {
            debug!(prefix = %id, session_id = %found.id, "resolved session by short id");
        }
    }

    let Some(entity) = entity else {
        return Err(ServiceError::NotFound(format!("session `{id}` not found")));
    };

    let session_id = entity.id.clone();
    decode_session(entity).map_err(|err| {
        warn!(session_id = %session_id, error = %err, "stored session document is unreadable");
        ServiceError::NotFound(format!("session `{session_id}` is unreadable"))
    })
}

/// Overwrite the whole document of an existing session. Last writer wins.
pub async fn save_session(
    state: &SharedState,
    id: &str,
    document: SessionDocument,
) -> Result<(), ServiceError> {
    ensure_valid_id(id)?;
    let store = state.require_session_store().await?;
    let entity = encode_session(id, &document)?;
    store.update(entity).await?;
    debug!(
        session_id = %id,
        users = document.users.len(),
        games = document.games.len(),
        "session document overwritten"
    );
    Ok(())
}

/// Tie-break selection over the stored document.
pub async fn tiebreak(
    state: &SharedState,
    id: &str,
) -> Result<Result<TieBreakPool, NotApplicable>, ServiceError> {
    let session = load_session(state, id, false).await?;
    Ok(select_pool(&session.document.games))
}

/// Resolve a draw over the session's current tie-break pool.
pub async fn spin(
    state: &SharedState,
    id: &str,
    seed: Option<u64>,
    start_rotation: f64,
) -> Result<(TieBreakPool, SpinPlan), ServiceError> {
    let pool = tiebreak(state, id)
        .await?
        .map_err(|reason| ServiceError::InvalidState(reason.to_string()))?;

    let config = SpinConfig::default();
    let plan = match seed {
        Some(seed) => plan_seeded(seed, pool.size(), start_rotation, &config)?,
        None => {
            let draw = SpinDraw::sample(&mut rng(), &config);
            plan_spin(draw, pool.size(), start_rotation, &config)?
        }
    };

    info!(
        session_id = %id,
        spin_id = %plan.id,
        pool = pool.size(),
        long_run = plan.draw.long_run,
        winner_index = plan.winner_index,
        "tie-break spin resolved"
    );
    Ok((pool, plan))
}
