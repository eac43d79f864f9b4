//! Retention sweep deleting sessions nobody touched for a while.

use std::time::{Duration, SystemTime};

use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use crate::{
    dao::models::epoch_millis,
    error::ServiceError,
    state::SharedState,
};

/// Freshness cutoff for a sweep running at `now`.
pub fn cutoff_ms(now: SystemTime, retention: Duration) -> i64 {
    let retention_ms = i64::try_from(retention.as_millis()).unwrap_or(i64::MAX);
    epoch_millis(now).saturating_sub(retention_ms)
}

/// Whether the `Authorization` header carries the configured cleanup secret.
///
/// Every request is accepted when no secret is configured.
pub fn authorize_cleanup(
    state: &SharedState,
    authorization: Option<&str>,
) -> Result<(), ServiceError> {
    let Some(secret) = state.config().cron_secret() else {
        return Ok(());
    };

    match authorization.and_then(|value| value.strip_prefix("Bearer ")) {
        Some(token) if token == secret => Ok(()),
        Some(_) => Err(ServiceError::Unauthorized("invalid cleanup secret".into())),
        None => Err(ServiceError::Unauthorized(
            "missing `Authorization: Bearer` header".into(),
        )),
    }
}

/// Delete every session older than the configured retention window.
pub async fn purge_stale_sessions(state: &SharedState) -> Result<u64, ServiceError> {
    let store = state.require_session_store().await?;
    let cutoff = cutoff_ms(SystemTime::now(), state.config().retention());
    let deleted = store.purge_stale(cutoff).await?;
    info!(deleted, cutoff_ms = cutoff, "retention sweep finished");
    Ok(deleted)
}

/// Run the retention sweep periodically for the lifetime of the process.
pub async fn run(state: SharedState, period: Duration) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        if state.is_degraded() {
            debug!("skipping retention sweep while storage is unavailable");
            continue;
        }
        if let Err(err) = purge_stale_sessions(&state).await {
            warn!(error = %err, "retention sweep failed");
        }
    }
}
