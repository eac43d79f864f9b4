use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One persisted session row: primary key, opaque JSON document and freshness timestamp.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionEntity {
    /// Full session identifier.
    pub id: String,
    /// Session document as written by the last client (`{users, games}`).
    pub data: Value,
    /// Last write time, in milliseconds since the Unix epoch.
    pub last_active_ms: i64,
}

impl SessionEntity {
    /// Build an entity stamped with the current time.
    pub fn fresh(id: impl Into<String>, data: Value) -> Self {
        Self {
            id: id.into(),
            data,
            last_active_ms: epoch_millis(SystemTime::now()),
        }
    }
}

/// Milliseconds since the Unix epoch, saturating for times before it.
pub fn epoch_millis(time: SystemTime) -> i64 {
    time.duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
