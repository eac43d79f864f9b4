use mongodb::bson::{Document, doc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dao::models::SessionEntity;

/// Session row as stored in the `sessions` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoSessionDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub data: Value,
    pub last_active: i64,
}

impl From<SessionEntity> for MongoSessionDocument {
    fn from(value: SessionEntity) -> Self {
        Self {
            id: value.id,
            data: value.data,
            last_active: value.last_active_ms,
        }
    }
}

impl From<MongoSessionDocument> for SessionEntity {
    fn from(value: MongoSessionDocument) -> Self {
        Self {
            id: value.id,
            data: value.data,
            last_active_ms: value.last_active,
        }
    }
}

pub fn doc_id(id: &str) -> Document {
    doc! {"_id": id}
}

/// Range over every `_id` starting with `prefix`.
pub fn prefix_filter(prefix: &str) -> Document {
    doc! {"_id": {"$gte": prefix, "$lt": format!("{prefix}\u{ffff}")}}
}

pub fn stale_filter(cutoff_ms: i64) -> Document {
    doc! {"last_active": {"$lt": cutoff_ms}}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_filter_is_a_half_open_range() {
        let filter = prefix_filter("k3j9x0aa");
        let range = filter.get_document("_id").unwrap();
        assert_eq!(range.get_str("$gte").unwrap(), "k3j9x0aa");
        assert_eq!(range.get_str("$lt").unwrap(), "k3j9x0aa\u{ffff}");
    }

    #[test]
    fn stale_filter_targets_last_active() {
        let filter = stale_filter(1_000);
        let range = filter.get_document("last_active").unwrap();
        assert_eq!(range.get_i64("$lt").unwrap(), 1_000);
    }
}
