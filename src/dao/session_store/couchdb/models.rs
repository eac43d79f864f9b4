use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::CouchDaoError;
use crate::dao::models::SessionEntity;

pub const SESSION_PREFIX: &str = "session::";
pub const END_SUFFIX: &str = "\u{ffff}";

#[derive(Debug, Deserialize)]
pub struct AllDocsResponse {
    pub rows: Vec<AllDocsRow>,
}

#[derive(Debug, Deserialize)]
pub struct AllDocsRow {
    #[serde(default)]
    pub doc: Option<Value>,
}

/// Session row stored as a single CouchDB document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchSessionDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    pub data: Value,
    pub last_active: i64,
}

impl From<(SessionEntity, Option<String>)> for CouchSessionDocument {
    fn from((session, rev): (SessionEntity, Option<String>)) -> Self {
        Self {
            id: session_doc_id(&session.id),
            rev,
            data: session.data,
            last_active: session.last_active_ms,
        }
    }
}

impl TryFrom<CouchSessionDocument> for SessionEntity {
    type Error = CouchDaoError;

    fn try_from(doc: CouchSessionDocument) -> Result<Self, Self::Error> {
        let id = doc
            .id
            .strip_prefix(SESSION_PREFIX)
            .ok_or_else(|| CouchDaoError::InvalidDocId {
                doc_id: doc.id.clone(),
            })?
            .to_owned();

        Ok(Self {
            id,
            data: doc.data,
            last_active_ms: doc.last_active,
        })
    }
}

/// Tombstone posted through `_bulk_docs` to delete a revision.
#[derive(Debug, Serialize)]
pub struct DeletedDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev")]
    pub rev: String,
    #[serde(rename = "_deleted")]
    pub deleted: bool,
}

#[derive(Debug, Serialize)]
pub struct BulkDocsRequest {
    pub docs: Vec<DeletedDocument>,
}

#[derive(Debug, Deserialize)]
pub struct BulkDocsResult {
    #[serde(default)]
    pub ok: bool,
}

pub fn session_doc_id(id: &str) -> String {
    format!("{}{}", SESSION_PREFIX, id)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn document_ids_round_trip_through_the_prefix() {
        let entity = SessionEntity {
            id: "k3j9x0aa1234".into(),
            data: json!({"users": [], "games": []}),
            last_active_ms: 42,
        };
        let doc = CouchSessionDocument::from((entity.clone(), Some("1-abc".into())));
        assert_eq!(doc.id, "session::k3j9x0aa1234");

        let encoded = serde_json::to_value(&doc).unwrap();
        assert_eq!(encoded["_rev"], "1-abc");
        assert_eq!(encoded["last_active"], 42);

        assert_eq!(SessionEntity::try_from(doc).unwrap(), entity);
    }

    #[test]
    fn foreign_documents_are_rejected() {
        let doc = CouchSessionDocument {
            id: "_design/sessions".into(),
            rev: None,
            data: json!({}),
            last_active: 0,
        };
        assert!(matches!(
            SessionEntity::try_from(doc),
            Err(CouchDaoError::InvalidDocId { .. })
        ));
    }
}
