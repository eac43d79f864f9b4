use serde::Serialize;
use utoipa::ToSchema;

/// Outcome of a retention sweep.
#[derive(Debug, Serialize, ToSchema)]
pub struct CleanupResponse {
    pub success: bool,
    /// Number of sessions removed.
    pub deleted: u64,
}
