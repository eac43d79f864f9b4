/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Retention sweep over inactive sessions.
pub mod retention;
/// Cached catalog search.
pub mod search_service;
/// Session creation, lookup, overwrite and server-side draws.
pub mod session_service;
/// Storage connection supervisor toggling degraded mode.
pub mod storage_supervisor;
