//! Validation helpers for DTOs.

use std::collections::HashSet;

use validator::ValidationError;

/// Longest identifier accepted in a session path segment.
const MAX_SESSION_ID_LENGTH: usize = 64;

/// Validates that a session id (full or short prefix) is non-empty lowercase base-36.
///
/// # Examples
///
/// ```ignore
/// validate_session_id("k3j9x0aa")     // Ok
/// validate_session_id("K3J9X0AA")     // Err - uppercase
/// validate_session_id("")             // Err - empty
/// ```
pub fn validate_session_id(id: &str) -> Result<(), ValidationError> {
    if id.is_empty() || id.len() > MAX_SESSION_ID_LENGTH {
        let mut err = ValidationError::new("session_id_length");
        err.message = Some(
            format!(
                "Session ID must be between 1 and {MAX_SESSION_ID_LENGTH} characters (got {})",
                id.len()
            )
            .into(),
        );
        return Err(err);
    }

    if !crate::state::ids::is_base36(id) {
        let mut err = ValidationError::new("session_id_format");
        err.message = Some("Session ID must contain only lowercase base-36 characters".into());
        return Err(err);
    }

    Ok(())
}

/// Validates that a display name is not blank once trimmed.
pub fn validate_display_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        let mut err = ValidationError::new("blank_name");
        err.message = Some("Name must not be empty".into());
        return Err(err);
    }
    Ok(())
}

/// Validates that no identifier appears twice.
pub fn validate_unique<'a>(
    ids: impl IntoIterator<Item = &'a str>,
    code: &'static str,
) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    match ids.into_iter().find(|id| !seen.insert(*id)) {
        Some(duplicate) => {
            let mut err = ValidationError::new(code);
            err.message = Some(format!("`{duplicate}` appears more than once").into());
            Err(err)
        }
        None => Ok(()),
    }
}
