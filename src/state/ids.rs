//! Base-36 identifiers for sessions and users.

use rand::Rng;
use uuid::Uuid;

/// Length of a full session identifier.
pub const SESSION_ID_LENGTH: usize = 12;
/// Length of the human-friendly prefix shown to participants.
pub const SHORT_ID_LENGTH: usize = 8;
/// Length of a user identifier.
pub const USER_ID_LENGTH: usize = 8;

const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Generate a fresh session identifier from a random UUID.
pub fn new_session_id() -> String {
    let mut value = Uuid::new_v4().as_u128();
    let mut id = String::with_capacity(SESSION_ID_LENGTH);
    while id.len() < SESSION_ID_LENGTH {
        id.push(ALPHABET[(value % 36) as usize] as char);
        value /= 36;
    }
    id
}

/// Generate a user identifier, unique enough within one session.
pub fn new_user_id() -> String {
    let mut rng = rand::rng();
    (0..USER_ID_LENGTH)
        .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
        .collect()
}

/// Short id displayed for a full session identifier.
pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(SHORT_ID_LENGTH) {
        Some((end, _)) => &id[..end],
        None => id,
    }
}

/// Whether the value only contains lowercase base-36 characters.
pub fn is_base36(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|byte| ALPHABET.contains(&byte))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_ids_are_base36_and_distinct() {
        let first = new_session_id();
        let second = new_session_id();
        assert_eq!(first.len(), SESSION_ID_LENGTH);
        assert!(is_base36(&first));
        assert_ne!(first, second);
    }

    #[test]
    fn user_ids_have_fixed_length() {
        let id = new_user_id();
        assert_eq!(id.len(), USER_ID_LENGTH);
        assert!(is_base36(&id));
    }

    #[test]
    fn short_id_is_a_prefix() {
        let id = new_session_id();
        assert!(id.starts_with(short_id(&id)));
        assert_eq!(short_id(&id).len(), SHORT_ID_LENGTH);
        assert_eq!(short_id("abc"), "abc");
    }

    #[test]
    fn base36_check_rejects_other_characters() {
        assert!(is_base36("k3j9x0aa"));
        assert!(!is_base36("K3J9"));
        assert!(!is_base36("ab-cd"));
        assert!(!is_base36(""));
    }
}
