//! Password hashing and username validation for account endpoints.

/// Bcrypt work factor. Matches the cost the service has always used, so
/// existing hashes keep verifying.
const BCRYPT_COST: u32 = 10;

/// Usernames are 3-15 chars of [A-Za-z0-9_-].
pub fn validate_username(username: &str) -> Option<&str> {
    let len = username.chars().count();
    if !(3..=15).contains(&len) {
        return None;
    }
    if username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        Some(username)
    } else {
        None
    }
}

pub fn hash_password(password: &str) -> Result<String, String> {
    bcrypt::hash(password, BCRYPT_COST).map_err(|e| format!("Password hashing failed: {}", e))
}

/// Compare a candidate password against a stored bcrypt hash.
/// A malformed stored hash verifies as false rather than erroring out —
/// the caller reports "username or password incorrect" either way.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    bcrypt::verify(password, stored_hash).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_rules() {
        assert!(validate_username("abc").is_some());
        assert!(validate_username("player_one-2").is_some());
        assert!(validate_username("ab").is_none());
        assert!(validate_username("a_very_long_username").is_none());
        assert!(validate_username("bad space").is_none());
        assert!(validate_username("semi;colon").is_none());
    }

    #[test]
    fn test_hash_and_verify_roundtrip() {
        let hash = hash_password("hunter2").unwrap();
        assert!(verify_password("hunter2", &hash));
        assert!(!verify_password("hunter3", &hash));
    }

    #[test]
    fn test_malformed_hash_rejects() {
        assert!(!verify_password("anything", "not-a-bcrypt-hash"));
    }
}
