//! Password hashing and verification.

use crate::errors::Error;

/// Hash a password using bcrypt with the given work factor.
///
/// Hashing is CPU-bound; handlers run this on `tokio::task::spawn_blocking`.
pub fn hash_password(password: &str, cost: u32) -> Result<String, Error> {
    bcrypt::hash(password, cost).map_err(|e| Error::Internal {
        operation: format!("hash password: {e}"),
    })
}

/// Verify a password against a bcrypt hash.
///
/// Note: Verification uses the cost embedded in the hash itself.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, Error> {
    bcrypt::verify(password, hash).map_err(|e| Error::Internal {
        operation: format!("verify password: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // Minimum cost keeps the tests fast; production cost comes from config
    const TEST_COST: u32 = 4;

    #[test]
    fn test_password_hashing() {
        let password = "test_password_123";
        let hash = hash_password(password, TEST_COST).unwrap();

        // Hash should not be empty and should not contain the plaintext
        assert!(!hash.is_empty());
        assert!(!hash.contains(password));

        // Should verify correctly
        assert!(verify_password(password, &hash).unwrap());

        // Should fail with wrong password
        assert!(!verify_password("wrong_password", &hash).unwrap());
    }

    #[test]
    fn test_same_password_different_hashes() {
        let password = "same_password";

        let hash1 = hash_password(password, TEST_COST).unwrap();
        let hash2 = hash_password(password, TEST_COST).unwrap();

        // Same input should produce different hashes due to salt
        assert_ne!(hash1, hash2);

        // But both should verify correctly
        assert!(verify_password(password, &hash1).unwrap());
        assert!(verify_password(password, &hash2).unwrap());
    }

    #[test]
    fn test_verify_garbage_hash_is_internal_error() {
        let result = verify_password("password", "not-a-bcrypt-hash");
        assert!(matches!(result, Err(Error::Internal { .. })));
    }
}
