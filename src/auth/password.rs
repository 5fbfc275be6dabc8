//! Password hashing and verification
//!
//! This module provides the slow, salted one-way hashing used for user
//! secrets. Hashes are Argon2id in PHC string format; the plaintext never
//! survives past the call boundary.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use thiserror::Error;

/// Hash a password using Argon2id
///
/// A random salt is generated per call, so hashing the same password twice
/// yields different strings.
///
/// # Errors
///
/// Returns an error if hashing fails (should not happen in normal operation)
///
/// # Example
///
/// ```
/// use messenger_auth::auth::password::hash_password;
///
/// let hash = hash_password("hunter2hunter2").unwrap();
/// assert!(hash.starts_with("$argon2id$"));
/// ```
pub fn hash_password(password: &str) -> Result<String, HashError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| HashError::HashFailed(e.to_string()))
}

/// Verify a password against a stored Argon2id hash
///
/// Returns `false` on mismatch and on malformed stored hashes; the caller
/// cannot distinguish the two, matching the unified login failure.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Error type for password hashing operations
#[derive(Debug, Error, Clone, PartialEq)]
pub enum HashError {
    /// Hashing failed
    #[error("Hash failed: {0}")]
    HashFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    // Test 1: hash_password produces an argon2id hash
    #[test]
    fn test_hash_password_argon2id() {
        let hash = hash_password("correct horse battery staple").unwrap();
        assert!(
            hash.starts_with("$argon2id$"),
            "Hash should be in Argon2id format"
        );
    }

    // Test 2: same password hashes differently (random salt)
    #[test]
    fn test_hash_password_unique_salts() {
        let hash1 = hash_password("same password").unwrap();
        let hash2 = hash_password("same password").unwrap();

        assert_ne!(
            hash1, hash2,
            "Same password should produce different hashes due to different salts"
        );
    }

    // Test 3: hash never equals the plaintext
    #[test]
    fn test_hash_is_not_plaintext() {
        let hash = hash_password("my secret").unwrap();
        assert_ne!(hash, "my secret");
        assert!(!hash.contains("my secret"));
    }

    // Test 4: verify_password succeeds for a matching password
    #[test]
    fn test_verify_password_success() {
        let hash = hash_password("open sesame").unwrap();
        assert!(verify_password("open sesame", &hash));
    }

    // Test 5: verify_password fails for a wrong password
    #[test]
    fn test_verify_password_wrong() {
        let hash = hash_password("open sesame").unwrap();
        assert!(!verify_password("open says me", &hash));
    }

    // Test 6: verify_password fails for a malformed stored hash
    #[test]
    fn test_verify_password_invalid_hash() {
        assert!(!verify_password("anything", "not_a_phc_string"));
    }
}
