//! Session token generation and digesting
//!
//! This module provides functions for generating opaque session tokens and
//! user ids, and for computing the digest under which a token is stored.
//! Tokens use the `ms_` prefix followed by 32 bytes of random data encoded
//! in URL-safe Base64; only the SHA-256 digest of a token is ever persisted.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

/// Token prefix for messenger-auth session tokens
pub const SESSION_TOKEN_PREFIX: &str = "ms_";

/// Length of the random part of the token in bytes
const TOKEN_RANDOM_BYTES: usize = 32;

/// Length of a user id in bytes before encoding
const USER_ID_BYTES: usize = 16;

/// Generate a new opaque session token
///
/// The token format is: `ms_` + Base64-encoded 32 random bytes.
/// The raw token is shown to the client only once at login time; the store
/// keeps the digest from [`token_digest`].
///
/// # Example
///
/// ```
/// use messenger_auth::auth::token::generate_session_token;
///
/// let token = generate_session_token();
/// assert!(token.starts_with("ms_"));
/// ```
pub fn generate_session_token() -> String {
    let mut random_bytes = [0u8; TOKEN_RANDOM_BYTES];
    getrandom(&mut random_bytes);

    format!("{}{}", SESSION_TOKEN_PREFIX, URL_SAFE_NO_PAD.encode(random_bytes))
}

/// Generate a new opaque user id
pub fn generate_user_id() -> String {
    let mut id_bytes = [0u8; USER_ID_BYTES];
    getrandom(&mut id_bytes);

    URL_SAFE_NO_PAD.encode(id_bytes)
}

/// Fill a byte slice with random bytes using OsRng
fn getrandom(dest: &mut [u8]) {
    use rand::RngCore;
    OsRng.fill_bytes(dest);
}

/// Compute the stored digest of a session token
///
/// SHA-256 over the raw token, hex encoded. The digest is deterministic so
/// a presented token can be looked up directly; the underlying randomness
/// of the token is what makes it unforgeable.
pub fn token_digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Check if a token has the correct format
///
/// Valid tokens start with `ms_` and have a URL-safe Base64 body.
pub fn is_valid_token_format(token: &str) -> bool {
    if !token.starts_with(SESSION_TOKEN_PREFIX) {
        return false;
    }

    let body = &token[SESSION_TOKEN_PREFIX.len()..];
    if body.is_empty() {
        return false;
    }

    URL_SAFE_NO_PAD.decode(body).is_ok()
}
