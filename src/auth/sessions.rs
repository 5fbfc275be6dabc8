//! Session issuance and verification
//!
//! The session verifier owns the lifecycle of session records: it issues a
//! cryptographically random bearer token bound to a user with a fixed
//! time-to-live, verifies presented tokens, and revokes them on logout.
//! Expired sessions are lazily evicted when presented; a periodic sweep
//! removes the rest.

use std::sync::Arc;

use chrono::{Duration, Utc};

use super::token::{generate_session_token, is_valid_token_format, token_digest};
use crate::database::Database;
use crate::error::SessionError;
use crate::models::Session;

/// Issues and verifies session tokens
pub struct SessionVerifier<D: Database> {
    db: Arc<D>,
    ttl: Duration,
}

impl<D: Database> SessionVerifier<D> {
    /// Create a new session verifier with the given time-to-live
    pub fn new(db: Arc<D>, ttl_secs: u64) -> Self {
        Self {
            db,
            ttl: Duration::seconds(ttl_secs as i64),
        }
    }

    /// Session time-to-live
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a new session for a user
    ///
    /// Returns the raw bearer token and the stored session record. The raw
    /// token is not recoverable afterwards; only its digest is persisted.
    pub async fn issue(&self, user_id: &str) -> Result<(String, Session), SessionError> {
        let raw_token = generate_session_token();
        let session = Session::new(token_digest(&raw_token), user_id, self.ttl);

        self.db
            .insert_session(&session)
            .await
            .map_err(|_| SessionError::Unavailable)?;

        Ok((raw_token, session))
    }

    /// Verify a presented token and return the owning user id
    ///
    /// Revoked and unknown tokens are indistinguishable to the caller.
    /// An expired session is evicted on the spot.
    pub async fn verify(&self, token: &str) -> Result<String, SessionError> {
        if !is_valid_token_format(token) {
            return Err(SessionError::Invalid);
        }

        let digest = token_digest(token);
        let session = self
            .db
            .get_session_by_token_hash(&digest)
            .await
            .map_err(|_| SessionError::Unavailable)?
            .ok_or(SessionError::Invalid)?;

        match session.state(Utc::now()) {
            crate::models::SessionState::Active => Ok(session.user_id),
            crate::models::SessionState::Revoked => Err(SessionError::Invalid),
            crate::models::SessionState::Expired => {
                // Lazy eviction; the periodic sweep catches the rest
                let _ = self.db.delete_session(&digest).await;
                Err(SessionError::Expired)
            }
        }
    }

    /// Revoke a session immediately (logout)
    pub async fn revoke(&self, token: &str) -> Result<(), SessionError> {
        if !is_valid_token_format(token) {
            return Err(SessionError::Invalid);
        }

        match self.db.revoke_session(&token_digest(token)).await {
            Ok(()) => Ok(()),
            Err(crate::error::DbError::NotFound) => Err(SessionError::Invalid),
            Err(_) => Err(SessionError::Unavailable),
        }
    }

    /// Remove all sessions past their expiry
    ///
    /// Returns the number of removed records
    pub async fn sweep_expired(&self) -> Result<u64, SessionError> {
        self.db
            .delete_expired_sessions()
            .await
            .map_err(|_| SessionError::Unavailable)
    }
}

impl<D: Database> Clone for SessionVerifier<D> {
    fn clone(&self) -> Self {
        Self {
            db: Arc::clone(&self.db),
            ttl: self.ttl,
        }
    }
}
