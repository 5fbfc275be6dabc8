//! Session domain model
//!
//! A session is created on successful login and never mutated afterwards,
//! except for the single transition into the revoked state. The raw token is
//! handed to the client exactly once; only its digest is stored.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::user::PublicUser;

/// Session record stored in the database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// SHA-256 hex digest of the raw session token
    pub token_hash: String,

    /// Owning user id (non-owning reference)
    pub user_id: String,

    /// When the session was issued
    pub created_at: DateTime<Utc>,

    /// When the session stops being valid
    pub expires_at: DateTime<Utc>,

    /// When the session was revoked by logout (None while active)
    pub revoked_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Create a new session with a fixed time-to-live
    pub fn new(token_hash: impl Into<String>, user_id: impl Into<String>, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            token_hash: token_hash.into(),
            user_id: user_id.into(),
            created_at: now,
            expires_at: now + ttl,
            revoked_at: None,
        }
    }

    /// State of the session at the given instant
    ///
    /// Revocation wins over expiry; both states are terminal.
    pub fn state(&self, now: DateTime<Utc>) -> SessionState {
        if self.revoked_at.is_some() {
            SessionState::Revoked
        } else if now >= self.expires_at {
            SessionState::Expired
        } else {
            SessionState::Active
        }
    }

    /// Whether the session is valid at the given instant
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.state(now) == SessionState::Active
    }
}

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Issued, before expiry, not revoked
    Active,
    /// Time-to-live elapsed
    Expired,
    /// Explicitly logged out
    Revoked,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Active => write!(f, "active"),
            SessionState::Expired => write!(f, "expired"),
            SessionState::Revoked => write!(f, "revoked"),
        }
    }
}

/// Response returned on successful login (credential or OAuth)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    /// Raw bearer token, shown to the client only this once
    pub token: String,

    /// When the session expires
    pub expires_at: DateTime<Utc>,

    /// Authenticated user
    pub user: PublicUser,
}
