//! Database layer for messenger-auth
//!
//! This module defines the database trait and SQLite implementation.

pub mod migrations;
pub mod sqlite;

pub use sqlite::SqliteDatabase;

use async_trait::async_trait;

use crate::error::DbError;
use crate::models::{AuthProvider, Session, User};

/// Database trait for data persistence
///
/// This trait defines all database operations needed by the application.
/// It uses `async_trait` for async methods and `mockall::automock` for testing.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Database: Send + Sync {
    // =========================================================================
    // User operations
    // =========================================================================

    /// Insert a new user record
    ///
    /// Fails with `DbError::ConstraintViolation` if the email or the
    /// (provider, provider_id) pair is already taken.
    async fn create_user(&self, user: &User) -> Result<(), DbError>;

    /// Look up a user by login identifier
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, DbError>;

    /// Look up a user by id
    async fn get_user_by_id(&self, id: &str) -> Result<Option<User>, DbError>;

    /// Look up a user by provider identity
    async fn get_user_by_provider(
        &self,
        provider: AuthProvider,
        provider_id: &str,
    ) -> Result<Option<User>, DbError>;

    /// Insert or refresh an OAuth user keyed on (provider, provider_id)
    ///
    /// Returning users get their email and display name refreshed from the
    /// latest assertion. Returns the stored record.
    async fn upsert_oauth_user(&self, user: &User) -> Result<User, DbError>;

    /// Delete a user account; their sessions go with them
    async fn delete_user(&self, id: &str) -> Result<(), DbError>;

    // =========================================================================
    // Session operations
    // =========================================================================

    /// Insert a new session record
    async fn insert_session(&self, session: &Session) -> Result<(), DbError>;

    /// Get a session by the digest of its token
    async fn get_session_by_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<Session>, DbError>;

    /// Mark a session revoked
    async fn revoke_session(&self, token_hash: &str) -> Result<(), DbError>;

    /// Delete a session record
    async fn delete_session(&self, token_hash: &str) -> Result<(), DbError>;

    /// Delete all sessions past their expiry
    ///
    /// Returns the number of deleted records
    async fn delete_expired_sessions(&self) -> Result<u64, DbError>;

    /// Count live session records for a user
    async fn count_sessions_for_user(&self, user_id: &str) -> Result<u64, DbError>;
}
