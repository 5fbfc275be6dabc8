//! Application error types for messenger-auth
//!
//! This module defines common error types used throughout the application.
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Authentication-related errors
///
/// Display strings double as the user-facing messages: login failures never
/// reveal whether the identifier or the secret was wrong.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AuthError {
    /// Malformed registration or login request
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Identifier already registered
    #[error("An account with this email already exists")]
    Conflict,

    /// Unknown identifier or secret mismatch, deliberately unified
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Rate limited due to too many failed attempts
    #[error("Rate limited: too many failed attempts")]
    RateLimited,

    /// Store or hashing failure; details go to the log, not the caller
    #[error("Something went wrong")]
    Internal,
}

/// Session verification errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SessionError {
    /// Session exists but its time-to-live has elapsed
    #[error("Session expired")]
    Expired,

    /// Unknown, malformed, or revoked session token
    #[error("Invalid session")]
    Invalid,

    /// Session store unreachable
    #[error("Session store unavailable")]
    Unavailable,
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DbError {
    /// SQLite error
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Connection worker error
    #[error("Database connection error: {0}")]
    Connection(String),

    /// Record not found
    #[error("Record not found")]
    NotFound,

    /// Uniqueness constraint violation
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Schema migration error
    #[error("Migration error: {0}")]
    Migration(String),
}

impl DbError {
    /// Whether this error is a uniqueness-constraint violation
    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, DbError::ConstraintViolation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Test 1: AuthError user-facing messages
    #[test]
    fn test_auth_error_messages() {
        assert_eq!(
            AuthError::InvalidInput("email is required".to_string()).to_string(),
            "Invalid input: email is required"
        );
        assert_eq!(
            AuthError::Conflict.to_string(),
            "An account with this email already exists"
        );
        assert_eq!(
            AuthError::InvalidCredentials.to_string(),
            "Invalid credentials"
        );
        assert_eq!(
            AuthError::RateLimited.to_string(),
            "Rate limited: too many failed attempts"
        );
        assert_eq!(AuthError::Internal.to_string(), "Something went wrong");
    }

    // Test 2: SessionError messages
    #[test]
    fn test_session_error_messages() {
        assert_eq!(SessionError::Expired.to_string(), "Session expired");
        assert_eq!(SessionError::Invalid.to_string(), "Invalid session");
        assert_eq!(
            SessionError::Unavailable.to_string(),
            "Session store unavailable"
        );
    }

    // Test 3: DbError messages
    #[test]
    fn test_db_error_messages() {
        assert_eq!(DbError::NotFound.to_string(), "Record not found");
        assert_eq!(
            DbError::ConstraintViolation("users.email".to_string()).to_string(),
            "Constraint violation: users.email"
        );
        assert_eq!(
            DbError::Migration("schema v1 failed".to_string()).to_string(),
            "Migration error: schema v1 failed"
        );
    }

    // Test 4: DbError from rusqlite::Error
    #[test]
    fn test_db_error_from_sqlite() {
        let sqlite_err = rusqlite::Error::InvalidParameterName("test".to_string());
        let db_err: DbError = sqlite_err.into();

        match db_err {
            DbError::Sqlite(_) => (),
            _ => panic!("Expected DbError::Sqlite"),
        }
    }

    // Test 5: Constraint-violation predicate
    #[test]
    fn test_is_constraint_violation() {
        assert!(DbError::ConstraintViolation("users.email".to_string()).is_constraint_violation());
        assert!(!DbError::NotFound.is_constraint_violation());
    }

    // Test 6: Unknown identifier and wrong secret share one variant
    #[test]
    fn test_invalid_credentials_is_unified() {
        let unknown_identifier = AuthError::InvalidCredentials;
        let wrong_secret = AuthError::InvalidCredentials;
        assert_eq!(unknown_identifier, wrong_secret);
    }
}
