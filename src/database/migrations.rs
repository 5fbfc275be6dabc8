//! Database migrations for messenger-auth
//!
//! This module contains SQL migrations for the SQLite database schema.

/// SQL statement to create the initial database schema
///
/// Uniqueness of the login identifier and of the (provider, provider_id)
/// pair is enforced here, at the store level. Deleting a user cascades to
/// their sessions.
pub const CREATE_SCHEMA: &str = r#"
PRAGMA foreign_keys = ON;

-- User accounts
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    email TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    password_hash TEXT,
    provider TEXT NOT NULL DEFAULT 'credentials',
    provider_id TEXT NOT NULL,
    created_at DATETIME NOT NULL,
    UNIQUE(provider, provider_id)
);

CREATE INDEX IF NOT EXISTS idx_users_email ON users(email);

-- Sessions, keyed by the digest of the bearer token
CREATE TABLE IF NOT EXISTS sessions (
    token_hash TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    created_at DATETIME NOT NULL,
    expires_at DATETIME NOT NULL,
    revoked_at DATETIME
);

CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id);
CREATE INDEX IF NOT EXISTS idx_sessions_expiry ON sessions(expires_at);
"#;

/// Get the migration version
pub fn migration_version() -> i32 {
    1
}
