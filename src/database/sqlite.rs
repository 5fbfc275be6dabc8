//! SQLite implementation of the Database trait
//!
//! This module provides a SQLite-based implementation of the Database trait
//! using rusqlite and tokio-rusqlite for async operations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension;
use tokio_rusqlite::Connection;

use super::migrations::CREATE_SCHEMA;
use super::Database;
use crate::error::DbError;
use crate::models::{AuthProvider, Session, User};

/// SQLite database implementation
pub struct SqliteDatabase {
    conn: Connection,
}

impl SqliteDatabase {
    /// Create a new SQLite database connection
    ///
    /// Use `:memory:` for an in-memory database or a file path for
    /// persistent storage.
    pub async fn new(path: &str) -> Result<Self, DbError> {
        let conn = Connection::open(path)
            .await
            .map_err(|e| DbError::Connection(e.to_string()))?;

        // Run migrations
        conn.call(|conn| {
            conn.execute_batch(CREATE_SCHEMA)?;
            Ok(())
        })
        .await
        .map_err(|e| DbError::Migration(e.to_string()))?;

        Ok(Self { conn })
    }

    /// Create a new in-memory database (useful for testing)
    pub async fn in_memory() -> Result<Self, DbError> {
        Self::new(":memory:").await
    }
}

#[async_trait]
impl Database for SqliteDatabase {
    // =========================================================================
    // User operations
    // =========================================================================

    async fn create_user(&self, user: &User) -> Result<(), DbError> {
        let id = user.id.clone();
        let email = user.email.clone();
        let name = user.name.clone();
        let password_hash = user.password_hash.clone();
        let provider = user.provider.to_string();
        let provider_id = user.provider_id.clone();
        let created_at = user.created_at.to_rfc3339();

        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO users
                    (id, email, name, password_hash, provider, provider_id, created_at)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                    "#,
                    rusqlite::params![
                        id,
                        email,
                        name,
                        password_hash,
                        provider,
                        provider_id,
                        created_at
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(from_call_error)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, DbError> {
        let email = email.to_string();

        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    r#"
                    SELECT id, email, name, password_hash, provider, provider_id, created_at
                    FROM users
                    WHERE email = ?1
                    "#,
                )?;

                let result = stmt.query_row([&email], user_from_row).optional()?;

                Ok(result)
            })
            .await
            .map_err(from_call_error)
    }

    async fn get_user_by_id(&self, id: &str) -> Result<Option<User>, DbError> {
        let id = id.to_string();

        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    r#"
                    SELECT id, email, name, password_hash, provider, provider_id, created_at
                    FROM users
                    WHERE id = ?1
                    "#,
                )?;

                let result = stmt.query_row([&id], user_from_row).optional()?;

                Ok(result)
            })
            .await
            .map_err(from_call_error)
    }

    async fn get_user_by_provider(
        &self,
        provider: AuthProvider,
        provider_id: &str,
    ) -> Result<Option<User>, DbError> {
        let provider = provider.to_string();
        let provider_id = provider_id.to_string();

        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    r#"
                    SELECT id, email, name, password_hash, provider, provider_id, created_at
                    FROM users
                    WHERE provider = ?1 AND provider_id = ?2
                    "#,
                )?;

                let result = stmt
                    .query_row([&provider, &provider_id], user_from_row)
                    .optional()?;

                Ok(result)
            })
            .await
            .map_err(from_call_error)
    }

    async fn upsert_oauth_user(&self, user: &User) -> Result<User, DbError> {
        let id = user.id.clone();
        let email = user.email.clone();
        let name = user.name.clone();
        let provider = user.provider.to_string();
        let provider_id = user.provider_id.clone();
        let created_at = user.created_at.to_rfc3339();

        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO users
                    (id, email, name, password_hash, provider, provider_id, created_at)
                    VALUES (?1, ?2, ?3, NULL, ?4, ?5, ?6)
                    ON CONFLICT(provider, provider_id)
                    DO UPDATE SET email = excluded.email, name = excluded.name
                    "#,
                    rusqlite::params![id, email, name, provider, provider_id, created_at],
                )?;

                let mut stmt = conn.prepare(
                    r#"
                    SELECT id, email, name, password_hash, provider, provider_id, created_at
                    FROM users
                    WHERE provider = ?1 AND provider_id = ?2
                    "#,
                )?;

                let stored = stmt.query_row([&provider, &provider_id], user_from_row)?;

                Ok(stored)
            })
            .await
            .map_err(from_call_error)
    }

    async fn delete_user(&self, id: &str) -> Result<(), DbError> {
        let id = id.to_string();

        let rows_affected = self
            .conn
            .call(move |conn| {
                let count = conn.execute("DELETE FROM users WHERE id = ?1", [&id])?;
                Ok(count)
            })
            .await
            .map_err(from_call_error)?;

        if rows_affected == 0 {
            return Err(DbError::NotFound);
        }

        Ok(())
    }

    // =========================================================================
    // Session operations
    // =========================================================================

    async fn insert_session(&self, session: &Session) -> Result<(), DbError> {
        let token_hash = session.token_hash.clone();
        let user_id = session.user_id.clone();
        let created_at = session.created_at.to_rfc3339();
        let expires_at = session.expires_at.to_rfc3339();
        let revoked_at = session.revoked_at.map(|dt| dt.to_rfc3339());

        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO sessions
                    (token_hash, user_id, created_at, expires_at, revoked_at)
                    VALUES (?1, ?2, ?3, ?4, ?5)
                    "#,
                    rusqlite::params![token_hash, user_id, created_at, expires_at, revoked_at],
                )?;
                Ok(())
            })
            .await
            .map_err(from_call_error)
    }

    async fn get_session_by_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<Session>, DbError> {
        let token_hash = token_hash.to_string();

        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    r#"
                    SELECT token_hash, user_id, created_at, expires_at, revoked_at
                    FROM sessions
                    WHERE token_hash = ?1
                    "#,
                )?;

                let result = stmt
                    .query_row([&token_hash], |row| {
                        Ok(Session {
                            token_hash: row.get(0)?,
                            user_id: row.get(1)?,
                            created_at: parse_datetime(row.get::<_, Option<String>>(2)?)
                                .unwrap_or_else(Utc::now),
                            expires_at: parse_datetime(row.get::<_, Option<String>>(3)?)
                                .unwrap_or_else(Utc::now),
                            revoked_at: parse_datetime(row.get::<_, Option<String>>(4)?),
                        })
                    })
                    .optional()?;

                Ok(result)
            })
            .await
            .map_err(from_call_error)
    }

    async fn revoke_session(&self, token_hash: &str) -> Result<(), DbError> {
        let token_hash = token_hash.to_string();
        let now = Utc::now().to_rfc3339();

        let rows_affected = self
            .conn
            .call(move |conn| {
                let count = conn.execute(
                    "UPDATE sessions SET revoked_at = ?1 WHERE token_hash = ?2",
                    rusqlite::params![now, token_hash],
                )?;
                Ok(count)
            })
            .await
            .map_err(from_call_error)?;

        if rows_affected == 0 {
            return Err(DbError::NotFound);
        }

        Ok(())
    }

    async fn delete_session(&self, token_hash: &str) -> Result<(), DbError> {
        let token_hash = token_hash.to_string();

        self.conn
            .call(move |conn| {
                conn.execute("DELETE FROM sessions WHERE token_hash = ?1", [&token_hash])?;
                Ok(())
            })
            .await
            .map_err(from_call_error)
    }

    async fn delete_expired_sessions(&self) -> Result<u64, DbError> {
        let now = Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| {
                let count = conn.execute(
                    "DELETE FROM sessions WHERE datetime(expires_at) <= datetime(?1)",
                    [&now],
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(from_call_error)
    }

    async fn count_sessions_for_user(&self, user_id: &str) -> Result<u64, DbError> {
        let user_id = user_id.to_string();
        let now = Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| {
                let count: i64 = conn.query_row(
                    r#"
                    SELECT COUNT(*)
                    FROM sessions
                    WHERE user_id = ?1
                      AND revoked_at IS NULL
                      AND datetime(expires_at) > datetime(?2)
                    "#,
                    rusqlite::params![user_id, now],
                    |row| row.get(0),
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(from_call_error)
    }
}

/// Map a row from the users table to a User
fn user_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    let provider: String = row.get(4)?;

    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        name: row.get(2)?,
        password_hash: row.get(3)?,
        provider: provider.parse().unwrap_or(AuthProvider::Credentials),
        provider_id: row.get(5)?,
        created_at: parse_datetime(row.get::<_, Option<String>>(6)?).unwrap_or_else(Utc::now),
    })
}

/// Parse a datetime string to DateTime<Utc>
fn parse_datetime(s: Option<String>) -> Option<DateTime<Utc>> {
    s.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
            .or_else(|| {
                // Try parsing SQLite's datetime format
                chrono::NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S")
                    .ok()
                    .map(|dt| dt.and_utc())
            })
    })
}

/// Map a connection-worker error to a DbError
///
/// Uniqueness violations are surfaced as their own variant so callers can
/// turn them into a registration conflict.
fn from_call_error(err: tokio_rusqlite::Error) -> DbError {
    match err {
        tokio_rusqlite::Error::Rusqlite(e) => match e {
            rusqlite::Error::SqliteFailure(f, msg)
                if f.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                DbError::ConstraintViolation(
                    msg.unwrap_or_else(|| "unique constraint".to_string()),
                )
            }
            other => DbError::Sqlite(other),
        },
        other => DbError::Connection(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn alice() -> User {
        User::new(
            "u1",
            "alice@example.com",
            "Alice",
            AuthProvider::Credentials,
            "alice@example.com",
        )
        .with_password_hash("$argon2id$hash")
    }

    // Test 1: Create in-memory database
    #[tokio::test]
    async fn test_create_in_memory_database() {
        let db = SqliteDatabase::in_memory().await;
        assert!(db.is_ok());
    }

    // Test 2: Create and fetch a user
    #[tokio::test]
    async fn test_create_and_get_user() {
        let db = SqliteDatabase::in_memory().await.unwrap();

        db.create_user(&alice()).await.unwrap();

        let by_email = db.get_user_by_email("alice@example.com").await.unwrap();
        assert!(by_email.is_some());
        let user = by_email.unwrap();
        assert_eq!(user.id, "u1");
        assert_eq!(user.name, "Alice");
        assert_eq!(user.provider, AuthProvider::Credentials);
        assert_eq!(user.password_hash, Some("$argon2id$hash".to_string()));

        let by_id = db.get_user_by_id("u1").await.unwrap();
        assert_eq!(by_id.unwrap().email, "alice@example.com");
    }

    // Test 3: Duplicate email is a constraint violation
    #[tokio::test]
    async fn test_duplicate_email_is_constraint_violation() {
        let db = SqliteDatabase::in_memory().await.unwrap();

        db.create_user(&alice()).await.unwrap();

        let duplicate = User::new(
            "u2",
            "alice@example.com",
            "Impostor",
            AuthProvider::Credentials,
            "alice@example.com",
        );
        let result = db.create_user(&duplicate).await;

        assert!(matches!(result, Err(DbError::ConstraintViolation(_))));

        // Exactly one record survives
        let user = db.get_user_by_email("alice@example.com").await.unwrap();
        assert_eq!(user.unwrap().name, "Alice");
    }

    // Test 4: Unknown lookups return None
    #[tokio::test]
    async fn test_unknown_lookups_return_none() {
        let db = SqliteDatabase::in_memory().await.unwrap();

        assert!(db
            .get_user_by_email("nobody@example.com")
            .await
            .unwrap()
            .is_none());
        assert!(db.get_user_by_id("missing").await.unwrap().is_none());
        assert!(db
            .get_user_by_provider(AuthProvider::Github, "gh-404")
            .await
            .unwrap()
            .is_none());
        assert!(db
            .get_session_by_token_hash("missing")
            .await
            .unwrap()
            .is_none());
    }

    // Test 5: OAuth upsert inserts then refreshes
    #[tokio::test]
    async fn test_upsert_oauth_user() {
        let db = SqliteDatabase::in_memory().await.unwrap();

        let first = User::new(
            "u-gh-1",
            "bob@example.com",
            "Bob",
            AuthProvider::Github,
            "gh-12345",
        );
        let stored = db.upsert_oauth_user(&first).await.unwrap();
        assert_eq!(stored.id, "u-gh-1");

        // Returning user with a refreshed profile keeps the original id
        let returning = User::new(
            "u-gh-other",
            "robert@example.com",
            "Robert",
            AuthProvider::Github,
            "gh-12345",
        );
        let stored = db.upsert_oauth_user(&returning).await.unwrap();
        assert_eq!(stored.id, "u-gh-1");
        assert_eq!(stored.email, "robert@example.com");
        assert_eq!(stored.name, "Robert");
    }

    // Test 6: Deleting a user removes their sessions
    #[tokio::test]
    async fn test_delete_user_cascades() {
        let db = SqliteDatabase::in_memory().await.unwrap();

        db.create_user(&alice()).await.unwrap();
        db.insert_session(&Session::new("digest1", "u1", Duration::hours(1)))
            .await
            .unwrap();

        db.delete_user("u1").await.unwrap();

        assert!(db.get_user_by_id("u1").await.unwrap().is_none());
        assert!(db
            .get_session_by_token_hash("digest1")
            .await
            .unwrap()
            .is_none());
    }

    // Test 7: Delete non-existent user returns error
    #[tokio::test]
    async fn test_delete_nonexistent_user() {
        let db = SqliteDatabase::in_memory().await.unwrap();

        let result = db.delete_user("missing").await;
        assert!(matches!(result, Err(DbError::NotFound)));
    }

    // Test 8: Session insert and fetch round-trip
    #[tokio::test]
    async fn test_session_insert_and_get() {
        let db = SqliteDatabase::in_memory().await.unwrap();

        db.create_user(&alice()).await.unwrap();
        let session = Session::new("digest1", "u1", Duration::hours(1));
        db.insert_session(&session).await.unwrap();

        let fetched = db
            .get_session_by_token_hash("digest1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.user_id, "u1");
        assert!(fetched.revoked_at.is_none());
        assert!(fetched.is_active(Utc::now()));
    }

    // Test 9: Revoke session sets revoked_at
    #[tokio::test]
    async fn test_revoke_session() {
        let db = SqliteDatabase::in_memory().await.unwrap();

        db.create_user(&alice()).await.unwrap();
        db.insert_session(&Session::new("digest1", "u1", Duration::hours(1)))
            .await
            .unwrap();

        db.revoke_session("digest1").await.unwrap();

        let fetched = db
            .get_session_by_token_hash("digest1")
            .await
            .unwrap()
            .unwrap();
        assert!(fetched.revoked_at.is_some());
        assert!(!fetched.is_active(Utc::now()));
    }

    // Test 10: Revoke non-existent session returns error
    #[tokio::test]
    async fn test_revoke_nonexistent_session() {
        let db = SqliteDatabase::in_memory().await.unwrap();

        let result = db.revoke_session("missing").await;
        assert!(matches!(result, Err(DbError::NotFound)));
    }

    // Test 11: Expired-session sweep removes only expired rows
    #[tokio::test]
    async fn test_delete_expired_sessions() {
        let db = SqliteDatabase::in_memory().await.unwrap();

        db.create_user(&alice()).await.unwrap();
        db.insert_session(&Session::new("live", "u1", Duration::hours(1)))
            .await
            .unwrap();
        db.insert_session(&Session::new("dead1", "u1", Duration::zero()))
            .await
            .unwrap();
        db.insert_session(&Session::new("dead2", "u1", Duration::seconds(-60)))
            .await
            .unwrap();

        let deleted = db.delete_expired_sessions().await.unwrap();
        assert_eq!(deleted, 2);

        assert!(db.get_session_by_token_hash("live").await.unwrap().is_some());
        assert!(db
            .get_session_by_token_hash("dead1")
            .await
            .unwrap()
            .is_none());
    }

    // Test 12: Live session count excludes revoked and expired
    #[tokio::test]
    async fn test_count_sessions_for_user() {
        let db = SqliteDatabase::in_memory().await.unwrap();

        db.create_user(&alice()).await.unwrap();
        db.insert_session(&Session::new("live1", "u1", Duration::hours(1)))
            .await
            .unwrap();
        db.insert_session(&Session::new("live2", "u1", Duration::hours(1)))
            .await
            .unwrap();
        db.insert_session(&Session::new("expired", "u1", Duration::zero()))
            .await
            .unwrap();
        db.insert_session(&Session::new("revoked", "u1", Duration::hours(1)))
            .await
            .unwrap();
        db.revoke_session("revoked").await.unwrap();

        let count = db.count_sessions_for_user("u1").await.unwrap();
        assert_eq!(count, 2);
    }
}
