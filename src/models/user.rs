//! User-related domain models
//!
//! This module defines the user record, the client-safe projection of it,
//! and the request payloads accepted by the authentication service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity provider a user record originates from
///
/// Dispatch throughout the service is by this tag, never by comparing
/// provider name strings at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthProvider {
    /// Local email + password account
    Credentials,
    /// GitHub OAuth account
    Github,
    /// Google OAuth account
    Google,
}

impl std::fmt::Display for AuthProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthProvider::Credentials => write!(f, "credentials"),
            AuthProvider::Github => write!(f, "github"),
            AuthProvider::Google => write!(f, "google"),
        }
    }
}

impl std::str::FromStr for AuthProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "credentials" => Ok(AuthProvider::Credentials),
            "github" => Ok(AuthProvider::Github),
            "google" => Ok(AuthProvider::Google),
            other => Err(format!("Unknown auth provider: {}", other)),
        }
    }
}

/// User record stored in the database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Opaque unique user id
    pub id: String,

    /// Unique login identifier (email address)
    pub email: String,

    /// Display name
    pub name: String,

    /// Argon2id hash of the password (None for OAuth-only accounts)
    pub password_hash: Option<String>,

    /// Identity provider the account originates from
    pub provider: AuthProvider,

    /// Subject id at the provider; equals the email for credential accounts
    pub provider_id: String,

    /// When the account was created
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create a new user record
    pub fn new(
        id: impl Into<String>,
        email: impl Into<String>,
        name: impl Into<String>,
        provider: AuthProvider,
        provider_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            name: name.into(),
            password_hash: None,
            provider,
            provider_id: provider_id.into(),
            created_at: Utc::now(),
        }
    }

    /// Set the stored password hash
    pub fn with_password_hash(mut self, hash: impl Into<String>) -> Self {
        self.password_hash = Some(hash.into());
        self
    }

    /// Project into the client-safe representation (no hash material)
    pub fn to_public(&self) -> PublicUser {
        PublicUser {
            id: self.id.clone(),
            email: self.email.clone(),
            name: self.name.clone(),
            provider: self.provider,
        }
    }
}

/// User information safe to send to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicUser {
    /// Opaque unique user id
    pub id: String,

    /// Login identifier
    pub email: String,

    /// Display name
    pub name: String,

    /// Identity provider the account originates from
    pub provider: AuthProvider,
}

/// Registration request payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    /// Display name
    pub name: String,

    /// Login identifier (email address)
    pub email: String,

    /// Plaintext password; hashed before it ever reaches the store
    pub password: String,
}

/// Credential login payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Login identifier
    pub email: String,

    /// Plaintext password
    pub password: String,
}

/// Externally-verified identity assertion from an OAuth provider
///
/// The provider has already authenticated the user; this carries only the
/// verified claims the service needs to map the identity to a local account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityAssertion {
    /// Which provider verified the identity
    pub provider: AuthProvider,

    /// Stable subject id at the provider
    pub provider_id: String,

    /// Verified email address
    pub email: String,

    /// Display name, if the provider supplied one
    pub name: Option<String>,
}

impl IdentityAssertion {
    /// Display name to store, falling back to the email address
    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => &self.email,
        }
    }
}
