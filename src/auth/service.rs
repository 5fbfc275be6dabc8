//! Core authentication service
//!
//! Registration, credential login, OAuth identity mapping, and logout.
//! Each operation receives its dependencies through the service; there is
//! no ambient session state. Password work always runs on a blocking
//! worker so the async executor never stalls on Argon2.

use std::net::IpAddr;
use std::sync::Arc;

use tokio::task;
use tracing::{error, warn};

use super::password;
use super::ratelimit::{RateLimitConfig, RateLimiter};
use super::sessions::SessionVerifier;
use super::token::generate_user_id;
use crate::database::Database;
use crate::error::{AuthError, SessionError};
use crate::models::{
    AuthProvider, Credentials, IdentityAssertion, LoginResponse, PublicUser, RegisterRequest, User,
};

/// Minimum accepted password length
const MIN_PASSWORD_LEN: usize = 8;

/// Configuration for the authentication service
#[derive(Debug, Clone)]
pub struct AuthServiceConfig {
    /// Session time-to-live in seconds
    pub session_ttl_secs: u64,

    /// Login failure rate limiting
    pub rate_limit: RateLimitConfig,
}

impl Default for AuthServiceConfig {
    fn default() -> Self {
        Self {
            // 7 days
            session_ttl_secs: 604_800,
            rate_limit: RateLimitConfig::default(),
        }
    }
}

/// Authentication service
///
/// Orchestrates the credential store, the session verifier, and the rate
/// limiter behind the HTTP handlers.
pub struct AuthService<D: Database> {
    db: Arc<D>,
    sessions: SessionVerifier<D>,
    rate_limiter: RateLimiter,
}

impl<D: Database> AuthService<D> {
    /// Create a new authentication service
    pub fn new(db: Arc<D>, config: AuthServiceConfig) -> Self {
        let sessions = SessionVerifier::new(Arc::clone(&db), config.session_ttl_secs);
        let rate_limiter = RateLimiter::new(config.rate_limit);
        Self {
            db,
            sessions,
            rate_limiter,
        }
    }

    /// The session verifier backing this service
    pub fn sessions(&self) -> &SessionVerifier<D> {
        &self.sessions
    }

    /// Register a new credential account
    ///
    /// Returns the public identity of the created user. The caller signs in
    /// with a separate login call; registration never issues a session.
    pub async fn register(&self, request: RegisterRequest) -> Result<PublicUser, AuthError> {
        validate_registration(&request)?;

        let email = normalize_email(&request.email);
        let name = request.name.trim().to_string();

        let password = request.password;
        let hash = task::spawn_blocking(move || password::hash_password(&password))
            .await
            .map_err(|e| {
                error!(error = %e, "Password hashing task failed");
                AuthError::Internal
            })?
            .map_err(|e| {
                error!(error = %e, "Password hashing failed");
                AuthError::Internal
            })?;

        let user = User::new(
            generate_user_id(),
            &email,
            &name,
            AuthProvider::Credentials,
            &email,
        )
        .with_password_hash(hash);

        match self.db.create_user(&user).await {
            Ok(()) => Ok(user.to_public()),
            Err(e) if e.is_constraint_violation() => Err(AuthError::Conflict),
            Err(e) => {
                error!(error = %e, "Failed to create user");
                Err(AuthError::Internal)
            }
        }
    }

    /// Log in with email and password
    ///
    /// Unknown identifier and secret mismatch are indistinguishable to the
    /// caller. On success a new session is issued.
    pub async fn login(
        &self,
        credentials: Credentials,
        ip: Option<IpAddr>,
    ) -> Result<LoginResponse, AuthError> {
        if let Some(ip) = ip {
            if self.rate_limiter.is_blocked(ip) {
                return Err(AuthError::RateLimited);
            }
        }

        let email = normalize_email(&credentials.email);
        let user = match self.db.get_user_by_email(&email).await {
            Ok(user) => user,
            Err(e) => {
                error!(error = %e, "User lookup failed");
                return Err(AuthError::Internal);
            }
        };

        let user = match user {
            Some(user) => user,
            None => {
                self.note_failure(ip);
                return Err(AuthError::InvalidCredentials);
            }
        };

        // OAuth-only accounts carry no hash and cannot log in with a password
        let verified = match user.password_hash.clone() {
            Some(hash) => {
                let password = credentials.password;
                task::spawn_blocking(move || password::verify_password(&password, &hash))
                    .await
                    .map_err(|e| {
                        error!(error = %e, "Password verification task failed");
                        AuthError::Internal
                    })?
            }
            None => false,
        };

        if !verified {
            self.note_failure(ip);
            return Err(AuthError::InvalidCredentials);
        }

        if let Some(ip) = ip {
            self.rate_limiter.reset(ip);
        }

        self.establish_session(user).await
    }

    /// Log in with an externally-verified OAuth identity assertion
    ///
    /// The provider has already authenticated the user; this maps the
    /// assertion onto a local account (creating or refreshing it) and
    /// issues a session.
    pub async fn login_oauth(
        &self,
        assertion: IdentityAssertion,
    ) -> Result<LoginResponse, AuthError> {
        if assertion.provider == AuthProvider::Credentials {
            return Err(AuthError::InvalidInput(
                "credential sign-in does not use identity assertions".to_string(),
            ));
        }
        if assertion.provider_id.trim().is_empty() {
            return Err(AuthError::InvalidInput(
                "provider subject is required".to_string(),
            ));
        }
        if !is_valid_email(assertion.email.trim()) {
            return Err(AuthError::InvalidInput("email is malformed".to_string()));
        }

        let user = User::new(
            generate_user_id(),
            normalize_email(&assertion.email),
            assertion.display_name(),
            assertion.provider,
            assertion.provider_id.trim(),
        );

        let stored = match self.db.upsert_oauth_user(&user).await {
            Ok(stored) => stored,
            Err(e) if e.is_constraint_violation() => return Err(AuthError::Conflict),
            Err(e) => {
                error!(error = %e, provider = %assertion.provider, "OAuth upsert failed");
                return Err(AuthError::Internal);
            }
        };

        self.establish_session(stored).await
    }

    /// Revoke the presented session token (logout)
    pub async fn logout(&self, token: &str) -> Result<(), SessionError> {
        self.sessions.revoke(token).await
    }

    /// Resolve the presented session token to its user
    pub async fn current_user(&self, token: &str) -> Result<PublicUser, SessionError> {
        let user_id = self.sessions.verify(token).await?;

        match self.db.get_user_by_id(&user_id).await {
            Ok(Some(user)) => Ok(user.to_public()),
            // Session outlived its user; treat the token as dead
            Ok(None) => Err(SessionError::Invalid),
            Err(e) => {
                error!(error = %e, "User lookup failed during session resolution");
                Err(SessionError::Unavailable)
            }
        }
    }

    /// Whether an IP is currently blocked from logging in
    pub fn is_rate_limited(&self, ip: IpAddr) -> bool {
        self.rate_limiter.is_blocked(ip)
    }

    /// Drop rate-limiter records whose window and block have both lapsed
    ///
    /// Called periodically by the background sweeper
    pub fn cleanup_rate_limiter(&self) {
        self.rate_limiter.cleanup();
    }

    async fn establish_session(&self, user: User) -> Result<LoginResponse, AuthError> {
        let (token, session) = self.sessions.issue(&user.id).await.map_err(|e| {
            error!(error = %e, user_id = %user.id, "Failed to issue session");
            AuthError::Internal
        })?;

        Ok(LoginResponse {
            token,
            expires_at: session.expires_at,
            user: user.to_public(),
        })
    }

    fn note_failure(&self, ip: Option<IpAddr>) {
        if let Some(ip) = ip {
            if self.rate_limiter.record_failure(ip) {
                warn!(ip = %ip, "IP blocked after repeated login failures");
            }
        }
    }
}

/// Normalize a login identifier for storage and lookup
fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

/// Validate a registration request
fn validate_registration(request: &RegisterRequest) -> Result<(), AuthError> {
    if request.name.trim().is_empty() {
        return Err(AuthError::InvalidInput("name is required".to_string()));
    }
    if request.email.trim().is_empty() {
        return Err(AuthError::InvalidInput("email is required".to_string()));
    }
    if !is_valid_email(request.email.trim()) {
        return Err(AuthError::InvalidInput("email is malformed".to_string()));
    }
    if request.password.len() < MIN_PASSWORD_LEN {
        return Err(AuthError::InvalidInput(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

/// Shallow shape check on a login identifier
fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }

    let mut parts = email.splitn(2, '@');
    match (parts.next(), parts.next()) {
        (Some(local), Some(domain)) => {
            !local.is_empty() && !domain.is_empty() && !domain.contains('@') && domain.contains('.')
        }
        _ => false,
    }
}
