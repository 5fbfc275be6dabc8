//! HTTP router for messenger-auth
//!
//! This module defines the axum router that handles all HTTP requests.
//! It provides routes for:
//! - Health checks
//! - Registration and credential login
//! - OAuth identity-assertion callback
//! - Session-bound endpoints (current user, logout)

use axum::{
    extract::{ConnectInfo, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Extension, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;

use crate::auth::AuthService;
use crate::database::Database;
use crate::error::{AuthError, SessionError};
use crate::models::{Credentials, IdentityAssertion, LoginResponse, PublicUser, RegisterRequest};

use super::middleware::{session_middleware, AuthenticatedUser, SessionToken};

/// Shared application state
///
/// Handlers receive this explicitly through axum's `State`; there is no
/// module-level singleton.
pub struct AppState<D: Database> {
    /// Authentication service
    pub auth_service: Arc<AuthService<D>>,

    /// Database
    pub database: Arc<D>,
}

impl<D: Database> Clone for AppState<D> {
    fn clone(&self) -> Self {
        Self {
            auth_service: Arc::clone(&self.auth_service),
            database: Arc::clone(&self.database),
        }
    }
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Build the main application router
///
/// # Arguments
///
/// * `state` - Application state containing the authentication service
///
/// # Returns
///
/// An axum Router configured with all endpoints
pub fn build_router<D: Database + 'static>(state: AppState<D>) -> Router {
    // Endpoints that require a live session run behind the bearer middleware
    let session_routes = Router::new()
        .route("/api/me", get(api_me_handler::<D>))
        .route("/api/logout", post(api_logout_handler::<D>))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            session_middleware::<D>,
        ));

    Router::new()
        // Health endpoint (no auth required)
        .route("/health", get(health_handler))
        // Authentication endpoints
        .route("/api/register", post(api_register_handler::<D>))
        .route("/api/login", post(api_login_handler::<D>))
        .route("/api/oauth/callback", post(api_oauth_callback_handler::<D>))
        .merge(session_routes)
        .layer(middleware::from_fn(super::middleware::logging_middleware))
        .with_state(state)
}

// =============================================================================
// Health Handler
// =============================================================================

/// Health check endpoint handler
async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// =============================================================================
// Authentication Handlers
// =============================================================================

/// Registration handler
///
/// Registration never issues a session; the client logs in afterwards.
async fn api_register_handler<D: Database + 'static>(
    State(state): State<AppState<D>>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<PublicUser>), ApiError> {
    let user = state.auth_service.register(request).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Credential login handler
async fn api_login_handler<D: Database + 'static>(
    State(state): State<AppState<D>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    Json(credentials): Json<Credentials>,
) -> Result<Json<LoginResponse>, ApiError> {
    let ip = connect_info.map(|ConnectInfo(addr)| addr.ip());
    let response = state.auth_service.login(credentials, ip).await?;
    Ok(Json(response))
}

/// OAuth callback handler
///
/// Accepts an externally-verified identity assertion; the provider has
/// already authenticated the user.
async fn api_oauth_callback_handler<D: Database + 'static>(
    State(state): State<AppState<D>>,
    Json(assertion): Json<IdentityAssertion>,
) -> Result<Json<LoginResponse>, ApiError> {
    let response = state.auth_service.login_oauth(assertion).await?;
    Ok(Json(response))
}

/// Current-user handler
///
/// The session middleware has already resolved the bearer token.
async fn api_me_handler<D: Database + 'static>(
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
) -> Json<PublicUser> {
    Json(user)
}

/// Logout handler
///
/// Revokes the presented session; the token stops verifying immediately.
async fn api_logout_handler<D: Database + 'static>(
    State(state): State<AppState<D>>,
    Extension(SessionToken(token)): Extension<SessionToken>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.auth_service.logout(&token).await?;
    Ok(Json(serde_json::json!({ "message": "Logged out" })))
}

// =============================================================================
// Error Response
// =============================================================================

/// JSON error response for failing endpoints
///
/// Owns the mapping from the error taxonomy to HTTP status codes. The body
/// carries the user-facing message plus the machine-readable kind; internal
/// causes never reach the client.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    kind: &'static str,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, kind: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            kind,
            message: message.into(),
        }
    }

    /// Missing or non-bearer Authorization header
    pub fn missing_bearer() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            "invalid_session",
            "Missing bearer token",
        )
    }

    /// HTTP status of this error
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Machine-readable error kind
    pub fn kind(&self) -> &'static str {
        self.kind
    }
}

impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        let (status, kind) = match &error {
            AuthError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "invalid_input"),
            AuthError::Conflict => (StatusCode::CONFLICT, "conflict"),
            AuthError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "invalid_credentials"),
            AuthError::RateLimited => (StatusCode::TOO_MANY_REQUESTS, "rate_limited"),
            AuthError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        };
        Self::new(status, kind, error.to_string())
    }
}

impl From<SessionError> for ApiError {
    fn from(error: SessionError) -> Self {
        match error {
            SessionError::Expired => {
                Self::new(StatusCode::UNAUTHORIZED, "expired", error.to_string())
            }
            SessionError::Invalid => {
                Self::new(StatusCode::UNAUTHORIZED, "invalid_session", error.to_string())
            }
            SessionError::Unavailable => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal",
                "Something went wrong",
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(kind = self.kind, "Request failed");
        } else {
            tracing::debug!(kind = self.kind, status = %self.status.as_u16(), "Request rejected");
        }

        let body = Json(serde_json::json!({
            "error": self.message,
            "kind": self.kind,
        }));
        (self.status, body).into_response()
    }
}
