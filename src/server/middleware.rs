//! HTTP middleware for messenger-auth
//!
//! This module provides middleware layers for:
//! - Bearer-session authentication
//! - Request/response logging

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::time::Instant;

use crate::database::Database;
use crate::models::PublicUser;

use super::router::{ApiError, AppState};

/// Authenticated user extension for requests
#[derive(Clone, Debug)]
pub struct AuthenticatedUser(pub PublicUser);

/// Raw bearer token the session was resolved from
///
/// Kept in the request extensions so the logout handler can revoke exactly
/// the session that authenticated the request.
#[derive(Clone, Debug)]
pub struct SessionToken(pub String);

/// Session middleware function
///
/// This middleware:
/// 1. Extracts the bearer token from the Authorization header
/// 2. Verifies the session and resolves the owning user
/// 3. Adds the user and the raw token to the request extensions
///
/// Expired and invalid sessions both reject with 401; the body keeps the
/// machine-readable kind apart.
pub async fn session_middleware<D: Database + 'static>(
    State(state): State<AppState<D>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(request.headers()).ok_or_else(ApiError::missing_bearer)?;

    let user = state.auth_service.current_user(&token).await?;

    request.extensions_mut().insert(SessionToken(token));
    request.extensions_mut().insert(AuthenticatedUser(user));

    Ok(next.run(request).await)
}

/// Extract the bearer token from the Authorization header
fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

/// Logging middleware function
///
/// Logs request and response details including:
/// - Method and path
/// - Status code
/// - Response time
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let uri = request.uri().clone();

    let response = next.run(request).await;

    let elapsed = start.elapsed();
    let status = response.status();

    tracing::info!(
        method = %method,
        path = %uri.path(),
        status = %status.as_u16(),
        duration_ms = %elapsed.as_millis(),
        "Request completed"
    );

    response
}
