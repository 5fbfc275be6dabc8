//! Authentication system for messenger-auth
//!
//! This module provides authentication and session functionality:
//! - Password hashing and verification
//! - Session token generation and verification
//! - Registration, credential login, and OAuth identity mapping
//! - Rate limiting for failed login attempts

pub mod password;
pub mod ratelimit;
pub mod service;
pub mod sessions;
pub mod token;

pub use ratelimit::{RateLimitConfig, RateLimiter};
pub use service::{AuthService, AuthServiceConfig};
pub use sessions::SessionVerifier;
pub use token::{
    generate_session_token, generate_user_id, is_valid_token_format, token_digest,
    SESSION_TOKEN_PREFIX,
};
