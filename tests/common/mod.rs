//! Common test utilities and helpers for integration tests

#![allow(dead_code)]

use std::sync::Arc;

use messenger_auth::auth::{AuthService, AuthServiceConfig, RateLimitConfig};
use messenger_auth::database::SqliteDatabase;
use messenger_auth::server::AppState;

/// Create an in-memory database for testing
pub async fn create_test_database() -> Arc<SqliteDatabase> {
    Arc::new(
        SqliteDatabase::new(":memory:")
            .await
            .expect("Failed to create test database"),
    )
}

/// Create an authentication service over the given database
pub fn create_test_service(
    db: Arc<SqliteDatabase>,
    config: AuthServiceConfig,
) -> Arc<AuthService<SqliteDatabase>> {
    Arc::new(AuthService::new(db, config))
}

/// Default service configuration for tests (short everything)
pub fn test_service_config() -> AuthServiceConfig {
    AuthServiceConfig {
        session_ttl_secs: 3600,
        rate_limit: RateLimitConfig::default(),
    }
}

/// Create a test application state
pub async fn create_test_state() -> AppState<SqliteDatabase> {
    create_test_state_with(test_service_config()).await
}

/// Create a test application state with a custom service configuration
pub async fn create_test_state_with(config: AuthServiceConfig) -> AppState<SqliteDatabase> {
    let database = create_test_database().await;
    let auth_service = create_test_service(Arc::clone(&database), config);

    AppState {
        auth_service,
        database,
    }
}

/// Run a test server in the background and return the address
/// The server will be shut down when the returned shutdown sender is dropped or sent
pub async fn run_test_server(
    state: AppState<SqliteDatabase>,
) -> (std::net::SocketAddr, tokio::sync::oneshot::Sender<()>) {
    use tokio::net::TcpListener;

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test server");
    let addr = listener.local_addr().expect("Failed to get local address");

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

    // Connect info is wired up so the login rate limiter sees a client IP
    let app = messenger_auth::server::build_router(state)
        .into_make_service_with_connect_info::<std::net::SocketAddr>();

    tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await
            .expect("Server error");
    });

    // Give the server a moment to start (100ms is sufficient for slow CI systems)
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    (addr, shutdown_tx)
}

/// Registration payload for the HTTP API
pub fn register_payload(name: &str, email: &str, password: &str) -> serde_json::Value {
    serde_json::json!({
        "name": name,
        "email": email,
        "password": password
    })
}

/// Login payload for the HTTP API
pub fn login_payload(email: &str, password: &str) -> serde_json::Value {
    serde_json::json!({
        "email": email,
        "password": password
    })
}
