//! Test utilities
//!
//! Fixture RSA keys, cheap Argon2 parameters, and a router backed by
//! `InMemoryStore`. Available to unit tests and, through the `test-utils`
//! feature, to integration tests.

use crate::auth::jwt::JwtConfig;
use crate::routes::create_router;
use crate::state::AppState;
use axum::Router;
use gatehouse_core::{AppConfig, AuthConfig, InMemoryStore, PasswordHashingConfig, Repositories};
use std::sync::Arc;

pub const TEST_PRIVATE_KEY: &str = include_str!("../tests/fixtures/access_private.pem");
pub const TEST_PUBLIC_KEY: &str = include_str!("../tests/fixtures/access_public.pem");
pub const TEST_REFRESH_SECRET: &str = "test-refresh-secret";

/// Configuration with fixture keys and light password hashing
pub fn test_config() -> AppConfig {
    AppConfig {
        auth: AuthConfig {
            private_key_pem: Some(TEST_PRIVATE_KEY.to_string()),
            public_key_pem: Some(TEST_PUBLIC_KEY.to_string()),
            refresh_token_secret: Some(TEST_REFRESH_SECRET.to_string()),
            ..Default::default()
        },
        password: PasswordHashingConfig {
            memory_cost: 8192,
            time_cost: 2,
            parallelism: 1,
        },
        ..Default::default()
    }
}

/// Signing material matching `test_config`
pub fn jwt_config() -> JwtConfig {
    match JwtConfig::from_auth_config(&test_config().auth) {
        Ok(config) => config,
        Err(e) => panic!("fixture keys must parse: {e}"),
    }
}

/// A router plus direct handles on its state and store
pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub store: Arc<InMemoryStore>,
}

impl TestApp {
    pub fn new() -> Self {
        let (repos, store) = Repositories::in_memory();
        let state = match AppState::new(test_config(), repos) {
            Ok(state) => Arc::new(state),
            Err(e) => panic!("test state must build: {e}"),
        };

        Self {
            router: create_router(state.clone()),
            state,
            store,
        }
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

/// Router over a fresh in-memory store
pub fn create_router_for_testing() -> Router {
    TestApp::new().router
}
