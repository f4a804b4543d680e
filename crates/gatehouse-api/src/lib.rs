//! Gatehouse API - authentication and multi-tenant access control over HTTP
//!
//! Credentials are verified with Argon2id. Sessions are a short-lived RS256
//! access token plus a long-lived HS256 refresh token, both delivered as
//! HttpOnly cookies. Each refresh token is backed by a stored record so it can
//! be revoked; refreshing rotates it.

pub mod audit;
pub mod auth;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use routes::{create_router, ApiDoc};

#[cfg(any(test, feature = "test-utils"))]
pub use testing::create_router_for_testing;
