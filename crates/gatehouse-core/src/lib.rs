//! Gatehouse Core - Domain models, repositories, and shared types
//!
//! This crate defines the core abstractions used throughout Gatehouse:
//! - Directory models (users, tenants, roles)
//! - Refresh token records backing server-side revocation
//! - Common error types
//! - Repository traits for the directory and the refresh token store
//! - In-memory and PostgreSQL repository implementations
//! - Configuration management

pub mod config;
pub mod memory;
pub mod models;
pub mod repository;
pub mod store;

pub use config::{
    AppConfig, AuthConfig, ConfigError, DatabaseConfig, LoggingConfig, PasswordHashingConfig,
    ServerConfig,
};
pub use memory::InMemoryStore;
pub use models::{
    NewTenant, NewUser, RefreshTokenRecord, Role, Tenant, TenantUpdate, User, UserPage,
    UserPublic, UserUpdate,
};
pub use repository::{
    RefreshTokenRepository, Repositories, TenantRepository, UserRepository,
};
pub use store::PgStore;

use thiserror::Error;

// ============================================================================
// Token lifecycle constants
// ============================================================================

/// Access token lifetime (1 hour)
pub const ACCESS_TOKEN_TTL_SECS: u64 = 3600;

/// Refresh token lifetime (365 days)
pub const REFRESH_TOKEN_TTL_SECS: u64 = 31_536_000;

/// Cookie carrying the signed access token
pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";

/// Cookie carrying the signed refresh token
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for directory and token store operations
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;

impl From<ConfigError> for CoreError {
    fn from(err: ConfigError) -> Self {
        CoreError::ConfigError(err.to_string())
    }
}
