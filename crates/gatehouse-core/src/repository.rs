//! Repository traits for the user/tenant directory and the refresh token store
//!
//! The token core depends on these interfaces only; `InMemoryStore` and
//! `PgStore` provide the implementations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::memory::InMemoryStore;
use crate::models::{
    NewTenant, NewUser, RefreshTokenRecord, Tenant, TenantUpdate, User, UserUpdate,
};
use crate::store::PgStore;
use crate::Result;

/// User directory
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Look up a user including the stored password hash
    async fn find_by_email_with_password(&self, email: &str) -> Result<Option<User>>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;

    /// Create a user; fails with `CoreError::Conflict` when the email is taken
    async fn create(&self, new_user: NewUser) -> Result<User>;

    /// Apply a partial update; `Ok(None)` when the user does not exist
    async fn update(&self, id: Uuid, update: UserUpdate) -> Result<Option<User>>;

    /// Page through users, newest first. `page` is 1-based.
    async fn list(&self, page: u32, limit: u32) -> Result<(Vec<User>, u64)>;

    /// Delete a user; returns whether a row was removed
    async fn delete(&self, id: Uuid) -> Result<bool>;
}

/// Tenant directory
#[async_trait]
pub trait TenantRepository: Send + Sync {
    async fn create(&self, new_tenant: NewTenant) -> Result<Tenant>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Tenant>>;

    async fn list(&self) -> Result<Vec<Tenant>>;

    async fn update(&self, id: Uuid, update: TenantUpdate) -> Result<Option<Tenant>>;

    async fn delete(&self, id: Uuid) -> Result<bool>;
}

/// Refresh token store
///
/// A record exists exactly as long as its refresh token may be used;
/// deleting it is the only revocation mechanism.
#[async_trait]
pub trait RefreshTokenRepository: Send + Sync {
    /// Persist a new record for `user_id`
    async fn create(&self, user_id: Uuid, expires_at: DateTime<Utc>) -> Result<RefreshTokenRecord>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<RefreshTokenRecord>>;

    /// Delete a record by id; deleting a missing id is not an error
    async fn delete(&self, id: Uuid) -> Result<bool>;

    /// Delete every record owned by `user_id`, returning how many were removed
    async fn delete_for_user(&self, user_id: Uuid) -> Result<u64>;
}

/// The set of repositories the service runs against
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub tenants: Arc<dyn TenantRepository>,
    pub refresh_tokens: Arc<dyn RefreshTokenRepository>,
}

impl Repositories {
    /// Back all repositories with one in-memory store
    pub fn in_memory() -> (Self, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        let repositories = Self {
            users: store.clone(),
            tenants: store.clone(),
            refresh_tokens: store.clone(),
        };
        (repositories, store)
    }

    /// Back all repositories with PostgreSQL
    pub fn postgres(store: PgStore) -> Self {
        let store = Arc::new(store);
        Self {
            users: store.clone(),
            tenants: store.clone(),
            refresh_tokens: store,
        }
    }
}
