//! In-memory repositories
//!
//! Backs the directory and refresh token store with `RwLock`-guarded maps.
//! Used by tests and for running the service without PostgreSQL.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{
    NewTenant, NewUser, RefreshTokenRecord, Tenant, TenantUpdate, User, UserUpdate,
};
use crate::repository::{RefreshTokenRepository, TenantRepository, UserRepository};
use crate::{CoreError, Result};

/// In-memory store implementing every repository trait
#[derive(Debug, Default)]
pub struct InMemoryStore {
    users: RwLock<HashMap<Uuid, User>>,
    tenants: RwLock<HashMap<Uuid, Tenant>>,
    refresh_tokens: RwLock<HashMap<Uuid, RefreshTokenRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users
    pub async fn user_count(&self) -> usize {
        self.users.read().await.len()
    }

    /// Number of outstanding refresh token records
    pub async fn refresh_token_count(&self) -> usize {
        self.refresh_tokens.read().await.len()
    }

    /// Outstanding refresh token records owned by `user_id`
    pub async fn refresh_tokens_for(&self, user_id: Uuid) -> Vec<RefreshTokenRecord> {
        self.refresh_tokens
            .read()
            .await
            .values()
            .filter(|record| record.user_id == user_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn find_by_email_with_password(&self, email: &str) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn create(&self, new_user: NewUser) -> Result<User> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == new_user.email) {
            return Err(CoreError::Conflict("Email already exists".to_string()));
        }

        let user = User::from_new(new_user);
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(&self, id: Uuid, update: UserUpdate) -> Result<Option<User>> {
        let mut users = self.users.write().await;
        Ok(users.get_mut(&id).map(|user| {
            user.apply(&update);
            user.clone()
        }))
    }

    async fn list(&self, page: u32, limit: u32) -> Result<(Vec<User>, u64)> {
        let users = self.users.read().await;
        let mut all: Vec<&User> = users.values().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let offset = page.saturating_sub(1) as usize * limit as usize;
        let data = all
            .into_iter()
            .skip(offset)
            .take(limit as usize)
            .cloned()
            .collect();

        Ok((data, users.len() as u64))
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        Ok(self.users.write().await.remove(&id).is_some())
    }
}

#[async_trait]
impl TenantRepository for InMemoryStore {
    async fn create(&self, new_tenant: NewTenant) -> Result<Tenant> {
        let tenant = Tenant::from_new(new_tenant);
        self.tenants.write().await.insert(tenant.id, tenant.clone());
        Ok(tenant)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Tenant>> {
        Ok(self.tenants.read().await.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Tenant>> {
        let mut tenants: Vec<Tenant> = self.tenants.read().await.values().cloned().collect();
        tenants.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(tenants)
    }

    async fn update(&self, id: Uuid, update: TenantUpdate) -> Result<Option<Tenant>> {
        let mut tenants = self.tenants.write().await;
        Ok(tenants.get_mut(&id).map(|tenant| {
            tenant.apply(&update);
            tenant.clone()
        }))
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let removed = self.tenants.write().await.remove(&id).is_some();
        if removed {
            // Mirror ON DELETE SET NULL
            for user in self.users.write().await.values_mut() {
                if user.tenant_id == Some(id) {
                    user.tenant_id = None;
                }
            }
        }
        Ok(removed)
    }
}

#[async_trait]
impl RefreshTokenRepository for InMemoryStore {
    async fn create(&self, user_id: Uuid, expires_at: DateTime<Utc>) -> Result<RefreshTokenRecord> {
        let record = RefreshTokenRecord {
            id: Uuid::new_v4(),
            user_id,
            expires_at,
            created_at: Utc::now(),
        };
        self.refresh_tokens
            .write()
            .await
            .insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<RefreshTokenRecord>> {
        Ok(self.refresh_tokens.read().await.get(&id).cloned())
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        Ok(self.refresh_tokens.write().await.remove(&id).is_some())
    }

    async fn delete_for_user(&self, user_id: Uuid) -> Result<u64> {
        let mut tokens = self.refresh_tokens.write().await;
        let before = tokens.len();
        tokens.retain(|_, record| record.user_id != user_id);
        Ok((before - tokens.len()) as u64)
    }
}
