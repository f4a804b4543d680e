//! Directory and token store models
//!
//! This module defines the core data structures of the access-control system:
//! - User: account with credentials, role, and optional tenant membership
//! - Tenant: named organization users can belong to
//! - RefreshTokenRecord: server-side identity of an outstanding refresh token
//!
//! These models map to the tables defined in `migrations/`.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::REFRESH_TOKEN_TTL_SECS;

/// User role enum
///
/// Defines the access level for a user:
/// - Admin: manages tenants and users
/// - Manager: operates a tenant
/// - Customer: default role for self-registered accounts
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    #[default]
    Customer,
}

impl Role {
    /// All roles, in decreasing order of privilege
    pub const ALL: [Role; 3] = [Role::Admin, Role::Manager, Role::Customer];

    /// Convert role to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Customer => "customer",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "manager" => Ok(Role::Manager),
            "customer" => Ok(Role::Customer),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// User account model
///
/// Maps to the `users` table. The password hash is never serialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    /// Unique, used for login
    pub email: String,
    /// Argon2id PHC string
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Build a user record from creation fields, assigning a fresh id
    pub fn from_new(new_user: NewUser) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            email: new_user.email,
            password_hash: new_user.password_hash,
            role: new_user.role,
            tenant_id: new_user.tenant_id,
            created_at: now,
            updated_at: now,
        }
    }

    /// Convert user to public representation (without the password hash)
    pub fn to_public(&self) -> UserPublic {
        UserPublic {
            id: self.id,
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
            role: self.role,
            tenant_id: self.tenant_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    /// Apply a partial update in place
    pub fn apply(&mut self, update: &UserUpdate) {
        if let Some(first_name) = &update.first_name {
            self.first_name = first_name.clone();
        }
        if let Some(last_name) = &update.last_name {
            self.last_name = last_name.clone();
        }
        if let Some(role) = update.role {
            self.role = role;
        }
        if let Some(tenant_id) = update.tenant_id {
            self.tenant_id = Some(tenant_id);
        }
        self.updated_at = Utc::now();
    }
}

/// Public user representation (safe for API responses)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserPublic {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to create a user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub tenant_id: Option<Uuid>,
}

/// Partial user update (profile, role, tenant membership)
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<Role>,
    pub tenant_id: Option<Uuid>,
}

/// One page of users
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserPage {
    pub current_page: u32,
    pub per_page: u32,
    pub total_count: u64,
    pub data: Vec<UserPublic>,
}

/// Tenant (organization) model
///
/// Maps to the `tenants` table.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    /// Admin who created the tenant
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tenant {
    pub fn from_new(new_tenant: NewTenant) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: new_tenant.name,
            address: new_tenant.address,
            created_by: new_tenant.created_by,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, update: &TenantUpdate) {
        if let Some(name) = &update.name {
            self.name = name.clone();
        }
        if let Some(address) = &update.address {
            self.address = address.clone();
        }
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone)]
pub struct NewTenant {
    pub name: String,
    pub address: String,
    pub created_by: Option<Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct TenantUpdate {
    pub name: Option<String>,
    pub address: Option<String>,
}

/// Refresh token record
///
/// One record per issued refresh token. The record's id is embedded in the
/// token as its `tokenId`/`jti` claim; a refresh token is accepted only
/// while its record exists, so deleting the record revokes the token.
///
/// This maps to the `refresh_tokens` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshTokenRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl RefreshTokenRecord {
    /// Create a record for `user_id` expiring one year from now
    pub fn new(user_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            expires_at: now + Duration::seconds(REFRESH_TOKEN_TTL_SECS as i64),
            created_at: now,
        }
    }

    /// Check if the record is past its expiry
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }

    /// Check if the record belongs to `user_id`
    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.user_id == user_id
    }
}
