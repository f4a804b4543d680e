//! PostgreSQL store
//!
//! Provides the user/tenant directory and the refresh token store using SQLx.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::{
    NewTenant, NewUser, RefreshTokenRecord, Role, Tenant, TenantUpdate, User, UserUpdate,
};
use crate::repository::{RefreshTokenRepository, TenantRepository, UserRepository};
use crate::{CoreError, Result};

/// PostgreSQL-backed repositories
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect with a pool of at most `max_connections`
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| CoreError::DatabaseError(format!("PostgreSQL connection failed: {e}")))?;

        Ok(Self { pool })
    }

    /// Apply pending schema migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| CoreError::DatabaseError(format!("Migration failed: {e}")))
    }
}

fn db_error(context: &str, err: sqlx::Error) -> CoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return CoreError::Conflict(format!("{context}: {}", db_err.message()));
        }
    }
    CoreError::DatabaseError(format!("{context}: {err}"))
}

/// User row from database
#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    first_name: String,
    last_name: String,
    email: String,
    password_hash: String,
    role: String,
    tenant_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = CoreError;

    fn try_from(row: UserRow) -> Result<Self> {
        let role: Role = row.role.parse().map_err(CoreError::DatabaseError)?;
        Ok(User {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            password_hash: row.password_hash,
            role,
            tenant_id: row.tenant_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct TenantRow {
    id: Uuid,
    name: String,
    address: String,
    created_by: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<TenantRow> for Tenant {
    fn from(row: TenantRow) -> Self {
        Tenant {
            id: row.id,
            name: row.name,
            address: row.address,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct RefreshTokenRow {
    id: Uuid,
    user_id: Uuid,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl From<RefreshTokenRow> for RefreshTokenRecord {
    fn from(row: RefreshTokenRow) -> Self {
        RefreshTokenRecord {
            id: row.id,
            user_id: row.user_id,
            expires_at: row.expires_at,
            created_at: row.created_at,
        }
    }
}

const USER_COLUMNS: &str =
    "id, first_name, last_name, email, password_hash, role, tenant_id, created_at, updated_at";

const TENANT_COLUMNS: &str = "id, name, address, created_by, created_at, updated_at";

#[async_trait]
impl UserRepository for PgStore {
    async fn find_by_email_with_password(&self, email: &str) -> Result<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
                .bind(email)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("Failed to find user by email", e))?;

        row.map(User::try_from).transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("Failed to get user", e))?;

        row.map(User::try_from).transpose()
    }

    async fn create(&self, new_user: NewUser) -> Result<User> {
        let user = User::from_new(new_user);
        let row: UserRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO users (
                id, first_name, last_name, email, password_hash, role, tenant_id,
                created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user.id)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.tenant_id)
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("Failed to create user", e))?;

        User::try_from(row)
    }

    async fn update(&self, id: Uuid, update: UserUpdate) -> Result<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            r#"
            UPDATE users SET
                first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                role = COALESCE($4, role),
                tenant_id = COALESCE($5, tenant_id),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(update.first_name)
        .bind(update.last_name)
        .bind(update.role.map(|r| r.as_str()))
        .bind(update.tenant_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to update user", e))?;

        row.map(User::try_from).transpose()
    }

    async fn list(&self, page: u32, limit: u32) -> Result<(Vec<User>, u64)> {
        let offset = i64::from(page.saturating_sub(1)) * i64::from(limit);
        let rows: Vec<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        ))
        .bind(i64::from(limit))
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list users", e))?;

        let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("Failed to count users", e))?;

        let users = rows
            .into_iter()
            .map(User::try_from)
            .collect::<Result<Vec<_>>>()?;

        Ok((users, total as u64))
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Failed to delete user", e))?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl TenantRepository for PgStore {
    async fn create(&self, new_tenant: NewTenant) -> Result<Tenant> {
        let tenant = Tenant::from_new(new_tenant);
        let row: TenantRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO tenants (id, name, address, created_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {TENANT_COLUMNS}
            "#
        ))
        .bind(tenant.id)
        .bind(&tenant.name)
        .bind(&tenant.address)
        .bind(tenant.created_by)
        .bind(tenant.created_at)
        .bind(tenant.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("Failed to create tenant", e))?;

        Ok(row.into())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Tenant>> {
        let row: Option<TenantRow> =
            sqlx::query_as(&format!("SELECT {TENANT_COLUMNS} FROM tenants WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("Failed to get tenant", e))?;

        Ok(row.map(Tenant::from))
    }

    async fn list(&self) -> Result<Vec<Tenant>> {
        let rows: Vec<TenantRow> = sqlx::query_as(&format!(
            "SELECT {TENANT_COLUMNS} FROM tenants ORDER BY created_at ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list tenants", e))?;

        Ok(rows.into_iter().map(Tenant::from).collect())
    }

    async fn update(&self, id: Uuid, update: TenantUpdate) -> Result<Option<Tenant>> {
        let row: Option<TenantRow> = sqlx::query_as(&format!(
            r#"
            UPDATE tenants SET
                name = COALESCE($2, name),
                address = COALESCE($3, address),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {TENANT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(update.name)
        .bind(update.address)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to update tenant", e))?;

        Ok(row.map(Tenant::from))
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM tenants WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Failed to delete tenant", e))?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl RefreshTokenRepository for PgStore {
    async fn create(&self, user_id: Uuid, expires_at: DateTime<Utc>) -> Result<RefreshTokenRecord> {
        let row: RefreshTokenRow = sqlx::query_as(
            r#"
            INSERT INTO refresh_tokens (id, user_id, expires_at)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, expires_at, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("Failed to persist refresh token", e))?;

        Ok(row.into())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<RefreshTokenRecord>> {
        let row: Option<RefreshTokenRow> = sqlx::query_as(
            "SELECT id, user_id, expires_at, created_at FROM refresh_tokens WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to get refresh token", e))?;

        Ok(row.map(RefreshTokenRecord::from))
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Failed to delete refresh token", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_for_user(&self, user_id: Uuid) -> Result<u64> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Failed to delete refresh tokens", e))?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_row_conversion() {
        let now = Utc::now();
        let row = UserRow {
            id: Uuid::new_v4(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            password_hash: "$argon2id$...".to_string(),
            role: "manager".to_string(),
            tenant_id: None,
            created_at: now,
            updated_at: now,
        };

        let user = User::try_from(row).unwrap();
        assert_eq!(user.role, Role::Manager);
        assert_eq!(user.email, "ada@example.com");
    }

    #[test]
    fn test_user_row_rejects_unknown_role() {
        let now = Utc::now();
        let row = UserRow {
            id: Uuid::new_v4(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            password_hash: String::new(),
            role: "superuser".to_string(),
            tenant_id: None,
            created_at: now,
            updated_at: now,
        };

        assert!(matches!(User::try_from(row), Err(CoreError::DatabaseError(_))));
    }
    /// Requires a running PostgreSQL; set DATABASE_URL and run with --ignored
    #[tokio::test]
    #[ignore]
    async fn test_postgres_user_and_token_lifecycle() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let store = PgStore::new(&url, 2).await.unwrap();
        store.migrate().await.unwrap();

        let email = format!("{}@example.com", Uuid::new_v4());
        let user = UserRepository::create(
            &store,
            NewUser {
                first_name: "Ada".to_string(),
                last_name: "Lovelace".to_string(),
                email: email.clone(),
                password_hash: "$argon2id$placeholder".to_string(),
                role: Role::Customer,
                tenant_id: None,
            },
        )
        .await
        .unwrap();

        let duplicate = UserRepository::create(
            &store,
            NewUser {
                first_name: "Ada".to_string(),
                last_name: "Again".to_string(),
                email,
                password_hash: String::new(),
                role: Role::Customer,
                tenant_id: None,
            },
        )
        .await;
        assert!(matches!(duplicate, Err(CoreError::Conflict(_))));

        let record = RefreshTokenRepository::create(&store, user.id, Utc::now())
            .await
            .unwrap();
        assert!(RefreshTokenRepository::find_by_id(&store, record.id)
            .await
            .unwrap()
            .is_some());

        assert!(UserRepository::delete(&store, user.id).await.unwrap());
        assert!(RefreshTokenRepository::find_by_id(&store, record.id)
            .await
            .unwrap()
            .is_none());
    }
}
