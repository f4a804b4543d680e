//! Tenant handlers
//!
//! Reads are open; writes are mounted behind the admin role check.

use super::IdResponse;
use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::extractors::{IdPath, ValidatedJson};
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use gatehouse_core::{NewTenant, Tenant, TenantUpdate};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use validator::Validate;

/// Tenant creation request
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateTenantRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 100, message = "Tenant name must be 1-100 characters"))]
    pub name: String,
    #[serde(default)]
    #[validate(length(min = 1, max = 255, message = "Tenant address must be 1-255 characters"))]
    pub address: String,
}

/// Partial tenant update; absent fields are left unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateTenantRequest {
    #[validate(length(min = 1, max = 100, message = "Tenant name must be 1-100 characters"))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 255, message = "Tenant address must be 1-255 characters"))]
    pub address: Option<String>,
}

fn tenant_not_found() -> AppError {
    AppError::NotFound("Tenant not found".to_string())
}

/// Create a tenant
#[utoipa::path(
    post,
    path = "/tenants",
    tag = "tenants",
    request_body = CreateTenantRequest,
    responses(
        (status = 201, description = "Tenant created", body = IdResponse),
        (status = 400, description = "Invalid input", body = crate::error::ApiError),
        (status = 401, description = "Not authenticated", body = crate::error::ApiError),
        (status = 403, description = "Admin role required", body = crate::error::ApiError),
    )
)]
pub async fn create_tenant(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AuthenticatedUser>,
    ValidatedJson(request): ValidatedJson<CreateTenantRequest>,
) -> Result<impl IntoResponse, AppError> {
    let tenant = state
        .repos
        .tenants
        .create(NewTenant {
            name: request.name,
            address: request.address,
            created_by: Some(identity.user_id),
        })
        .await?;

    tracing::info!(tenant_id = %tenant.id, created_by = %identity.user_id, "Tenant created");
    Ok((StatusCode::CREATED, Json(IdResponse::new(tenant.id))))
}

/// List all tenants
#[utoipa::path(
    get,
    path = "/tenants",
    tag = "tenants",
    responses(
        (status = 200, description = "All tenants", body = Vec<Tenant>),
    )
)]
pub async fn list_tenants(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Tenant>>, AppError> {
    Ok(Json(state.repos.tenants.list().await?))
}

/// Get a tenant by id
#[utoipa::path(
    get,
    path = "/tenants/{id}",
    tag = "tenants",
    params(("id" = String, Path, description = "Tenant id (UUID)")),
    responses(
        (status = 200, description = "Tenant", body = Tenant),
        (status = 400, description = "Malformed id", body = crate::error::ApiError),
        (status = 404, description = "Tenant not found", body = crate::error::ApiError),
    )
)]
pub async fn get_tenant(
    State(state): State<Arc<AppState>>,
    IdPath(id): IdPath,
) -> Result<Json<Tenant>, AppError> {
    state
        .repos
        .tenants
        .find_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(tenant_not_found)
}

/// Update a tenant
#[utoipa::path(
    patch,
    path = "/tenants/{id}",
    tag = "tenants",
    params(("id" = String, Path, description = "Tenant id (UUID)")),
    request_body = UpdateTenantRequest,
    responses(
        (status = 200, description = "Tenant updated", body = IdResponse),
        (status = 404, description = "Tenant not found", body = crate::error::ApiError),
    )
)]
pub async fn update_tenant(
    State(state): State<Arc<AppState>>,
    IdPath(id): IdPath,
    ValidatedJson(request): ValidatedJson<UpdateTenantRequest>,
) -> Result<Json<IdResponse>, AppError> {
    let update = TenantUpdate {
        name: request.name,
        address: request.address,
    };

    let tenant = state
        .repos
        .tenants
        .update(id, update)
        .await?
        .ok_or_else(tenant_not_found)?;
    Ok(Json(IdResponse::new(tenant.id)))
}

/// Delete a tenant; members keep their accounts with no tenant
#[utoipa::path(
    delete,
    path = "/tenants/{id}",
    tag = "tenants",
    params(("id" = String, Path, description = "Tenant id (UUID)")),
    responses(
        (status = 200, description = "Tenant deleted", body = IdResponse),
        (status = 404, description = "Tenant not found", body = crate::error::ApiError),
    )
)]
pub async fn delete_tenant(
    State(state): State<Arc<AppState>>,
    IdPath(id): IdPath,
) -> Result<Json<IdResponse>, AppError> {
    if !state.repos.tenants.delete(id).await? {
        return Err(tenant_not_found());
    }

    tracing::info!(tenant_id = %id, "Tenant deleted");
    Ok(Json(IdResponse::new(id)))
}
