//! User administration handlers (admin only)

use super::IdResponse;
use crate::audit::{audit_log, AuditEvent, ClientInfo};
use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::extractors::{trimmed, IdPath, PageQuery, ValidatedJson};
use crate::state::AppState;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use gatehouse_core::{NewUser, Role, UserPage, UserPublic, UserUpdate};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Admin user creation request
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "First Name is required"))]
    pub first_name: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Last Name is required"))]
    pub last_name: String,
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 8, message = "Password must be at least 8 characters long"))]
    pub password: String,
    pub role: Role,
    #[serde(default)]
    pub tenant_id: Option<Uuid>,
}

/// Partial user update; absent fields are left unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, message = "First Name is required"))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, message = "Last Name is required"))]
    pub last_name: Option<String>,
    pub role: Option<Role>,
    pub tenant_id: Option<Uuid>,
}

fn user_not_found() -> AppError {
    AppError::NotFound("User not found".to_string())
}

/// 404 unless `tenant_id` is absent or names an existing tenant
async fn ensure_tenant_exists(state: &AppState, tenant_id: Option<Uuid>) -> Result<(), AppError> {
    let Some(tenant_id) = tenant_id else {
        return Ok(());
    };
    match state.repos.tenants.find_by_id(tenant_id).await? {
        Some(_) => Ok(()),
        None => Err(AppError::NotFound("Tenant not found".to_string())),
    }
}

/// Create a user with any role
#[utoipa::path(
    post,
    path = "/users",
    tag = "users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = IdResponse),
        (status = 400, description = "Invalid input or email already exists", body = crate::error::ApiError),
        (status = 403, description = "Admin role required", body = crate::error::ApiError),
        (status = 404, description = "Tenant not found", body = crate::error::ApiError),
    )
)]
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AuthenticatedUser>,
    headers: HeaderMap,
    ValidatedJson(request): ValidatedJson<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    ensure_tenant_exists(&state, request.tenant_id).await?;

    if state
        .repos
        .users
        .find_by_email_with_password(&request.email)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict("Email already exists".to_string()));
    }

    let password_hash = state.credentials.hash(request.password).await?;
    let user = state
        .repos
        .users
        .create(NewUser {
            first_name: request.first_name,
            last_name: request.last_name,
            email: request.email,
            password_hash,
            role: request.role,
            tenant_id: request.tenant_id,
        })
        .await?;

    audit_log(&AuditEvent::Registration {
        user_id: user.id,
        role: user.role,
        created_by: Some(identity.user_id),
        ip_address: ClientInfo::from_headers(&headers).ip_address,
    });

    Ok((StatusCode::CREATED, Json(IdResponse::new(user.id))))
}

/// List users, newest first
#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    params(
        ("page" = Option<u32>, Query, description = "Page number, default 1"),
        ("limit" = Option<u32>, Query, description = "Page size, default 6"),
    ),
    responses(
        (status = 200, description = "One page of users", body = UserPage),
        (status = 403, description = "Admin role required", body = crate::error::ApiError),
    )
)]
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    query: PageQuery,
) -> Result<Json<UserPage>, AppError> {
    let (page, limit) = (query.page(), query.limit());
    let (users, total_count) = state.repos.users.list(page, limit).await?;

    Ok(Json(UserPage {
        current_page: page,
        per_page: limit,
        total_count,
        data: users.iter().map(|u| u.to_public()).collect(),
    }))
}

/// Get a user by id
#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "users",
    params(("id" = String, Path, description = "User id (UUID)")),
    responses(
        (status = 200, description = "User", body = UserPublic),
        (status = 404, description = "User not found", body = crate::error::ApiError),
    )
)]
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    IdPath(id): IdPath,
) -> Result<Json<UserPublic>, AppError> {
    let user = state
        .repos
        .users
        .find_by_id(id)
        .await?
        .ok_or_else(user_not_found)?;
    Ok(Json(user.to_public()))
}

/// Update a user's profile, role or tenant
#[utoipa::path(
    patch,
    path = "/users/{id}",
    tag = "users",
    params(("id" = String, Path, description = "User id (UUID)")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = IdResponse),
        (status = 404, description = "User or tenant not found", body = crate::error::ApiError),
    )
)]
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    IdPath(id): IdPath,
    ValidatedJson(request): ValidatedJson<UpdateUserRequest>,
) -> Result<Json<IdResponse>, AppError> {
    ensure_tenant_exists(&state, request.tenant_id).await?;

    let update = UserUpdate {
        first_name: request.first_name,
        last_name: request.last_name,
        role: request.role,
        tenant_id: request.tenant_id,
    };

    let user = state
        .repos
        .users
        .update(id, update)
        .await?
        .ok_or_else(user_not_found)?;
    Ok(Json(IdResponse::new(user.id)))
}

/// Delete a user and every refresh token issued to them
#[utoipa::path(
    delete,
    path = "/users/{id}",
    tag = "users",
    params(("id" = String, Path, description = "User id (UUID)")),
    responses(
        (status = 200, description = "User deleted", body = IdResponse),
        (status = 404, description = "User not found", body = crate::error::ApiError),
    )
)]
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    IdPath(id): IdPath,
) -> Result<Json<IdResponse>, AppError> {
    if state.repos.users.find_by_id(id).await?.is_none() {
        return Err(user_not_found());
    }

    let revoked = state.repos.refresh_tokens.delete_for_user(id).await?;
    if !state.repos.users.delete(id).await? {
        return Err(user_not_found());
    }

    tracing::info!(user_id = %id, revoked_tokens = revoked, "User deleted");
    Ok(Json(IdResponse::new(id)))
}
