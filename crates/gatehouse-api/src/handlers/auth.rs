//! Authentication API handlers
//!
//! Tokens travel only in cookies; response bodies carry the user id.

use super::IdResponse;
use crate::audit::ClientInfo;
use crate::auth::{
    clear_auth_cookies, set_auth_cookies, AuthService, AuthenticatedUser, LoginRequest,
    RegisterRequest,
};
use crate::error::AppError;
use crate::extractors::ValidatedJson;
use crate::state::AppState;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use axum_extra::extract::cookie::CookieJar;
use gatehouse_core::REFRESH_TOKEN_COOKIE;
use std::sync::Arc;

/// Register a new customer account
///
/// Sets `accessToken` and `refreshToken` cookies on success.
#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered", body = IdResponse),
        (status = 400, description = "Invalid input or email already exists", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError),
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    jar: CookieJar,
    ValidatedJson(request): ValidatedJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let client = ClientInfo::from_headers(&headers);
    let (user, pair) = AuthService::from_state(&state)
        .register(request, &client)
        .await?;

    let jar = set_auth_cookies(jar, &pair, state.cookie_secure());
    Ok((StatusCode::CREATED, jar, Json(IdResponse::new(user.id))))
}

/// Login with email and password
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = IdResponse),
        (status = 400, description = "Invalid input or credentials", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError),
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    jar: CookieJar,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let client = ClientInfo::from_headers(&headers);
    let (user, pair) = AuthService::from_state(&state)
        .login(request, &client)
        .await?;

    let jar = set_auth_cookies(jar, &pair, state.cookie_secure());
    Ok((jar, Json(IdResponse::new(user.id))))
}

/// Current user's profile
#[utoipa::path(
    get,
    path = "/auth/self",
    tag = "auth",
    responses(
        (status = 200, description = "Current user", body = gatehouse_core::UserPublic),
        (status = 401, description = "Not authenticated", body = crate::error::ApiError),
    )
)]
pub async fn self_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AuthenticatedUser>,
) -> Result<impl IntoResponse, AppError> {
    let user = AuthService::from_state(&state)
        .current_user(&identity)
        .await?;
    Ok(Json(user.to_public()))
}

/// Rotate the refresh token
///
/// The presented refresh token is revoked and a new pair is set in cookies.
#[utoipa::path(
    post,
    path = "/auth/refresh",
    tag = "auth",
    responses(
        (status = 200, description = "Tokens rotated", body = IdResponse),
        (status = 401, description = "Missing, invalid or revoked refresh token", body = crate::error::ApiError),
    )
)]
pub async fn refresh_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AuthenticatedUser>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    let client = ClientInfo::from_headers(&headers);
    let (user, pair) = AuthService::from_state(&state)
        .refresh(&identity, &client)
        .await?;

    let jar = set_auth_cookies(jar, &pair, state.cookie_secure());
    Ok((jar, Json(IdResponse::new(user.id))))
}

/// Logout: revoke the refresh token and clear both cookies
#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "auth",
    responses(
        (status = 200, description = "Logged out"),
        (status = 401, description = "Not authenticated", body = crate::error::ApiError),
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AuthenticatedUser>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    let client = ClientInfo::from_headers(&headers);
    let refresh_token = jar
        .get(REFRESH_TOKEN_COOKIE)
        .map(|cookie| cookie.value().to_string());

    AuthService::from_state(&state)
        .logout(&identity, refresh_token.as_deref(), &client)
        .await?;

    Ok((clear_auth_cookies(jar), Json(serde_json::json!({}))))
}
