//! Authentication and authorization middleware
//!
//! `access_token_middleware` and `refresh_token_middleware` verify a token and
//! insert an `AuthenticatedUser` into request extensions; handlers read it with
//! `Extension<AuthenticatedUser>`. `require_roles` layers role checks on top.
//!
//! Layer order matters: role checks must run inside authentication.
//!
//! ```ignore
//! let admin = Router::new()
//!     .route("/tenants", post(create_tenant))
//!     .route_layer(middleware::from_fn(require_roles(&[Role::Admin])))
//!     .route_layer(middleware::from_fn_with_state(state.clone(), access_token_middleware));
//! ```

use super::jwt::{AccessClaims, JwtConfig, JwtError, RefreshClaims};
use crate::audit::{audit_log, extract_ip_address, extract_user_agent, AuditEvent, TokenKind};
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use gatehouse_core::{RefreshTokenRepository, Role, ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Identity of the caller, established by one of the authentication variants
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub role: Role,
    /// Refresh token record id; set only by the refresh variant
    pub token_id: Option<Uuid>,
}

impl TryFrom<AccessClaims> for AuthenticatedUser {
    type Error = AuthError;

    fn try_from(claims: AccessClaims) -> Result<Self, Self::Error> {
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::MalformedClaims)?;
        Ok(Self {
            user_id,
            role: claims.role,
            token_id: None,
        })
    }
}

impl TryFrom<RefreshClaims> for AuthenticatedUser {
    type Error = AuthError;

    fn try_from(claims: RefreshClaims) -> Result<Self, Self::Error> {
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::MalformedClaims)?;
        let token_id =
            Uuid::parse_str(&claims.token_id).map_err(|_| AuthError::MalformedClaims)?;
        if claims.jti != claims.token_id {
            return Err(AuthError::MalformedClaims);
        }
        Ok(Self {
            user_id,
            role: claims.role,
            token_id: Some(token_id),
        })
    }
}

/// Authentication and authorization failures
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing token")]
    MissingToken,

    #[error("Invalid token: {0}")]
    InvalidToken(#[from] JwtError),

    #[error("Malformed token claims")]
    MalformedClaims,

    #[error("Token has been revoked")]
    TokenRevoked,

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Insufficient permissions")]
    InsufficientPermissions,
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidToken(e) if e.is_config_error() => AppError::Config(e.to_string()),
            AuthError::InsufficientPermissions => AppError::forbidden(),
            _ => AppError::unauthorized(),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        AppError::from(self).into_response()
    }
}

/// Read a token from `cookie_name`, falling back to a Bearer header
fn token_from_request(headers: &HeaderMap, cookie_name: &str, allow_bearer: bool) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    if let Some(cookie) = jar.get(cookie_name) {
        return Some(cookie.value().to_string());
    }
    if !allow_bearer {
        return None;
    }
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
}

/// Verify an access token without touching storage
pub fn authenticate_access(jwt: &JwtConfig, token: &str) -> Result<AuthenticatedUser, AuthError> {
    let claims = jwt.decode_access(token)?;
    AuthenticatedUser::try_from(claims)
}

/// Verify a refresh token and check it has not been revoked
///
/// The token is rejected unless its record exists and belongs to the
/// claimed subject. A store failure is treated as revoked.
pub async fn authenticate_refresh(
    jwt: &JwtConfig,
    store: &dyn RefreshTokenRepository,
    token: &str,
) -> Result<AuthenticatedUser, AuthError> {
    let claims = jwt.decode_refresh(token)?;
    let user = AuthenticatedUser::try_from(claims)?;
    let token_id = user.token_id.ok_or(AuthError::MalformedClaims)?;

    match store.find_by_id(token_id).await {
        Ok(Some(record)) if record.is_owned_by(user.user_id) => Ok(user),
        Ok(Some(_)) => {
            tracing::warn!(token_id = %token_id, "Refresh token record owned by another user");
            Err(AuthError::TokenRevoked)
        }
        Ok(None) => Err(AuthError::TokenRevoked),
        Err(e) => {
            tracing::error!(token_id = %token_id, error = %e, "Refresh token lookup failed");
            Err(AuthError::TokenRevoked)
        }
    }
}

fn reject(token_kind: TokenKind, headers: &HeaderMap, err: AuthError) -> AuthError {
    audit_log(&AuditEvent::InvalidToken {
        token_kind,
        reason: err.to_string(),
        ip_address: extract_ip_address(headers),
        user_agent: extract_user_agent(headers),
    });
    err
}

/// Require a valid access token (cookie `accessToken` or Bearer header)
pub async fn access_token_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let token = token_from_request(request.headers(), ACCESS_TOKEN_COOKIE, true)
        .ok_or_else(|| reject(TokenKind::Access, request.headers(), AuthError::MissingToken))?;

    let user = authenticate_access(state.tokens.jwt(), &token)
        .map_err(|e| reject(TokenKind::Access, request.headers(), e))?;

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Require a valid, unrevoked refresh token (cookie `refreshToken`)
pub async fn refresh_token_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let token = token_from_request(request.headers(), REFRESH_TOKEN_COOKIE, false)
        .ok_or_else(|| reject(TokenKind::Refresh, request.headers(), AuthError::MissingToken))?;

    let user = authenticate_refresh(
        state.tokens.jwt(),
        state.repos.refresh_tokens.as_ref(),
        &token,
    )
    .await
    .map_err(|e| reject(TokenKind::Refresh, request.headers(), e))?;

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Decide whether `identity` may proceed given the endpoint's allowed roles
///
/// No identity is 401; an identity whose role is not listed is 403.
pub fn authorize(identity: Option<&AuthenticatedUser>, allowed: &[Role]) -> Result<(), AuthError> {
    let user = identity.ok_or(AuthError::Unauthenticated)?;
    if allowed.contains(&user.role) {
        Ok(())
    } else {
        Err(AuthError::InsufficientPermissions)
    }
}

/// Type alias for role middleware future
type RoleMiddlewareFuture =
    std::pin::Pin<Box<dyn std::future::Future<Output = Result<Response, AuthError>> + Send>>;

/// Middleware factory restricting a route to `allowed` roles
pub fn require_roles(
    allowed: &'static [Role],
) -> impl Fn(Request<Body>, Next) -> RoleMiddlewareFuture + Clone {
    move |request: Request<Body>, next: Next| {
        Box::pin(async move {
            let identity = request.extensions().get::<AuthenticatedUser>();

            if let Err(err) = authorize(identity, allowed) {
                if let Some(user) = identity {
                    audit_log(&AuditEvent::AccessDenied {
                        user_id: user.user_id,
                        role: user.role,
                        required_roles: allowed.to_vec(),
                        resource: format!("{} {}", request.method(), request.uri().path()),
                        ip_address: extract_ip_address(request.headers()),
                    });
                }
                return Err(err);
            }

            Ok(next.run(request).await)
        })
    }
}
