//! Authentication and authorization
//!
//! - `password`: Argon2id hashing and verification
//! - `jwt`: RS256 access and HS256 refresh token codecs
//! - `tokens`: issuing pairs and persisting refresh records
//! - `middleware`: the two authentication variants and role checks
//! - `cookies`: `accessToken` / `refreshToken` cookie attributes
//! - `service`: register, login, refresh and logout flows

pub mod cookies;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod service;
pub mod tokens;

pub use cookies::{clear_auth_cookies, set_auth_cookies};
pub use jwt::{AccessClaims, JwtConfig, JwtError, RefreshClaims};
pub use middleware::{
    access_token_middleware, authenticate_access, authenticate_refresh, authorize,
    refresh_token_middleware, require_roles, AuthError, AuthenticatedUser,
};
pub use password::{CredentialVerifier, PasswordError};
pub use service::{AuthService, LoginRequest, RegisterRequest};
pub use tokens::{TokenError, TokenPair, TokenService};
