//! Token issuer
//!
//! Issues access/refresh token pairs and owns the refresh token record
//! lifecycle: a record is persisted before its refresh token is signed, and
//! deleting it revokes the token.

use super::jwt::{now_secs, AccessClaims, JwtConfig, JwtError, RefreshClaims};
use chrono::{Duration, Utc};
use gatehouse_core::{
    CoreError, RefreshTokenRecord, RefreshTokenRepository, Role, User, ACCESS_TOKEN_TTL_SECS,
    REFRESH_TOKEN_TTL_SECS,
};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Token issuing errors
#[derive(Debug, Error)]
pub enum TokenError {
    #[error(transparent)]
    Jwt(#[from] JwtError),

    #[error(transparent)]
    Store(#[from] CoreError),
}

/// A freshly issued token pair
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Record backing `refresh_token`
    pub record: RefreshTokenRecord,
}

/// Signs tokens and manages refresh token records
#[derive(Clone)]
pub struct TokenService {
    jwt: Arc<JwtConfig>,
    store: Arc<dyn RefreshTokenRepository>,
}

impl TokenService {
    pub fn new(jwt: Arc<JwtConfig>, store: Arc<dyn RefreshTokenRepository>) -> Self {
        Self { jwt, store }
    }

    pub fn jwt(&self) -> &JwtConfig {
        &self.jwt
    }

    /// Sign a one-hour RS256 access token for `user_id`
    pub fn issue_access_token(&self, user_id: Uuid, role: Role) -> Result<String, JwtError> {
        let iat = now_secs()?;
        let claims = AccessClaims {
            iss: self.jwt.issuer.clone(),
            sub: user_id.to_string(),
            role,
            iat,
            exp: iat + ACCESS_TOKEN_TTL_SECS,
        };
        self.jwt.encode_access(&claims)
    }

    /// Sign a one-year HS256 refresh token bound to record `token_id`
    pub fn issue_refresh_token(
        &self,
        user_id: Uuid,
        role: Role,
        token_id: Uuid,
    ) -> Result<String, JwtError> {
        let iat = now_secs()?;
        let token_id = token_id.to_string();
        let claims = RefreshClaims {
            iss: self.jwt.issuer.clone(),
            sub: user_id.to_string(),
            role,
            jti: token_id.clone(),
            token_id,
            iat,
            exp: iat + REFRESH_TOKEN_TTL_SECS,
        };
        self.jwt.encode_refresh(&claims)
    }

    /// Create the record a new refresh token will reference
    pub async fn persist_refresh_token(&self, user_id: Uuid) -> Result<RefreshTokenRecord, CoreError> {
        let expires_at = Utc::now() + Duration::seconds(REFRESH_TOKEN_TTL_SECS as i64);
        self.store.create(user_id, expires_at).await
    }

    /// Delete a refresh token record; a missing record is not an error
    pub async fn revoke(&self, token_id: Uuid) -> Result<(), CoreError> {
        let removed = self.store.delete(token_id).await?;
        if !removed {
            tracing::debug!(token_id = %token_id, "Refresh token record already gone");
        }
        Ok(())
    }

    /// Persist a record, then sign both tokens for `user`
    pub async fn issue_pair(&self, user: &User) -> Result<TokenPair, TokenError> {
        let record = self.persist_refresh_token(user.id).await?;
        let access_token = self.issue_access_token(user.id, user.role)?;
        let refresh_token = self.issue_refresh_token(user.id, user.role, record.id)?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            record,
        })
    }
}
