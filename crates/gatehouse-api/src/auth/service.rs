//! Authentication service layer
//!
//! Business logic for registration, login, refresh rotation and logout.
//! Handlers stay thin: they extract input and cookies, call into here, and
//! write cookies back.

use super::middleware::AuthenticatedUser;
use super::password::CredentialVerifier;
use super::tokens::{TokenPair, TokenService};
use crate::audit::{audit_log, AuditEvent, ClientInfo};
use crate::error::AppError;
use crate::extractors::trimmed;
use crate::state::AppState;
use gatehouse_core::{NewUser, Role, User, UserRepository};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// User registration request
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
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
}

/// User login request
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Registration, login, refresh and logout
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    tokens: TokenService,
    credentials: CredentialVerifier,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        tokens: TokenService,
        credentials: CredentialVerifier,
    ) -> Self {
        Self {
            users,
            tokens,
            credentials,
        }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(
            state.repos.users.clone(),
            state.tokens.clone(),
            state.credentials.clone(),
        )
    }

    /// Create a customer account and sign it in
    pub async fn register(
        &self,
        request: RegisterRequest,
        client: &ClientInfo,
    ) -> Result<(User, TokenPair), AppError> {
        if self
            .users
            .find_by_email_with_password(&request.email)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict("Email already exists".to_string()));
        }

        let password_hash = self.credentials.hash(request.password).await?;
        let user = self
            .users
            .create(NewUser {
                first_name: request.first_name,
                last_name: request.last_name,
                email: request.email,
                password_hash,
                role: Role::Customer,
                tenant_id: None,
            })
            .await?;

        audit_log(&AuditEvent::Registration {
            user_id: user.id,
            role: user.role,
            created_by: None,
            ip_address: client.ip_address.clone(),
        });

        let pair = self.tokens.issue_pair(&user).await?;
        Ok((user, pair))
    }

    /// Check credentials and issue a token pair
    ///
    /// Unknown email and wrong password produce the same error, and both
    /// spend one Argon2 verification.
    pub async fn login(
        &self,
        request: LoginRequest,
        client: &ClientInfo,
    ) -> Result<(User, TokenPair), AppError> {
        let fail = |reason: &str| {
            audit_log(&AuditEvent::LoginFailure {
                reason: reason.to_string(),
                ip_address: client.ip_address.clone(),
                user_agent: client.user_agent.clone(),
            });
            AppError::InvalidCredentials
        };

        let Some(user) = self
            .users
            .find_by_email_with_password(&request.email)
            .await?
        else {
            self.credentials.verify_dummy(request.password).await;
            return Err(fail("unknown email"));
        };

        let matches = self
            .credentials
            .verify(request.password, user.password_hash.clone())
            .await?;
        if !matches {
            return Err(fail("password mismatch"));
        }

        let pair = self.tokens.issue_pair(&user).await?;

        audit_log(&AuditEvent::LoginSuccess {
            user_id: user.id,
            ip_address: client.ip_address.clone(),
            user_agent: client.user_agent.clone(),
        });

        Ok((user, pair))
    }

    /// Rotate the refresh token the caller authenticated with
    ///
    /// The old record is deleted before the new one is created. This is not
    /// transactional: two concurrent refreshes with the same token can both
    /// pass the revocation check before either delete lands.
    pub async fn refresh(
        &self,
        identity: &AuthenticatedUser,
        client: &ClientInfo,
    ) -> Result<(User, TokenPair), AppError> {
        let old_token_id = identity.token_id.ok_or_else(AppError::unauthorized)?;

        let user = self
            .users
            .find_by_id(identity.user_id)
            .await?
            .ok_or_else(AppError::unauthorized)?;

        self.tokens.revoke(old_token_id).await?;
        let pair = self.tokens.issue_pair(&user).await?;

        audit_log(&AuditEvent::TokenRefresh {
            user_id: user.id,
            revoked_token_id: old_token_id,
            issued_token_id: pair.record.id,
            ip_address: client.ip_address.clone(),
        });

        Ok((user, pair))
    }

    /// Revoke the caller's refresh token, if one was presented
    ///
    /// The refresh token is only signature-checked here; it is revoked when
    /// it belongs to the access-token identity. A store failure is logged and
    /// does not fail the logout. Returns the id of the revoked record.
    pub async fn logout(
        &self,
        identity: &AuthenticatedUser,
        refresh_token: Option<&str>,
        client: &ClientInfo,
    ) -> Result<Option<Uuid>, AppError> {
        let token_id = refresh_token
            .and_then(|token| self.tokens.jwt().decode_refresh(token).ok())
            .filter(|claims| claims.sub == identity.user_id.to_string())
            .and_then(|claims| Uuid::parse_str(&claims.token_id).ok());

        let token_id = match token_id {
            Some(id) => match self.tokens.revoke(id).await {
                Ok(()) => Some(id),
                Err(e) => {
                    tracing::error!(
                        token_id = %id,
                        error = %e,
                        "Failed to revoke refresh token on logout"
                    );
                    None
                }
            },
            None => None,
        };

        audit_log(&AuditEvent::Logout {
            user_id: identity.user_id,
            revoked_token_id: token_id,
            ip_address: client.ip_address.clone(),
        });

        Ok(token_id)
    }

    /// The caller's own user record
    pub async fn current_user(&self, identity: &AuthenticatedUser) -> Result<User, AppError> {
        self.users
            .find_by_id(identity.user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{jwt_config, TestApp};
    use axum::async_trait;
    use chrono::{DateTime, Utc};
    use gatehouse_core::{CoreError, RefreshTokenRecord, RefreshTokenRepository};

    /// Token store whose deletes always fail
    struct BrokenDeletes(Arc<gatehouse_core::InMemoryStore>);

    #[async_trait]
    impl RefreshTokenRepository for BrokenDeletes {
        async fn create(
            &self,
            user_id: Uuid,
            expires_at: DateTime<Utc>,
        ) -> gatehouse_core::Result<RefreshTokenRecord> {
            RefreshTokenRepository::create(&*self.0, user_id, expires_at).await
        }

        async fn find_by_id(
            &self,
            id: Uuid,
        ) -> gatehouse_core::Result<Option<RefreshTokenRecord>> {
            RefreshTokenRepository::find_by_id(&*self.0, id).await
        }

        async fn delete(&self, _id: Uuid) -> gatehouse_core::Result<bool> {
            Err(CoreError::DatabaseError("connection reset".to_string()))
        }

        async fn delete_for_user(&self, _user_id: Uuid) -> gatehouse_core::Result<u64> {
            Err(CoreError::DatabaseError("connection reset".to_string()))
        }
    }

    fn register_request(email: &str) -> RegisterRequest {
        RegisterRequest {
            first_name: "A".to_string(),
            last_name: "B".to_string(),
            email: email.to_string(),
            password: "12345678".to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_stores_hash_not_plaintext() {
        let app = TestApp::new();
        let service = AuthService::from_state(&app.state);

        let (user, pair) = service
            .register(register_request("a@b.com"), &ClientInfo::default())
            .await
            .unwrap();

        assert_eq!(user.role, Role::Customer);
        assert_ne!(user.password_hash, "12345678");
        assert!(user.password_hash.starts_with("$argon2id$"));
        assert_eq!(app.store.refresh_tokens_for(user.id).await, vec![pair.record]);
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let app = TestApp::new();
        let service = AuthService::from_state(&app.state);

        service
            .register(register_request("a@b.com"), &ClientInfo::default())
            .await
            .unwrap();
        let result = service
            .register(register_request("a@b.com"), &ClientInfo::default())
            .await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
        assert_eq!(app.store.user_count().await, 1);
    }

    #[tokio::test]
    async fn test_login_collapses_failures() {
        let app = TestApp::new();
        let service = AuthService::from_state(&app.state);
        service
            .register(register_request("a@b.com"), &ClientInfo::default())
            .await
            .unwrap();

        let wrong_password = service
            .login(
                LoginRequest {
                    email: "a@b.com".to_string(),
                    password: "wrong-password".to_string(),
                },
                &ClientInfo::default(),
            )
            .await
            .unwrap_err();
        let unknown_email = service
            .login(
                LoginRequest {
                    email: "nobody@b.com".to_string(),
                    password: "12345678".to_string(),
                },
                &ClientInfo::default(),
            )
            .await
            .unwrap_err();

        assert_eq!(wrong_password.body().errors, unknown_email.body().errors);
        assert_eq!(app.store.refresh_token_count().await, 1);
    }

    #[tokio::test]
    async fn test_login_failures_both_verify_password() {
        let app = TestApp::new();
        let service = AuthService::from_state(&app.state);
        service
            .register(register_request("a@b.com"), &ClientInfo::default())
            .await
            .unwrap();

        let before = app.state.credentials.verification_count();
        service
            .login(
                LoginRequest {
                    email: "nobody@b.com".to_string(),
                    password: "12345678".to_string(),
                },
                &ClientInfo::default(),
            )
            .await
            .unwrap_err();
        let after_unknown = app.state.credentials.verification_count();
        service
            .login(
                LoginRequest {
                    email: "a@b.com".to_string(),
                    password: "wrong-password".to_string(),
                },
                &ClientInfo::default(),
            )
            .await
            .unwrap_err();
        let after_mismatch = app.state.credentials.verification_count();

        assert_eq!(after_unknown - before, 1);
        assert_eq!(after_mismatch - after_unknown, 1);
    }

    #[tokio::test]
    async fn test_refresh_rotates_record() {
        let app = TestApp::new();
        let service = AuthService::from_state(&app.state);
        let (user, pair) = service
            .register(register_request("a@b.com"), &ClientInfo::default())
            .await
            .unwrap();

        let identity = AuthenticatedUser {
            user_id: user.id,
            role: user.role,
            token_id: Some(pair.record.id),
        };
        let (_, rotated) = service
            .refresh(&identity, &ClientInfo::default())
            .await
            .unwrap();

        let records = app.store.refresh_tokens_for(user.id).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, rotated.record.id);
        assert_ne!(rotated.record.id, pair.record.id);
    }

    #[tokio::test]
    async fn test_logout_ignores_foreign_refresh_token() {
        let app = TestApp::new();
        let service = AuthService::from_state(&app.state);
        let (alice, alice_pair) = service
            .register(register_request("alice@b.com"), &ClientInfo::default())
            .await
            .unwrap();
        let (bob, _) = service
            .register(register_request("bob@b.com"), &ClientInfo::default())
            .await
            .unwrap();

        let bob_identity = AuthenticatedUser {
            user_id: bob.id,
            role: bob.role,
            token_id: None,
        };
        let revoked = service
            .logout(
                &bob_identity,
                Some(&alice_pair.refresh_token),
                &ClientInfo::default(),
            )
            .await
            .unwrap();

        assert_eq!(revoked, None);
        assert_eq!(app.store.refresh_tokens_for(alice.id).await.len(), 1);
    }

    #[tokio::test]
    async fn test_logout_survives_store_failure() {
        let app = TestApp::new();
        let (user, pair) = AuthService::from_state(&app.state)
            .register(register_request("a@b.com"), &ClientInfo::default())
            .await
            .unwrap();

        let tokens = TokenService::new(
            Arc::new(jwt_config()),
            Arc::new(BrokenDeletes(app.store.clone())),
        );
        let service = AuthService::new(
            app.state.repos.users.clone(),
            tokens,
            app.state.credentials.clone(),
        );
        let identity = AuthenticatedUser {
            user_id: user.id,
            role: user.role,
            token_id: None,
        };

        let revoked = service
            .logout(&identity, Some(&pair.refresh_token), &ClientInfo::default())
            .await
            .unwrap();

        assert_eq!(revoked, None);
        assert_eq!(app.store.refresh_tokens_for(user.id).await.len(), 1);
    }
}
