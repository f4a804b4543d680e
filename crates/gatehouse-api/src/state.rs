//! Application state management

use crate::auth::jwt::JwtConfig;
use crate::auth::password::CredentialVerifier;
use crate::auth::tokens::TokenService;
use gatehouse_core::config::AppConfig;
use gatehouse_core::{CoreError, Repositories};
use std::sync::Arc;
use std::time::Instant;

/// Application state shared across handlers and middleware
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Directory and refresh token store
    pub repos: Repositories,
    /// Token issuer
    pub tokens: TokenService,
    /// Password hashing
    pub credentials: CredentialVerifier,
    /// Server start time
    pub start_time: Instant,
}

impl AppState {
    /// Build state from configuration, failing if signing keys are missing
    pub fn new(config: AppConfig, repos: Repositories) -> Result<Self, CoreError> {
        let jwt = JwtConfig::from_auth_config(&config.auth)
            .map_err(|e| CoreError::ConfigError(e.to_string()))?;
        jwt.ensure_configured()
            .map_err(|e| CoreError::ConfigError(e.to_string()))?;

        let credentials = CredentialVerifier::new(&config.password)
            .map_err(|e| CoreError::ConfigError(e.to_string()))?;

        let tokens = TokenService::new(Arc::new(jwt), repos.refresh_tokens.clone());

        Ok(Self {
            config,
            repos,
            tokens,
            credentials,
            start_time: Instant::now(),
        })
    }

    /// Whether auth cookies carry the `Secure` attribute
    pub fn cookie_secure(&self) -> bool {
        self.config.auth.cookie_secure
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_keys_fail_startup() {
        let (repos, _) = Repositories::in_memory();
        let result = AppState::new(AppConfig::default(), repos);
        assert!(matches!(result, Err(CoreError::ConfigError(msg)) if msg.contains("PRIVATE_KEY")));
    }

    #[test]
    fn test_state_from_fixture_config() {
        let (repos, _) = Repositories::in_memory();
        let state = AppState::new(crate::testing::test_config(), repos).unwrap();
        assert!(!state.cookie_secure());
        assert_eq!(state.tokens.jwt().issuer, "auth-service");
    }
}
