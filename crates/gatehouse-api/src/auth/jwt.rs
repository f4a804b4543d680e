//! JWT signing keys, claim sets and encode/decode primitives
//!
//! Access tokens are RS256-signed and verified with the public key alone, so
//! checking them needs no storage round-trip. Refresh tokens are HS256-signed
//! with a shared secret and carry the id of their server-side record.

use gatehouse_core::{AuthConfig, Role};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Claims embedded in an access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Token issuer
    pub iss: String,
    /// Subject - user ID
    pub sub: String,
    pub role: Role,
    /// Issued at timestamp (Unix epoch)
    pub iat: u64,
    /// Expiration timestamp (Unix epoch)
    pub exp: u64,
}

/// Claims embedded in a refresh token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub iss: String,
    pub sub: String,
    pub role: Role,
    /// Id of the backing refresh token record
    #[serde(rename = "tokenId")]
    pub token_id: String,
    /// Always equal to `token_id`
    pub jti: String,
    pub iat: u64,
    pub exp: u64,
}

/// JWT token generation and validation errors
#[derive(Debug, Error)]
pub enum JwtError {
    #[error("Failed to encode JWT: {0}")]
    EncodingError(#[from] jsonwebtoken::errors::Error),

    #[error("Invalid token format")]
    InvalidToken,

    #[error("Token has expired")]
    ExpiredToken,

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Invalid key material for {0}: {1}")]
    InvalidKey(&'static str, String),

    #[error("Signing key not configured: {0}")]
    MissingKey(&'static str),

    #[error("System time error: {0}")]
    SystemTimeError(#[from] std::time::SystemTimeError),
}

impl JwtError {
    /// Whether this error means the service itself is misconfigured
    pub fn is_config_error(&self) -> bool {
        matches!(self, JwtError::MissingKey(_) | JwtError::InvalidKey(..))
    }
}

/// Parsed signing material
///
/// Built once from `AuthConfig` and shared by the token issuer and the
/// authentication middleware. Keys are optional so a misconfiguration is
/// reported by `ensure_configured` instead of panicking at parse time.
#[derive(Clone)]
pub struct JwtConfig {
    access_encoding: Option<EncodingKey>,
    access_decoding: Option<DecodingKey>,
    refresh_encoding: Option<EncodingKey>,
    refresh_decoding: Option<DecodingKey>,
    /// Token issuer identifier
    pub issuer: String,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("access_private_key", &self.access_encoding.is_some())
            .field("access_public_key", &self.access_decoding.is_some())
            .field("refresh_secret", &self.refresh_encoding.is_some())
            .field("issuer", &self.issuer)
            .finish()
    }
}

impl JwtConfig {
    /// Parse PEM keys and the refresh secret
    pub fn from_auth_config(config: &AuthConfig) -> Result<Self, JwtError> {
        let access_encoding = config
            .private_key_pem
            .as_deref()
            .map(|pem| {
                EncodingKey::from_rsa_pem(pem.as_bytes())
                    .map_err(|e| JwtError::InvalidKey("PRIVATE_KEY", e.to_string()))
            })
            .transpose()?;

        let access_decoding = config
            .public_key_pem
            .as_deref()
            .map(|pem| {
                DecodingKey::from_rsa_pem(pem.as_bytes())
                    .map_err(|e| JwtError::InvalidKey("PUBLIC_KEY", e.to_string()))
            })
            .transpose()?;

        let secret = config
            .refresh_token_secret
            .as_deref()
            .filter(|s| !s.is_empty());

        Ok(Self {
            access_encoding,
            access_decoding,
            refresh_encoding: secret.map(|s| EncodingKey::from_secret(s.as_bytes())),
            refresh_decoding: secret.map(|s| DecodingKey::from_secret(s.as_bytes())),
            issuer: config.issuer.clone(),
        })
    }

    /// Fail unless every key needed to issue and verify tokens is present
    pub fn ensure_configured(&self) -> Result<(), JwtError> {
        self.access_encoding_key()?;
        self.access_decoding_key()?;
        self.refresh_encoding_key()?;
        Ok(())
    }

    fn access_encoding_key(&self) -> Result<&EncodingKey, JwtError> {
        self.access_encoding
            .as_ref()
            .ok_or(JwtError::MissingKey("PRIVATE_KEY"))
    }

    fn access_decoding_key(&self) -> Result<&DecodingKey, JwtError> {
        self.access_decoding
            .as_ref()
            .ok_or(JwtError::MissingKey("PUBLIC_KEY"))
    }

    fn refresh_encoding_key(&self) -> Result<&EncodingKey, JwtError> {
        self.refresh_encoding
            .as_ref()
            .ok_or(JwtError::MissingKey("REFRESH_TOKEN_SECRET"))
    }

    fn refresh_decoding_key(&self) -> Result<&DecodingKey, JwtError> {
        self.refresh_decoding
            .as_ref()
            .ok_or(JwtError::MissingKey("REFRESH_TOKEN_SECRET"))
    }

    fn validation(&self, algorithm: Algorithm) -> Validation {
        let mut validation = Validation::new(algorithm);
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        validation
    }

    /// Sign access claims with the RSA private key
    pub fn encode_access(&self, claims: &AccessClaims) -> Result<String, JwtError> {
        let key = self.access_encoding_key()?;
        Ok(encode(&Header::new(Algorithm::RS256), claims, key)?)
    }

    /// Verify signature, expiry and issuer of an access token
    pub fn decode_access(&self, token: &str) -> Result<AccessClaims, JwtError> {
        let key = self.access_decoding_key()?;
        decode::<AccessClaims>(token, key, &self.validation(Algorithm::RS256))
            .map(|data| data.claims)
            .map_err(map_decode_error)
    }

    /// Sign refresh claims with the HMAC secret
    pub fn encode_refresh(&self, claims: &RefreshClaims) -> Result<String, JwtError> {
        let key = self.refresh_encoding_key()?;
        Ok(encode(&Header::new(Algorithm::HS256), claims, key)?)
    }

    /// Verify signature, expiry and issuer of a refresh token
    ///
    /// This does not consult the refresh token store.
    pub fn decode_refresh(&self, token: &str) -> Result<RefreshClaims, JwtError> {
        let key = self.refresh_decoding_key()?;
        decode::<RefreshClaims>(token, key, &self.validation(Algorithm::HS256))
            .map(|data| data.claims)
            .map_err(map_decode_error)
    }
}

fn map_decode_error(err: jsonwebtoken::errors::Error) -> JwtError {
    match err.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::ExpiredToken,
        jsonwebtoken::errors::ErrorKind::InvalidSignature => JwtError::InvalidSignature,
        _ => JwtError::InvalidToken,
    }
}

/// Seconds since the Unix epoch
pub fn now_secs() -> Result<u64, JwtError> {
    Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    const PRIVATE_PEM: &str = include_str!("../../tests/fixtures/access_private.pem");
    const PUBLIC_PEM: &str = include_str!("../../tests/fixtures/access_public.pem");
    const OTHER_PUBLIC_PEM: &str = include_str!("../../tests/fixtures/other_public.pem");

    fn auth_config() -> AuthConfig {
        AuthConfig {
            private_key_pem: Some(PRIVATE_PEM.to_string()),
            public_key_pem: Some(PUBLIC_PEM.to_string()),
            refresh_token_secret: Some("refresh-secret".to_string()),
            ..Default::default()
        }
    }

    fn access_claims(exp_offset: i64) -> AccessClaims {
        let now = now_secs().unwrap();
        AccessClaims {
            iss: "auth-service".to_string(),
            sub: Uuid::new_v4().to_string(),
            role: Role::Manager,
            iat: now,
            exp: (now as i64 + exp_offset) as u64,
        }
    }

    fn refresh_claims() -> RefreshClaims {
        let now = now_secs().unwrap();
        let token_id = Uuid::new_v4().to_string();
        RefreshClaims {
            iss: "auth-service".to_string(),
            sub: Uuid::new_v4().to_string(),
            role: Role::Customer,
            token_id: token_id.clone(),
            jti: token_id,
            iat: now,
            exp: now + 3600,
        }
    }

    #[test]
    fn test_access_round_trip() {
        let config = JwtConfig::from_auth_config(&auth_config()).unwrap();
        let claims = access_claims(3600);

        let token = config.encode_access(&claims).unwrap();
        assert_eq!(token.split('.').count(), 3);
        assert_eq!(config.decode_access(&token).unwrap(), claims);
    }

    #[test]
    fn test_access_header_is_rs256() {
        let config = JwtConfig::from_auth_config(&auth_config()).unwrap();
        let token = config.encode_access(&access_claims(3600)).unwrap();
        let header = jsonwebtoken::decode_header(&token).unwrap();
        assert_eq!(header.alg, Algorithm::RS256);
    }

    #[test]
    fn test_access_wrong_public_key() {
        let signer = JwtConfig::from_auth_config(&auth_config()).unwrap();
        let verifier = JwtConfig::from_auth_config(&AuthConfig {
            public_key_pem: Some(OTHER_PUBLIC_PEM.to_string()),
            ..auth_config()
        })
        .unwrap();

        let token = signer.encode_access(&access_claims(3600)).unwrap();
        assert!(matches!(
            verifier.decode_access(&token),
            Err(JwtError::InvalidSignature)
        ));
    }

    #[test]
    fn test_expired_access_token() {
        let config = JwtConfig::from_auth_config(&auth_config()).unwrap();
        let token = config.encode_access(&access_claims(-7200)).unwrap();
        assert!(matches!(
            config.decode_access(&token),
            Err(JwtError::ExpiredToken)
        ));
    }

    #[test]
    fn test_wrong_issuer_rejected() {
        let config = JwtConfig::from_auth_config(&auth_config()).unwrap();
        let mut claims = access_claims(3600);
        claims.iss = "someone-else".to_string();

        let token = config.encode_access(&claims).unwrap();
        assert!(matches!(
            config.decode_access(&token),
            Err(JwtError::InvalidToken)
        ));
    }

    #[test]
    fn test_refresh_round_trip() {
        let config = JwtConfig::from_auth_config(&auth_config()).unwrap();
        let claims = refresh_claims();

        let token = config.encode_refresh(&claims).unwrap();
        let header = jsonwebtoken::decode_header(&token).unwrap();
        assert_eq!(header.alg, Algorithm::HS256);
        assert_eq!(config.decode_refresh(&token).unwrap(), claims);
    }

    #[test]
    fn test_refresh_token_rejected_as_access_token() {
        let config = JwtConfig::from_auth_config(&auth_config()).unwrap();
        let token = config.encode_refresh(&refresh_claims()).unwrap();
        assert!(config.decode_access(&token).is_err());
    }

    #[test]
    fn test_refresh_wrong_secret() {
        let signer = JwtConfig::from_auth_config(&auth_config()).unwrap();
        let verifier = JwtConfig::from_auth_config(&AuthConfig {
            refresh_token_secret: Some("another-secret".to_string()),
            ..auth_config()
        })
        .unwrap();

        let token = signer.encode_refresh(&refresh_claims()).unwrap();
        assert!(matches!(
            verifier.decode_refresh(&token),
            Err(JwtError::InvalidSignature)
        ));
    }

    #[test]
    fn test_missing_keys() {
        let config = JwtConfig::from_auth_config(&AuthConfig::default()).unwrap();

        let err = config.ensure_configured().unwrap_err();
        assert!(matches!(err, JwtError::MissingKey("PRIVATE_KEY")));
        assert!(err.is_config_error());

        assert!(matches!(
            config.encode_access(&access_claims(3600)),
            Err(JwtError::MissingKey(_))
        ));
        assert!(matches!(
            config.encode_refresh(&refresh_claims()),
            Err(JwtError::MissingKey("REFRESH_TOKEN_SECRET"))
        ));
    }

    #[test]
    fn test_invalid_pem() {
        let result = JwtConfig::from_auth_config(&AuthConfig {
            private_key_pem: Some("not a pem".to_string()),
            ..Default::default()
        });
        assert!(matches!(result, Err(JwtError::InvalidKey("PRIVATE_KEY", _))));
    }

    #[test]
    fn test_garbage_token() {
        let config = JwtConfig::from_auth_config(&auth_config()).unwrap();
        assert!(matches!(
            config.decode_access("invalid.token.here"),
            Err(JwtError::InvalidToken)
        ));
    }

    #[test]
    fn test_debug_hides_keys() {
        let config = JwtConfig::from_auth_config(&auth_config()).unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("refresh-secret"));
        assert!(debug.contains("auth-service"));
    }
}
