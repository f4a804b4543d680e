//! Password hashing and verification using Argon2id
//!
//! Hashes are stored as PHC strings, which carry the algorithm, cost
//! parameters and salt alongside the digest. Both operations are CPU-bound
//! and run on the blocking thread pool.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, Params,
};
use gatehouse_core::PasswordHashingConfig;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Password hashing and verification errors
#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("Password must not be empty")]
    EmptyPassword,

    #[error("Failed to hash password: {0}")]
    HashingFailed(String),

    #[error("Failed to verify password: {0}")]
    VerificationFailed(String),

    #[error("Invalid password hash format")]
    InvalidHashFormat,
}

/// Argon2id hasher and verifier with fixed cost parameters
///
/// Clones share the dummy hash and the verification counter.
#[derive(Debug, Clone)]
pub struct CredentialVerifier {
    params: Params,
    /// Hash of a throwaway password with the configured parameters, verified
    /// against when no stored hash exists so both login failures cost the same
    dummy_hash: Arc<str>,
    verifications: Arc<AtomicU64>,
}

impl CredentialVerifier {
    pub fn new(config: &PasswordHashingConfig) -> Result<Self, PasswordError> {
        let params = Params::new(
            config.memory_cost,
            config.time_cost,
            config.parallelism,
            Some(32),
        )
        .map_err(|e| PasswordError::HashingFailed(e.to_string()))?;

        let mut verifier = Self {
            params,
            dummy_hash: Arc::from(""),
            verifications: Arc::new(AtomicU64::new(0)),
        };
        verifier.dummy_hash = Arc::from(verifier.hash_blocking("gatehouse-dummy-password")?);
        Ok(verifier)
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(
            argon2::Algorithm::Argon2id,
            argon2::Version::V0x13,
            self.params.clone(),
        )
    }

    /// Hash a plaintext password into a PHC string
    pub fn hash_blocking(&self, password: &str) -> Result<String, PasswordError> {
        if password.is_empty() {
            return Err(PasswordError::EmptyPassword);
        }

        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| PasswordError::HashingFailed(e.to_string()))?;

        Ok(hash.to_string())
    }

    /// Check a plaintext password against a stored PHC string
    ///
    /// Returns `Ok(false)` on mismatch; a malformed stored hash is an error.
    pub fn verify_blocking(&self, password: &str, hash: &str) -> Result<bool, PasswordError> {
        self.verifications.fetch_add(1, Ordering::Relaxed);
        let parsed = PasswordHash::new(hash).map_err(|_| PasswordError::InvalidHashFormat)?;

        // Parameters are read from the PHC string, not from `self`
        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(PasswordError::VerificationFailed(e.to_string())),
        }
    }

    pub async fn hash(&self, password: String) -> Result<String, PasswordError> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.hash_blocking(&password))
            .await
            .map_err(|e| PasswordError::HashingFailed(e.to_string()))?
    }

    pub async fn verify(&self, password: String, hash: String) -> Result<bool, PasswordError> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.verify_blocking(&password, &hash))
            .await
            .map_err(|e| PasswordError::VerificationFailed(e.to_string()))?
    }

    /// Spend one verification on the dummy hash; the result is discarded
    pub async fn verify_dummy(&self, password: String) {
        let dummy = self.dummy_hash.to_string();
        if let Err(e) = self.verify(password, dummy).await {
            tracing::warn!(error = %e, "Dummy password verification failed");
        }
    }

    /// Number of verifications run through this verifier and its clones
    pub fn verification_count(&self) -> u64 {
        self.verifications.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn light() -> CredentialVerifier {
        CredentialVerifier::new(&PasswordHashingConfig {
            memory_cost: 8192,
            time_cost: 2,
            parallelism: 1,
        })
        .unwrap()
    }

    #[test]
    fn test_hash_and_verify_password() {
        let hasher = light();
        let hash = hasher.hash_blocking("12345678").expect("Failed to hash password");

        assert_ne!(hash, "12345678");
        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify_blocking("12345678", &hash).unwrap());
        assert!(!hasher.verify_blocking("87654321", &hash).unwrap());
    }

    #[test]
    fn test_same_password_produces_different_hashes() {
        let hasher = light();
        let hash1 = hasher.hash_blocking("SamePassword").unwrap();
        let hash2 = hasher.hash_blocking("SamePassword").unwrap();

        assert_ne!(hash1, hash2);
        assert!(hasher.verify_blocking("SamePassword", &hash1).unwrap());
        assert!(hasher.verify_blocking("SamePassword", &hash2).unwrap());
    }

    #[test]
    fn test_empty_password_rejected() {
        assert!(matches!(
            light().hash_blocking(""),
            Err(PasswordError::EmptyPassword)
        ));
    }

    #[test]
    fn test_invalid_hash_format() {
        let result = light().verify_blocking("password", "invalid-hash-format");
        assert!(matches!(result, Err(PasswordError::InvalidHashFormat)));
    }

    #[test]
    fn test_hash_carries_parameters() {
        let hash = light().hash_blocking("TestPassword").unwrap();
        assert!(hash.contains("m=8192"));
        assert!(hash.contains("t=2"));
        assert!(hash.contains("p=1"));
    }

    #[test]
    fn test_invalid_parameters() {
        let result = CredentialVerifier::new(&PasswordHashingConfig {
            memory_cost: 1,
            time_cost: 0,
            parallelism: 0,
        });
        assert!(matches!(result, Err(PasswordError::HashingFailed(_))));
    }

    #[tokio::test]
    async fn test_dummy_verification_is_counted() {
        let hasher = light();
        let clone = hasher.clone();

        clone.verify_dummy("anything".to_string()).await;
        let hash = hasher.hash_blocking("12345678").unwrap();
        assert!(!hasher.verify_blocking("wrong", &hash).unwrap());

        assert_eq!(hasher.verification_count(), 2);
        assert!(!hasher.verify_blocking("anything", &hasher.dummy_hash).unwrap());
    }

    #[tokio::test]
    async fn test_async_hash_and_verify() {
        let hasher = light();
        let hash = hasher.hash("async-secret".to_string()).await.unwrap();
        assert!(hasher
            .verify("async-secret".to_string(), hash.clone())
            .await
            .unwrap());
        assert!(!hasher.verify("nope".to_string(), hash).await.unwrap());
    }
}
