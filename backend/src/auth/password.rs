//! Password hashing using argon2
//!
//! New hashes are always Argon2id PHC strings. Verification additionally
//! accepts bcrypt digests left behind by accounts created before the
//! switch to argon2.
//!
//! Argon2 is intentionally CPU-intensive; async callers use the `_async`
//! variants, which run on the blocking thread pool.

use anyhow::Result;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use once_cell::sync::Lazy;

/// Hash verified when the account does not exist, so a login for an
/// unknown email costs as much as one with a wrong password.
static DUMMY_HASH: Lazy<Option<String>> = Lazy::new(|| PasswordService::hash("dummy-password").ok());

/// Password hashing service
///
/// Uses Argon2id which is the recommended variant for password hashing.
pub struct PasswordService;

impl PasswordService {
    /// Hash a password with a freshly generated salt (blocking operation)
    pub fn hash(password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();
        let hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?;
        Ok(hash.to_string())
    }

    /// Hash a password asynchronously (non-blocking)
    pub async fn hash_async(password: String) -> Result<String> {
        tokio::task::spawn_blocking(move || Self::hash(&password))
            .await
            .map_err(|e| anyhow::anyhow!("Task join error: {}", e))?
    }

    /// Verify a password against a stored hash (blocking operation)
    ///
    /// A malformed or unsupported hash is a non-match, never an error.
    pub fn verify(password: &str, hash: &str) -> bool {
        if is_bcrypt_hash(hash) {
            return bcrypt::verify(password, hash).unwrap_or(false);
        }
        match PasswordHash::new(hash) {
            Ok(parsed) => Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(e) => {
                tracing::warn!(error = %e, "stored password hash is malformed");
                false
            }
        }
    }

    /// Verify a password asynchronously (non-blocking)
    pub async fn verify_async(password: String, hash: String) -> Result<bool> {
        tokio::task::spawn_blocking(move || Self::verify(&password, &hash))
            .await
            .map_err(|e| anyhow::anyhow!("Task join error: {}", e))
    }

    /// Burn one verification against a throwaway hash; always `false`
    pub async fn dummy_verify(password: String) -> Result<bool> {
        tokio::task::spawn_blocking(move || {
            if let Some(hash) = DUMMY_HASH.as_deref() {
                let _ = Self::verify(&password, hash);
            }
            false
        })
        .await
        .map_err(|e| anyhow::anyhow!("Task join error: {}", e))
    }
}

fn is_bcrypt_hash(hash: &str) -> bool {
    ["$2a$", "$2b$", "$2x$", "$2y$"]
        .iter()
        .any(|prefix| hash.starts_with(prefix))
}
