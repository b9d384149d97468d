//! Password hashing and verification using Argon2id
//!
//! Hashes are stored as PHC strings, so verification reads its parameters
//! from the hash itself and keeps working after the configured cost changes.
//!
//! ```rust
//! use snippetbox::auth::password::{PasswordHashConfig, PasswordHasher};
//!
//! # fn example() -> anyhow::Result<()> {
//! let hasher = PasswordHasher::with_config(PasswordHashConfig::default());
//! let hash = hasher.hash("correct-horse-battery-staple")?;
//! assert!(hasher.verify("correct-horse-battery-staple", &hash)?);
//! assert!(!hasher.verify("wrong-password", &hash)?);
//! # Ok(())
//! # }
//! ```

use argon2::{
    password_hash::{
        rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString,
    },
    Algorithm, Argon2, Params, Version,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Password hashing errors
#[derive(Debug, Error)]
pub enum PasswordError {
    /// Failed to hash password
    #[error("failed to hash password: {0}")]
    HashingFailed(String),

    /// Failed to verify password
    #[error("failed to verify password: {0}")]
    VerificationFailed(String),

    /// Stored hash is not a PHC string
    #[error("invalid password hash format: {0}")]
    InvalidHash(String),

    /// Cost parameters rejected by Argon2
    #[error("invalid Argon2 parameters: {0}")]
    InvalidParams(String),
}

/// Argon2id cost parameters
///
/// Defaults: 19456 KiB memory, 2 iterations, parallelism 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordHashConfig {
    /// Memory cost in KiB
    pub memory_cost: u32,
    /// Number of iterations
    pub iterations: u32,
    /// Degree of parallelism
    pub parallelism: u32,
}

impl Default for PasswordHashConfig {
    fn default() -> Self {
        Self {
            memory_cost: 19456,
            iterations: 2,
            parallelism: 1,
        }
    }
}

/// Argon2id hasher
#[derive(Debug, Clone, Default)]
pub struct PasswordHasher {
    config: PasswordHashConfig,
}

impl PasswordHasher {
    /// Hasher with the given cost parameters
    #[must_use]
    pub const fn with_config(config: PasswordHashConfig) -> Self {
        Self { config }
    }

    /// Hash `password` with a fresh random salt.
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);
        let params = Params::new(
            self.config.memory_cost,
            self.config.iterations,
            self.config.parallelism,
            None,
        )
        .map_err(|e| PasswordError::InvalidParams(e.to_string()))?;

        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| PasswordError::HashingFailed(e.to_string()))
    }

    /// Check `password` against a stored PHC hash.
    ///
    /// A wrong password is `Ok(false)`, not an error.
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, PasswordError> {
        let parsed = PasswordHash::new(hash).map_err(|e| PasswordError::InvalidHash(e.to_string()))?;

        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(PasswordError::VerificationFailed(e.to_string())),
        }
    }

    /// Current cost parameters
    #[must_use]
    pub const fn config(&self) -> &PasswordHashConfig {
        &self.config
    }
}
