//! Password hashing types.
//!
//! `PasswordHash` wraps a bcrypt hash so that plaintext passwords and stored
//! hashes cannot be mixed up at compile time.

use std::fmt::Display;

use bcrypt::{hash, verify};
use serde::{Deserialize, Serialize};

/// Errors that can occur while hashing or verifying a password.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PasswordError {
    /// An unexpected error occurred in the underlying hashing library.
    ///
    /// The error string should only be logged on the server, never sent to the
    /// client.
    #[error("hashing failed: {0}")]
    Hashing(String),
}

/// A salted and hashed password.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// The cost factor used for passwords stored by the application.
    pub const DEFAULT_COST: u32 = 12;

    /// Hash `raw_password` with the given bcrypt `cost`.
    ///
    /// Use [PasswordHash::DEFAULT_COST] outside of tests; tests use a lower
    /// cost to keep them fast.
    ///
    /// # Errors
    /// Returns [PasswordError::Hashing] if the password could not be hashed.
    pub fn from_raw_password(raw_password: &str, cost: u32) -> Result<Self, PasswordError> {
        hash(raw_password, cost)
            .map(Self)
            .map_err(|error| PasswordError::Hashing(error.to_string()))
    }

    /// Wrap an existing hash string without validation.
    ///
    /// The caller should ensure that `raw_password_hash` is a valid bcrypt
    /// hash, e.g. one read back from the database.
    pub fn new_unchecked(raw_password_hash: &str) -> Self {
        Self(raw_password_hash.to_string())
    }

    /// Check that `raw_password` matches the stored hash.
    ///
    /// # Errors
    /// Returns [PasswordError::Hashing] if the stored hash could not be parsed.
    pub fn verify(&self, raw_password: &str) -> Result<bool, PasswordError> {
        verify(raw_password, &self.0).map_err(|error| PasswordError::Hashing(error.to_string()))
    }
}

impl Display for PasswordHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
