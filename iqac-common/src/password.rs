//! Credential hashing and generation

use crate::{Error, Result};
use rand::distributions::Alphanumeric;
use rand::Rng;

/// Minimum accepted password length
pub const MIN_PASSWORD_LEN: usize = 8;

/// Default bcrypt work factor
pub const DEFAULT_HASH_COST: u32 = bcrypt::DEFAULT_COST;

/// Hash a password with bcrypt at the given cost
pub fn hash_password(password: &str, cost: u32) -> Result<String> {
    bcrypt::hash(password, cost)
        .map_err(|e| Error::Internal(format!("Password hashing failed: {}", e)))
}

/// Check a password against a stored bcrypt hash
///
/// A malformed stored hash counts as a mismatch.
pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}

/// [`hash_password`] on the blocking thread pool
pub async fn hash_password_blocking(password: String, cost: u32) -> Result<String> {
    tokio::task::spawn_blocking(move || hash_password(&password, cost))
        .await
        .map_err(|e| Error::Internal(format!("Password hashing task failed: {}", e)))?
}

/// [`verify_password`] on the blocking thread pool
pub async fn verify_password_blocking(password: String, hash: String) -> Result<bool> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| Error::Internal(format!("Password check task failed: {}", e)))
}

/// Hash of a random secret at `cost`, checked against when a login names
/// an unknown account so both paths spend the same bcrypt time
///
/// Falls back to an empty string (which never verifies) if hashing fails.
pub fn decoy_hash(cost: u32) -> String {
    hash_password(&random_token(32), cost).unwrap_or_default()
}

/// Reject passwords that are too short or blank
pub fn validate_password(password: &str) -> Result<()> {
    if password.trim().is_empty() {
        return Err(Error::invalid("Password must not be blank"));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(Error::invalid(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

/// Random alphanumeric string, used for bootstrap passwords and secrets
pub fn random_token(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}
