//! Key/value settings table

use crate::password::random_token;
use crate::Result;
use sqlx::SqlitePool;

/// Settings key holding the token signing secret
pub const JWT_SECRET_KEY: &str = "jwt_secret";

/// Settings key holding the academic year assumed when a request names none
pub const CURRENT_ACADEMIC_YEAR_KEY: &str = "current_academic_year";

/// Length of generated signing secrets
const JWT_SECRET_LEN: usize = 64;

pub async fn get_setting(pool: &SqlitePool, key: &str) -> Result<Option<String>> {
    let value: Option<Option<String>> =
        sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(pool)
            .await?;

    Ok(value.flatten())
}

pub async fn set_setting(pool: &SqlitePool, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO settings (key, value, updated_at) VALUES (?, ?, ?)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
        "#,
    )
    .bind(key)
    .bind(value)
    .bind(crate::time::now())
    .execute(pool)
    .await?;

    Ok(())
}

/// The configured current academic year, or the one containing today when
/// the setting is missing or malformed
pub async fn current_academic_year(pool: &SqlitePool) -> Result<String> {
    match get_setting(pool, CURRENT_ACADEMIC_YEAR_KEY).await? {
        Some(year) if crate::time::is_valid_academic_year(&year) => Ok(year),
        _ => Ok(crate::time::current_academic_year()),
    }
}

/// Load the token signing secret, generating and storing one on first use
pub async fn load_jwt_secret(pool: &SqlitePool) -> Result<String> {
    if let Some(secret) = get_setting(pool, JWT_SECRET_KEY).await? {
        if !secret.is_empty() {
            return Ok(secret);
        }
    }

    let secret = random_token(JWT_SECRET_LEN);
    set_setting(pool, JWT_SECRET_KEY, &secret).await?;
    Ok(secret)
}
