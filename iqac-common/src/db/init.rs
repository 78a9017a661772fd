//! Database initialization
//!
//! Opens (creating on first run) the SQLite database, applies connection
//! pragmas, runs schema migrations and seeds default settings.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Busy timeout applied to every pooled connection
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Pragmas set through connect options apply to every connection in
    // the pool, not just the one that happens to run a PRAGMA statement
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT);

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    crate::db::migrations::run_migrations(&pool).await?;
    init_default_settings(&pool).await?;

    Ok(pool)
}

/// Ensure all required settings exist with default values
async fn init_default_settings(pool: &SqlitePool) -> Result<()> {
    ensure_setting(pool, "institution_name", "Institution").await?;
    ensure_setting(
        pool,
        super::settings::CURRENT_ACADEMIC_YEAR_KEY,
        &crate::time::current_academic_year(),
    )
    .await?;
    Ok(())
}

/// Insert a setting only when it is missing or NULL
async fn ensure_setting(pool: &SqlitePool, key: &str, default_value: &str) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO settings (key, value, updated_at) VALUES (?, ?, ?)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
        WHERE settings.value IS NULL
        "#,
    )
    .bind(key)
    .bind(default_value)
    .bind(crate::time::now())
    .execute(pool)
    .await?;

    Ok(())
}
