//! Database schema migrations
//!
//! Versioned, idempotent migrations tracked in the `schema_version` table.
//!
//! # Migration Guidelines
//!
//! 1. **Never modify existing migrations** - databases in the field were built from them
//! 2. **Always add new migrations** - one function per schema change
//! 3. **Use ALTER TABLE** - prefer it over DROP/CREATE to preserve data

use crate::Result;
use sqlx::SqlitePool;
use tracing::{info, warn};

/// Current schema version
///
/// **IMPORTANT:** Increment this when adding new migrations
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Get current schema version from database (0 when nothing applied)
pub async fn get_schema_version(pool: &SqlitePool) -> Result<i64> {
    let version: Option<i64> =
        sqlx::query_scalar("SELECT MAX(version) FROM schema_version")
            .fetch_one(pool)
            .await?;

    Ok(version.unwrap_or(0))
}

async fn set_schema_version(pool: &SqlitePool, version: i64) -> Result<()> {
    sqlx::query("INSERT INTO schema_version (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;

    Ok(())
}

/// Run all pending migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    create_schema_version_table(pool).await?;
    let current_version = get_schema_version(pool).await?;

    if current_version == CURRENT_SCHEMA_VERSION {
        info!("Database schema is up to date (v{})", current_version);
        return Ok(());
    }

    if current_version > CURRENT_SCHEMA_VERSION {
        warn!(
            "Database schema version ({}) is newer than code version ({})",
            current_version, CURRENT_SCHEMA_VERSION
        );
        return Ok(());
    }

    info!(
        "Running database migrations: v{} -> v{}",
        current_version, CURRENT_SCHEMA_VERSION
    );

    if current_version < 1 {
        migrate_v1(pool).await?;
        set_schema_version(pool, 1).await?;
        info!("Migration v1 completed");
    }

    Ok(())
}

/// Migration v1: initial portal schema
async fn migrate_v1(pool: &SqlitePool) -> Result<()> {
    let statements = [
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS departments (
            id BLOB PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            code TEXT NOT NULL UNIQUE,
            coordinator_id BLOB REFERENCES users(id) ON DELETE SET NULL,
            created_at TIMESTAMP NOT NULL,
            updated_at TIMESTAMP NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id BLOB PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            role TEXT NOT NULL
                CHECK (role IN ('admin', 'coordinator', 'faculty', 'student', 'sports')),
            department_id BLOB REFERENCES departments(id),
            is_approved INTEGER NOT NULL DEFAULT 0,
            phone TEXT,
            designation TEXT,
            created_at TIMESTAMP NOT NULL,
            updated_at TIMESTAMP NOT NULL
        )
        "#,
        "CREATE INDEX IF NOT EXISTS idx_users_department ON users(department_id)",
        r#"
        CREATE TABLE IF NOT EXISTS records (
            id BLOB PRIMARY KEY,
            kind TEXT NOT NULL,
            title TEXT NOT NULL,
            description TEXT,
            owner_id BLOB NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            department_id BLOB REFERENCES departments(id) ON DELETE SET NULL,
            academic_year TEXT NOT NULL,
            start_date DATE,
            end_date DATE,
            details TEXT NOT NULL,
            files TEXT NOT NULL DEFAULT '[]',
            status TEXT NOT NULL DEFAULT 'pending'
                CHECK (status IN ('pending', 'approved', 'rejected')),
            reviewed_by BLOB REFERENCES users(id) ON DELETE SET NULL,
            reviewed_at TIMESTAMP,
            remarks TEXT,
            created_at TIMESTAMP NOT NULL,
            updated_at TIMESTAMP NOT NULL
        )
        "#,
        "CREATE INDEX IF NOT EXISTS idx_records_kind_department ON records(kind, department_id)",
        "CREATE INDEX IF NOT EXISTS idx_records_owner ON records(owner_id)",
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            id BLOB PRIMARY KEY,
            title TEXT NOT NULL,
            doc_type TEXT NOT NULL,
            description TEXT,
            file_path TEXT NOT NULL,
            original_name TEXT NOT NULL,
            mime_type TEXT NOT NULL,
            size_bytes INTEGER NOT NULL,
            sha256 TEXT NOT NULL,
            uploaded_by BLOB NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            department_id BLOB REFERENCES departments(id) ON DELETE SET NULL,
            status TEXT NOT NULL DEFAULT 'pending'
                CHECK (status IN ('pending', 'approved', 'rejected')),
            approved_by BLOB REFERENCES users(id) ON DELETE SET NULL,
            reviewed_at TIMESTAMP,
            remarks TEXT,
            created_at TIMESTAMP NOT NULL,
            updated_at TIMESTAMP NOT NULL
        )
        "#,
        "CREATE INDEX IF NOT EXISTS idx_documents_department ON documents(department_id)",
        r#"
        CREATE TABLE IF NOT EXISTS announcements (
            id BLOB PRIMARY KEY,
            title TEXT NOT NULL,
            message TEXT NOT NULL,
            visibility TEXT NOT NULL
                CHECK (visibility IN ('all', 'department', 'faculty', 'student')),
            department_id BLOB REFERENCES departments(id) ON DELETE CASCADE,
            priority TEXT NOT NULL DEFAULT 'normal',
            created_by BLOB NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            expires_at TIMESTAMP,
            created_at TIMESTAMP NOT NULL,
            updated_at TIMESTAMP NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS feedback (
            id BLOB PRIMARY KEY,
            student_id BLOB NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            feedback_type TEXT NOT NULL
                CHECK (feedback_type IN ('course', 'faculty', 'institution')),
            target_user_id BLOB REFERENCES users(id) ON DELETE CASCADE,
            target_record_id BLOB REFERENCES records(id) ON DELETE CASCADE,
            department_id BLOB REFERENCES departments(id) ON DELETE SET NULL,
            academic_year TEXT NOT NULL,
            semester INTEGER,
            rating INTEGER NOT NULL CHECK (rating BETWEEN 1 AND 5),
            comments TEXT,
            is_anonymous INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMP NOT NULL
        )
        "#,
        "CREATE INDEX IF NOT EXISTS idx_feedback_department ON feedback(department_id)",
        // One submission per student, type, target and academic year
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_feedback_once ON feedback(
            student_id, feedback_type, academic_year,
            COALESCE(target_user_id, ''), COALESCE(target_record_id, '')
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS timetables (
            id BLOB PRIMARY KEY,
            department_id BLOB NOT NULL REFERENCES departments(id) ON DELETE CASCADE,
            semester INTEGER NOT NULL CHECK (semester BETWEEN 1 AND 10),
            academic_year TEXT NOT NULL,
            section TEXT NOT NULL DEFAULT '',
            slots TEXT NOT NULL DEFAULT '[]',
            created_by BLOB NOT NULL,
            created_at TIMESTAMP NOT NULL,
            updated_at TIMESTAMP NOT NULL,
            UNIQUE (department_id, semester, academic_year, section)
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS activity_logs (
            id BLOB PRIMARY KEY,
            user_id BLOB NOT NULL,
            action TEXT NOT NULL CHECK (action IN ('CREATE', 'UPDATE', 'DELETE')),
            entity_type TEXT NOT NULL,
            entity_id BLOB,
            description TEXT NOT NULL,
            department_id BLOB,
            created_at TIMESTAMP NOT NULL
        )
        "#,
        "CREATE INDEX IF NOT EXISTS idx_activity_created ON activity_logs(created_at)",
        "CREATE INDEX IF NOT EXISTS idx_activity_user ON activity_logs(user_id)",
    ];

    for statement in statements {
        sqlx::query(statement).execute(pool).await?;
    }

    info!("Migration v1: created portal tables");
    Ok(())
}
