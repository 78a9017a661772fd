use chrono::Utc;
use iqac_common::models::{Department, DepartmentInput};
use sqlx::SqlitePool;
use uuid::Uuid;

const SELECT_DEPARTMENT: &str = "SELECT d.*, c.name AS coordinator_name \
     FROM departments d LEFT JOIN users c ON c.id = d.coordinator_id";

pub async fn list(pool: &SqlitePool) -> sqlx::Result<Vec<Department>> {
    sqlx::query_as::<_, Department>(&format!(
        "{} ORDER BY d.name COLLATE NOCASE",
        SELECT_DEPARTMENT
    ))
    .fetch_all(pool)
    .await
}

pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> sqlx::Result<Option<Department>> {
    sqlx::query_as::<_, Department>(&format!("{} WHERE d.id = ?", SELECT_DEPARTMENT))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn exists(pool: &SqlitePool, id: Uuid) -> sqlx::Result<bool> {
    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM departments WHERE id = ?)")
        .bind(id)
        .fetch_one(pool)
        .await
}

pub async fn insert(pool: &SqlitePool, input: &DepartmentInput) -> sqlx::Result<Department> {
    let id = iqac_common::uuid_utils::generate();
    let now = Utc::now();
    sqlx::query(
        "INSERT INTO departments (id, name, code, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(&input.name)
    .bind(&input.code)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    find_by_id(pool, id).await?.ok_or(sqlx::Error::RowNotFound)
}

pub async fn update(pool: &SqlitePool, id: Uuid, input: &DepartmentInput) -> sqlx::Result<bool> {
    let result =
        sqlx::query("UPDATE departments SET name = ?, code = ?, updated_at = ? WHERE id = ?")
            .bind(&input.name)
            .bind(&input.code)
            .bind(Utc::now())
            .bind(id)
            .execute(pool)
            .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn set_coordinator(pool: &SqlitePool, id: Uuid, user_id: Uuid) -> sqlx::Result<()> {
    let mut tx = pool.begin().await?;

    // A coordinator leads at most one department
    sqlx::query("UPDATE departments SET coordinator_id = NULL, updated_at = ? WHERE coordinator_id = ?")
        .bind(Utc::now())
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("UPDATE departments SET coordinator_id = ?, updated_at = ? WHERE id = ?")
        .bind(user_id)
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("UPDATE users SET department_id = ?, updated_at = ? WHERE id = ? AND department_id IS NULL")
        .bind(id)
        .bind(Utc::now())
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await
}

/// Drop a user from every coordinator slot they hold
pub async fn clear_coordinator(pool: &SqlitePool, user_id: Uuid) -> sqlx::Result<()> {
    sqlx::query("UPDATE departments SET coordinator_id = NULL, updated_at = ? WHERE coordinator_id = ?")
        .bind(Utc::now())
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// True when the user is the current coordinator of any department
pub async fn is_coordinator_of_any(pool: &SqlitePool, user_id: Uuid) -> sqlx::Result<bool> {
    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM departments WHERE coordinator_id = ?)")
        .bind(user_id)
        .fetch_one(pool)
        .await
}

pub async fn count_members(pool: &SqlitePool, id: Uuid) -> sqlx::Result<i64> {
    sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE department_id = ?")
        .bind(id)
        .fetch_one(pool)
        .await
}

pub async fn delete(pool: &SqlitePool, id: Uuid) -> sqlx::Result<bool> {
    let result = sqlx::query("DELETE FROM departments WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
