use chrono::Utc;
use iqac_common::models::{NewUser, User};
use iqac_common::Role;
use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::scope::Scope;

const SELECT_USER: &str = "SELECT u.*, d.name AS department_name \
     FROM users u LEFT JOIN departments d ON d.id = u.department_id";

/// Query-string filters for the user list
#[derive(Debug, Default, Deserialize)]
pub struct UserFilter {
    pub role: Option<Role>,
    pub department_id: Option<Uuid>,
    pub approved: Option<bool>,
    /// Name or e-mail substring
    pub q: Option<String>,
}

pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> sqlx::Result<Option<User>> {
    sqlx::query_as::<_, User>(&format!("{} WHERE u.id = ?", SELECT_USER))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_email(pool: &SqlitePool, email: &str) -> sqlx::Result<Option<User>> {
    sqlx::query_as::<_, User>(&format!("{} WHERE u.email = ?", SELECT_USER))
        .bind(email)
        .fetch_optional(pool)
        .await
}

/// Insert a validated account and return it with its department name
pub async fn insert(
    pool: &SqlitePool,
    input: &NewUser,
    password_hash: &str,
    is_approved: bool,
) -> sqlx::Result<User> {
    let id = iqac_common::uuid_utils::generate();
    let now = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO users (id, name, email, password_hash, role, department_id,
                           is_approved, phone, designation, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id)
    .bind(&input.name)
    .bind(&input.email)
    .bind(password_hash)
    .bind(input.role)
    .bind(input.department_id)
    .bind(is_approved)
    .bind(&input.phone)
    .bind(&input.designation)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    find_by_id(pool, id).await?.ok_or(sqlx::Error::RowNotFound)
}

/// Users visible in `scope`, sorted by name
pub async fn list(pool: &SqlitePool, scope: Scope, filter: &UserFilter) -> sqlx::Result<Vec<User>> {
    let mut query = QueryBuilder::<Sqlite>::new(SELECT_USER);
    query.push(" WHERE 1 = 1");
    scope.push_filter(&mut query, "u.department_id", "u.id");

    if let Some(role) = filter.role {
        query.push(" AND u.role = ").push_bind(role);
    }
    if let Some(department_id) = filter.department_id {
        query.push(" AND u.department_id = ").push_bind(department_id);
    }
    if let Some(approved) = filter.approved {
        query.push(" AND u.is_approved = ").push_bind(approved);
    }
    if let Some(q) = filter.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        let pattern = format!("%{}%", q.to_lowercase());
        query
            .push(" AND (LOWER(u.name) LIKE ")
            .push_bind(pattern.clone())
            .push(" OR u.email LIKE ")
            .push_bind(pattern)
            .push(")");
    }
    query.push(" ORDER BY u.name COLLATE NOCASE, u.email");

    query.build_query_as::<User>().fetch_all(pool).await
}

/// Accounts awaiting approval, oldest first
pub async fn list_pending(pool: &SqlitePool, department_id: Option<Uuid>) -> sqlx::Result<Vec<User>> {
    let mut query = QueryBuilder::<Sqlite>::new(SELECT_USER);
    query.push(" WHERE u.is_approved = 0");
    if let Some(department_id) = department_id {
        query.push(" AND u.department_id = ").push_bind(department_id);
    }
    query.push(" ORDER BY u.created_at ASC");

    query.build_query_as::<User>().fetch_all(pool).await
}

/// Persist the editable account fields of `user`
pub async fn save(pool: &SqlitePool, user: &User) -> sqlx::Result<()> {
    sqlx::query(
        r#"
        UPDATE users
        SET name = ?, email = ?, role = ?, department_id = ?, phone = ?,
            designation = ?, is_approved = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&user.name)
    .bind(&user.email)
    .bind(user.role)
    .bind(user.department_id)
    .bind(&user.phone)
    .bind(&user.designation)
    .bind(user.is_approved)
    .bind(Utc::now())
    .bind(user.id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn set_password(pool: &SqlitePool, id: Uuid, password_hash: &str) -> sqlx::Result<()> {
    sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
        .bind(password_hash)
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn delete(pool: &SqlitePool, id: Uuid) -> sqlx::Result<bool> {
    let result = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn admin_exists(pool: &SqlitePool) -> sqlx::Result<bool> {
    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE role = 'admin')")
        .fetch_one(pool)
        .await
}

/// Account counts per role, optionally within one department
pub async fn count_by_role(
    pool: &SqlitePool,
    department_id: Option<Uuid>,
) -> sqlx::Result<Vec<(Role, i64)>> {
    let mut query = QueryBuilder::<Sqlite>::new("SELECT role, COUNT(*) FROM users WHERE 1 = 1");
    if let Some(department_id) = department_id {
        query.push(" AND department_id = ").push_bind(department_id);
    }
    query.push(" GROUP BY role ORDER BY role");

    query.build_query_as::<(Role, i64)>().fetch_all(pool).await
}

pub async fn count_pending(pool: &SqlitePool, department_id: Option<Uuid>) -> sqlx::Result<i64> {
    let mut query =
        QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM users WHERE is_approved = 0");
    if let Some(department_id) = department_id {
        query.push(" AND department_id = ").push_bind(department_id);
    }
    query.build_query_scalar::<i64>().fetch_one(pool).await
}
