use chrono::{DateTime, Utc};
use iqac_common::models::{Announcement, AnnouncementInput, Priority};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

const SELECT_ANNOUNCEMENT: &str = "SELECT a.*, u.name AS author_name, d.name AS department_name \
     FROM announcements a \
     JOIN users u ON u.id = a.created_by \
     LEFT JOIN departments d ON d.id = a.department_id";

/// Every announcement, urgent first then newest; audience filtering is
/// done by the caller
pub async fn list(
    pool: &SqlitePool,
    include_expired: bool,
    now: DateTime<Utc>,
) -> sqlx::Result<Vec<Announcement>> {
    let mut query = QueryBuilder::<Sqlite>::new(SELECT_ANNOUNCEMENT);
    query.push(" WHERE 1 = 1");
    if !include_expired {
        query
            .push(" AND (a.expires_at IS NULL OR a.expires_at > ")
            .push_bind(now)
            .push(")");
    }
    query.push(
        " ORDER BY CASE a.priority WHEN 'urgent' THEN 0 WHEN 'important' THEN 1 ELSE 2 END, \
         a.created_at DESC",
    );

    query.build_query_as::<Announcement>().fetch_all(pool).await
}

pub async fn find(pool: &SqlitePool, id: Uuid) -> sqlx::Result<Option<Announcement>> {
    sqlx::query_as::<_, Announcement>(&format!("{} WHERE a.id = ?", SELECT_ANNOUNCEMENT))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn insert(
    pool: &SqlitePool,
    input: &AnnouncementInput,
    created_by: Uuid,
) -> sqlx::Result<Announcement> {
    let id = iqac_common::uuid_utils::generate();
    let now = Utc::now();
    sqlx::query(
        r#"
        INSERT INTO announcements (id, title, message, visibility, department_id, priority,
                                   created_by, expires_at, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id)
    .bind(&input.title)
    .bind(&input.message)
    .bind(input.visibility)
    .bind(input.department_id)
    .bind(input.priority)
    .bind(created_by)
    .bind(input.expires_at)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    find(pool, id).await?.ok_or(sqlx::Error::RowNotFound)
}

pub async fn update(
    pool: &SqlitePool,
    id: Uuid,
    title: &str,
    message: &str,
    priority: Priority,
    expires_at: Option<DateTime<Utc>>,
) -> sqlx::Result<()> {
    sqlx::query(
        r#"
        UPDATE announcements
        SET title = ?, message = ?, priority = ?, expires_at = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(title)
    .bind(message)
    .bind(priority)
    .bind(expires_at)
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn delete(pool: &SqlitePool, id: Uuid) -> sqlx::Result<bool> {
    let result = sqlx::query("DELETE FROM announcements WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
