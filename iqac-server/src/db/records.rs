use chrono::Utc;
use iqac_common::models::{Record, RecordKind, ValidatedRecord};
use iqac_common::Status;
use serde::Deserialize;
use sqlx::types::Json;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::scope::Scope;

const SELECT_RECORD: &str = "SELECT r.*, o.name AS owner_name, d.name AS department_name, \
     rv.name AS reviewer_name \
     FROM records r \
     JOIN users o ON o.id = r.owner_id \
     LEFT JOIN departments d ON d.id = r.department_id \
     LEFT JOIN users rv ON rv.id = r.reviewed_by";

/// Query-string filters for record lists and reports
#[derive(Debug, Default, Clone, Deserialize)]
pub struct RecordFilter {
    pub status: Option<Status>,
    pub academic_year: Option<String>,
    pub department_id: Option<Uuid>,
    pub owner_id: Option<Uuid>,
    /// Title substring
    pub q: Option<String>,
}

/// Records of one kind inside `scope`, newest first
pub async fn list(
    pool: &SqlitePool,
    kind: RecordKind,
    scope: Scope,
    filter: &RecordFilter,
) -> sqlx::Result<Vec<Record>> {
    let mut query = QueryBuilder::<Sqlite>::new(SELECT_RECORD);
    query.push(" WHERE r.kind = ").push_bind(kind);
    scope.push_filter(&mut query, "r.department_id", "r.owner_id");

    if let Some(status) = filter.status {
        query.push(" AND r.status = ").push_bind(status);
    }
    if let Some(year) = filter.academic_year.as_deref().filter(|y| !y.is_empty()) {
        query.push(" AND r.academic_year = ").push_bind(year.to_string());
    }
    if let Some(department_id) = filter.department_id {
        query.push(" AND r.department_id = ").push_bind(department_id);
    }
    if let Some(owner_id) = filter.owner_id {
        query.push(" AND r.owner_id = ").push_bind(owner_id);
    }
    if let Some(q) = filter.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        query
            .push(" AND LOWER(r.title) LIKE ")
            .push_bind(format!("%{}%", q.to_lowercase()));
    }
    query.push(" ORDER BY r.created_at DESC");

    query.build_query_as::<Record>().fetch_all(pool).await
}

pub async fn find(pool: &SqlitePool, id: Uuid) -> sqlx::Result<Option<Record>> {
    sqlx::query_as::<_, Record>(&format!("{} WHERE r.id = ?", SELECT_RECORD))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn insert(
    pool: &SqlitePool,
    kind: RecordKind,
    owner_id: Uuid,
    input: &ValidatedRecord,
    department_id: Option<Uuid>,
    status: Status,
    reviewed_by: Option<Uuid>,
) -> sqlx::Result<Record> {
    let id = iqac_common::uuid_utils::generate();
    let now = Utc::now();
    let reviewed_at = reviewed_by.map(|_| now);

    sqlx::query(
        r#"
        INSERT INTO records (id, kind, title, description, owner_id, department_id,
                             academic_year, start_date, end_date, details, files, status,
                             reviewed_by, reviewed_at, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id)
    .bind(kind)
    .bind(&input.title)
    .bind(&input.description)
    .bind(owner_id)
    .bind(department_id)
    .bind(&input.academic_year)
    .bind(input.start_date)
    .bind(input.end_date)
    .bind(Json(&input.details))
    .bind(Json(Vec::<String>::new()))
    .bind(status)
    .bind(reviewed_by)
    .bind(reviewed_at)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    find(pool, id).await?.ok_or(sqlx::Error::RowNotFound)
}

/// Persist every mutable column of `record`
pub async fn save(pool: &SqlitePool, record: &Record) -> sqlx::Result<()> {
    sqlx::query(
        r#"
        UPDATE records
        SET title = ?, description = ?, department_id = ?, academic_year = ?,
            start_date = ?, end_date = ?, details = ?, files = ?, status = ?,
            reviewed_by = ?, reviewed_at = ?, remarks = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&record.title)
    .bind(&record.description)
    .bind(record.department_id)
    .bind(&record.academic_year)
    .bind(record.start_date)
    .bind(record.end_date)
    .bind(&record.details)
    .bind(&record.files)
    .bind(record.status)
    .bind(record.reviewed_by)
    .bind(record.reviewed_at)
    .bind(&record.remarks)
    .bind(Utc::now())
    .bind(record.id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn delete(pool: &SqlitePool, id: Uuid) -> sqlx::Result<bool> {
    let result = sqlx::query("DELETE FROM records WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// `(kind, status, count)` triples inside `scope`
pub async fn count_by_status(
    pool: &SqlitePool,
    scope: Scope,
) -> sqlx::Result<Vec<(RecordKind, Status, i64)>> {
    let mut query =
        QueryBuilder::<Sqlite>::new("SELECT r.kind, r.status, COUNT(*) FROM records r WHERE 1 = 1");
    scope.push_filter(&mut query, "r.department_id", "r.owner_id");
    query.push(" GROUP BY r.kind, r.status");

    query
        .build_query_as::<(RecordKind, Status, i64)>()
        .fetch_all(pool)
        .await
}

/// Stored evidence paths of every record owned by `owner_id`
pub async fn file_paths_of_owner(pool: &SqlitePool, owner_id: Uuid) -> sqlx::Result<Vec<String>> {
    let lists: Vec<Json<Vec<String>>> =
        sqlx::query_scalar("SELECT files FROM records WHERE owner_id = ?")
            .bind(owner_id)
            .fetch_all(pool)
            .await?;
    Ok(lists.into_iter().flat_map(|files| files.0).collect())
}
