use chrono::Utc;
use iqac_common::models::{DocType, Document, DocumentMeta};
use iqac_common::Status;
use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::scope::Scope;
use crate::uploads::StoredFile;

const SELECT_DOCUMENT: &str = "SELECT doc.*, u.name AS uploader_name, d.name AS department_name \
     FROM documents doc \
     JOIN users u ON u.id = doc.uploaded_by \
     LEFT JOIN departments d ON d.id = doc.department_id";

#[derive(Debug, Default, Clone, Deserialize)]
pub struct DocumentFilter {
    pub status: Option<Status>,
    pub doc_type: Option<DocType>,
    /// Title substring
    pub q: Option<String>,
}

/// Documents inside `scope`, newest first
pub async fn list(
    pool: &SqlitePool,
    scope: Scope,
    filter: &DocumentFilter,
) -> sqlx::Result<Vec<Document>> {
    let mut query = QueryBuilder::<Sqlite>::new(SELECT_DOCUMENT);
    query.push(" WHERE 1 = 1");
    scope.push_filter(&mut query, "doc.department_id", "doc.uploaded_by");

    if let Some(status) = filter.status {
        query.push(" AND doc.status = ").push_bind(status);
    }
    if let Some(doc_type) = filter.doc_type {
        query.push(" AND doc.doc_type = ").push_bind(doc_type);
    }
    if let Some(q) = filter.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        query
            .push(" AND LOWER(doc.title) LIKE ")
            .push_bind(format!("%{}%", q.to_lowercase()));
    }
    query.push(" ORDER BY doc.created_at DESC");

    query.build_query_as::<Document>().fetch_all(pool).await
}

pub async fn find(pool: &SqlitePool, id: Uuid) -> sqlx::Result<Option<Document>> {
    sqlx::query_as::<_, Document>(&format!("{} WHERE doc.id = ?", SELECT_DOCUMENT))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn insert(
    pool: &SqlitePool,
    meta: &DocumentMeta,
    file: &StoredFile,
    uploaded_by: Uuid,
    department_id: Option<Uuid>,
    status: Status,
    approved_by: Option<Uuid>,
) -> sqlx::Result<Document> {
    let id = iqac_common::uuid_utils::generate();
    let now = Utc::now();
    let reviewed_at = approved_by.map(|_| now);

    sqlx::query(
        r#"
        INSERT INTO documents (id, title, doc_type, description, file_path, original_name,
                               mime_type, size_bytes, sha256, uploaded_by, department_id,
                               status, approved_by, reviewed_at, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id)
    .bind(&meta.title)
    .bind(meta.doc_type)
    .bind(&meta.description)
    .bind(&file.relative_path)
    .bind(&file.original_name)
    .bind(&file.mime_type)
    .bind(file.size_bytes)
    .bind(&file.sha256)
    .bind(uploaded_by)
    .bind(department_id)
    .bind(status)
    .bind(approved_by)
    .bind(reviewed_at)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    find(pool, id).await?.ok_or(sqlx::Error::RowNotFound)
}

pub async fn set_review(
    pool: &SqlitePool,
    id: Uuid,
    status: Status,
    reviewer: Uuid,
    remarks: Option<&str>,
) -> sqlx::Result<()> {
    let now = Utc::now();
    sqlx::query(
        r#"
        UPDATE documents
        SET status = ?, approved_by = ?, reviewed_at = ?, remarks = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(status)
    .bind(reviewer)
    .bind(now)
    .bind(remarks)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn delete(pool: &SqlitePool, id: Uuid) -> sqlx::Result<bool> {
    let result = sqlx::query("DELETE FROM documents WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn count_by_status(pool: &SqlitePool, scope: Scope) -> sqlx::Result<Vec<(Status, i64)>> {
    let mut query =
        QueryBuilder::<Sqlite>::new("SELECT doc.status, COUNT(*) FROM documents doc WHERE 1 = 1");
    scope.push_filter(&mut query, "doc.department_id", "doc.uploaded_by");
    query.push(" GROUP BY doc.status");

    query.build_query_as::<(Status, i64)>().fetch_all(pool).await
}

pub async fn file_paths_of_uploader(
    pool: &SqlitePool,
    uploaded_by: Uuid,
) -> sqlx::Result<Vec<String>> {
    sqlx::query_scalar("SELECT file_path FROM documents WHERE uploaded_by = ?")
        .bind(uploaded_by)
        .fetch_all(pool)
        .await
}
