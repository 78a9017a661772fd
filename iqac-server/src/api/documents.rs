//! Uploaded documents and their approval

use axum::{
    body::Body,
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::Response,
    routing::{get, put},
    Json, Router,
};
use iqac_common::models::{Action, Document, DocumentMeta, ReviewDecision, User};
use iqac_common::Status;
use uuid::Uuid;

use crate::activity::log_activity;
use crate::api::check_reviewer;
use crate::auth::CurrentUser;
use crate::db::documents::DocumentFilter;
use crate::error::{ApiError, ApiResult};
use crate::scope::Scope;
use crate::{db, AppState};

/// Upload subdirectory for documents
const FILES_CATEGORY: &str = "documents";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/documents", get(list_documents).post(upload_document))
        .route(
            "/api/documents/:id",
            get(get_document).delete(delete_document),
        )
        .route("/api/documents/:id/download", get(download_document))
        .route("/api/documents/:id/review", put(review_document))
}

async fn load_document(state: &AppState, user: &User, id: Uuid) -> ApiResult<Document> {
    match db::documents::find(&state.db, id).await? {
        Some(doc) if Scope::for_user(user).allows(doc.uploaded_by, doc.department_id) => Ok(doc),
        _ => Err(ApiError::not_found("Document")),
    }
}

/// POST /api/documents
///
/// Multipart form with a `file` part and `title`, `doc_type` and optional
/// `description` text parts.
pub async fn upload_document(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<Document>)> {
    let mut title = None;
    let mut doc_type = None;
    let mut description = None;
    let mut file = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("title") => title = Some(field.text().await?),
            Some("doc_type") => doc_type = Some(field.text().await?),
            Some("description") => description = Some(field.text().await?),
            Some("file") => file = Some(state.uploads.read_field(field).await?),
            _ => {}
        }
    }

    let meta = DocumentMeta::new(title.as_deref(), doc_type.as_deref(), description.as_deref())?;
    let (file_name, content) =
        file.ok_or_else(|| ApiError::Validation("A file is required".to_string()))?;
    let stored = state.uploads.save(FILES_CATEGORY, &file_name, &content).await?;

    let (status, approved_by) = if user.is_admin() {
        (Status::Approved, Some(user.id))
    } else {
        (Status::Pending, None)
    };

    let document = match db::documents::insert(
        &state.db,
        &meta,
        &stored,
        user.id,
        user.department_id,
        status,
        approved_by,
    )
    .await
    {
        Ok(document) => document,
        Err(e) => {
            state.uploads.remove(&stored.relative_path).await;
            return Err(e.into());
        }
    };

    log_activity(
        &state.db,
        &user,
        Action::Create,
        "document",
        Some(document.id),
        format!(
            "Uploaded {} \"{}\" ({} bytes)",
            document.doc_type.as_str(),
            document.title,
            document.size_bytes
        ),
        document.department_id,
    )
    .await;

    Ok((StatusCode::CREATED, Json(document)))
}

/// GET /api/documents
pub async fn list_documents(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(filter): Query<DocumentFilter>,
) -> ApiResult<Json<Vec<Document>>> {
    let documents = db::documents::list(&state.db, Scope::for_user(&user), &filter).await?;
    Ok(Json(documents))
}

/// GET /api/documents/:id
pub async fn get_document(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Document>> {
    Ok(Json(load_document(&state, &user, id).await?))
}

/// Quote a file name for `Content-Disposition`
fn attachment_header(file_name: &str) -> String {
    let safe: String = file_name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_control() || !c.is_ascii() => '_',
            c => c,
        })
        .collect();
    format!("attachment; filename=\"{}\"", safe)
}

/// GET /api/documents/:id/download
pub async fn download_document(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Response> {
    let document = load_document(&state, &user, id).await?;
    let bytes = state.uploads.read(&document.file_path).await?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, document.mime_type.as_str())
        .header(
            header::CONTENT_DISPOSITION,
            attachment_header(&document.original_name),
        )
        .body(Body::from(bytes))
        .map_err(|e| ApiError::Internal(format!("Failed to build download response: {}", e)))
}

/// PUT /api/documents/:id/review
pub async fn review_document(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(decision): Json<ReviewDecision>,
) -> ApiResult<Json<Document>> {
    let document = load_document(&state, &user, id).await?;
    check_reviewer(&user, document.uploaded_by, document.department_id, document.status)?;
    let remarks = decision.validate()?;

    db::documents::set_review(&state.db, id, decision.status, user.id, remarks.as_deref())
        .await?;

    log_activity(
        &state.db,
        &user,
        Action::Update,
        "document",
        Some(id),
        format!("Marked document \"{}\" {}", document.title, decision.status),
        document.department_id,
    )
    .await;

    Ok(Json(load_document(&state, &user, id).await?))
}

/// DELETE /api/documents/:id
pub async fn delete_document(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let document = load_document(&state, &user, id).await?;
    let allowed = user.is_admin()
        || (document.uploaded_by == user.id && document.status != Status::Approved);
    if !allowed {
        return Err(ApiError::forbidden("You cannot delete this document"));
    }

    if !db::documents::delete(&state.db, id).await? {
        return Err(ApiError::not_found("Document"));
    }
    state.uploads.remove(&document.file_path).await;

    log_activity(
        &state.db,
        &user,
        Action::Delete,
        "document",
        Some(id),
        format!("Deleted document \"{}\"", document.title),
        document.department_id,
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}
