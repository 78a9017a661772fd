//! Activity records and their review workflow
//!
//! All five record kinds share these handlers; the kind comes from the
//! first path segment after `/api/records/`.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use iqac_common::models::{
    Action, Record, RecordInput, RecordKind, ReviewDecision, User, ValidatedRecord,
};
use iqac_common::{Role, Status};
use uuid::Uuid;

use crate::activity::log_activity;
use crate::api::check_reviewer;
use crate::auth::CurrentUser;
use crate::db::records::RecordFilter;
use crate::error::{ApiError, ApiResult};
use crate::scope::Scope;
use crate::uploads::StoredFile;
use crate::{db, AppState};

/// Upload subdirectory for record evidence
const FILES_CATEGORY: &str = "records";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/records/:kind", get(list_records).post(create_record))
        .route(
            "/api/records/:kind/:id",
            get(get_record).put(update_record).delete(delete_record),
        )
        .route("/api/records/:kind/:id/review", put(review_record))
        .route("/api/records/:kind/:id/files", post(upload_files))
}

pub(crate) fn parse_kind(segment: &str) -> ApiResult<RecordKind> {
    RecordKind::from_path_segment(segment).ok_or_else(|| ApiError::not_found("Record type"))
}

/// Read scope for records of `kind`
///
/// Students see the approved courses of their department so they can
/// pick one to rate; everything else follows the usual role scope.
pub(crate) fn record_scope(user: &User, kind: RecordKind, filter: &mut RecordFilter) -> Scope {
    match (user.role, kind, user.department_id) {
        (Role::Student, RecordKind::CourseTaught, Some(department_id)) => {
            filter.status = Some(Status::Approved);
            Scope::Department(department_id)
        }
        _ => Scope::for_user(user),
    }
}

fn can_view(user: &User, record: &Record) -> bool {
    let student_course = user.role == Role::Student
        && record.kind == RecordKind::CourseTaught
        && record.status == Status::Approved
        && user.department_id.is_some()
        && record.department_id == user.department_id;
    student_course || Scope::for_user(user).allows(record.owner_id, record.department_id)
}

/// Load a record of `kind` that the caller may see
async fn load_record(state: &AppState, user: &User, kind: RecordKind, id: Uuid) -> ApiResult<Record> {
    match db::records::find(&state.db, id).await? {
        Some(record) if record.kind == kind && can_view(user, &record) => Ok(record),
        _ => Err(ApiError::not_found("Record")),
    }
}

/// Sports staff file institutional events under the sports category only
fn check_sports_category(user: &User, kind: RecordKind, input: &ValidatedRecord) -> ApiResult<()> {
    if user.role == Role::Sports
        && kind == RecordKind::InstitutionalEvent
        && input.category() != Some("sports")
    {
        return Err(ApiError::forbidden(
            "Sports staff can only record institutional events in the sports category",
        ));
    }
    Ok(())
}

async fn ensure_department(state: &AppState, department_id: Option<Uuid>) -> ApiResult<()> {
    if let Some(department_id) = department_id {
        if !db::departments::exists(&state.db, department_id).await? {
            return Err(ApiError::Validation("Department does not exist".to_string()));
        }
    }
    Ok(())
}

/// GET /api/records/:kind
pub async fn list_records(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(kind): Path<String>,
    Query(mut filter): Query<RecordFilter>,
) -> ApiResult<Json<Vec<Record>>> {
    let kind = parse_kind(&kind)?;
    if !user.is_admin() {
        filter.department_id = None;
    }
    if !matches!(user.role, Role::Admin | Role::Coordinator) {
        filter.owner_id = None;
    }
    let scope = record_scope(&user, kind, &mut filter);
    let records = db::records::list(&state.db, kind, scope, &filter).await?;
    Ok(Json(records))
}

/// GET /api/records/:kind/:id
pub async fn get_record(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((kind, id)): Path<(String, Uuid)>,
) -> ApiResult<Json<Record>> {
    let kind = parse_kind(&kind)?;
    Ok(Json(load_record(&state, &user, kind, id).await?))
}

/// POST /api/records/:kind
///
/// The caller owns the new record and it belongs to the caller's
/// department. Records entered by an admin are approved on creation.
pub async fn create_record(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(kind): Path<String>,
    Json(input): Json<RecordInput>,
) -> ApiResult<(StatusCode, Json<Record>)> {
    let kind = parse_kind(&kind)?;
    if !kind.creatable_by(user.role) {
        return Err(ApiError::forbidden(format!(
            "Role {} cannot create {}",
            user.role,
            kind.label()
        )));
    }

    let input = input.validate(kind)?;
    check_sports_category(&user, kind, &input)?;

    let department_id = if user.is_admin() {
        ensure_department(&state, input.department_id).await?;
        input.department_id
    } else {
        user.department_id
    };
    let (status, reviewed_by) = if user.is_admin() {
        (Status::Approved, Some(user.id))
    } else {
        (Status::Pending, None)
    };

    let record = db::records::insert(
        &state.db,
        kind,
        user.id,
        &input,
        department_id,
        status,
        reviewed_by,
    )
    .await?;

    log_activity(
        &state.db,
        &user,
        Action::Create,
        kind.as_str(),
        Some(record.id),
        format!("Created {} record \"{}\"", kind.as_str(), record.title),
        record.department_id,
    )
    .await;

    Ok((StatusCode::CREATED, Json(record)))
}

/// PUT /api/records/:kind/:id
///
/// Owners edit while the record is pending or rejected; editing a
/// rejected record sends it back for review.
pub async fn update_record(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((kind, id)): Path<(String, Uuid)>,
    Json(input): Json<RecordInput>,
) -> ApiResult<Json<Record>> {
    let kind = parse_kind(&kind)?;
    let mut record = load_record(&state, &user, kind, id).await?;

    let is_owner = record.owner_id == user.id;
    if !user.is_admin() {
        if !is_owner {
            return Err(ApiError::forbidden("Only the owner can edit this record"));
        }
        if record.status == Status::Approved {
            return Err(ApiError::forbidden("Approved records can no longer be edited"));
        }
    }

    let input = input.validate(kind)?;
    check_sports_category(&user, kind, &input)?;

    if user.is_admin() && input.department_id.is_some() {
        ensure_department(&state, input.department_id).await?;
        record.department_id = input.department_id;
    }
    record.title = input.title;
    record.description = input.description;
    record.academic_year = input.academic_year;
    record.start_date = input.start_date;
    record.end_date = input.end_date;
    record.details.0 = input.details;

    if !user.is_admin() && record.status == Status::Rejected {
        record.status = Status::Pending;
        record.reviewed_by = None;
        record.reviewed_at = None;
        record.remarks = None;
    }

    db::records::save(&state.db, &record).await?;

    log_activity(
        &state.db,
        &user,
        Action::Update,
        kind.as_str(),
        Some(record.id),
        format!("Updated {} record \"{}\"", kind.as_str(), record.title),
        record.department_id,
    )
    .await;

    Ok(Json(load_record(&state, &user, kind, id).await?))
}

/// PUT /api/records/:kind/:id/review
pub async fn review_record(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((kind, id)): Path<(String, Uuid)>,
    Json(decision): Json<ReviewDecision>,
) -> ApiResult<Json<Record>> {
    let kind = parse_kind(&kind)?;
    let mut record = load_record(&state, &user, kind, id).await?;

    check_reviewer(&user, record.owner_id, record.department_id, record.status)?;
    let remarks = decision.validate()?;

    record.status = decision.status;
    record.reviewed_by = Some(user.id);
    record.reviewed_at = Some(iqac_common::time::now());
    record.remarks = remarks;
    db::records::save(&state.db, &record).await?;

    log_activity(
        &state.db,
        &user,
        Action::Update,
        kind.as_str(),
        Some(record.id),
        format!("Marked {} record \"{}\" {}", kind.as_str(), record.title, record.status),
        record.department_id,
    )
    .await;

    Ok(Json(load_record(&state, &user, kind, id).await?))
}

/// Save every `file` field of the request, removing what was already
/// written if a later field fails
async fn save_file_fields(state: &AppState, multipart: &mut Multipart) -> ApiResult<Vec<StoredFile>> {
    let mut saved: Vec<StoredFile> = Vec::new();
    loop {
        let result = match multipart.next_field().await {
            Ok(Some(field)) => {
                if field.name() == Some("file") {
                    match state.uploads.read_field(field).await {
                        Ok((name, content)) => state
                            .uploads
                            .save(FILES_CATEGORY, &name, &content)
                            .await
                            .map(Some),
                        Err(e) => Err(e),
                    }
                } else {
                    Ok(None)
                }
            }
            Ok(None) => break,
            Err(e) => Err(ApiError::from(e)),
        };

        match result {
            Ok(Some(file)) => saved.push(file),
            Ok(None) => {}
            Err(e) => {
                for file in &saved {
                    state.uploads.remove(&file.relative_path).await;
                }
                return Err(e);
            }
        }
    }
    Ok(saved)
}

/// POST /api/records/:kind/:id/files
pub async fn upload_files(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((kind, id)): Path<(String, Uuid)>,
    mut multipart: Multipart,
) -> ApiResult<Json<Record>> {
    let kind = parse_kind(&kind)?;
    let mut record = load_record(&state, &user, kind, id).await?;
    if !user.is_admin() && record.owner_id != user.id {
        return Err(ApiError::forbidden("Only the owner can attach files"));
    }

    let saved = save_file_fields(&state, &mut multipart).await?;
    if saved.is_empty() {
        return Err(ApiError::Validation("No file was uploaded".to_string()));
    }

    record
        .files
        .0
        .extend(saved.iter().map(|f| f.relative_path.clone()));
    if let Err(e) = db::records::save(&state.db, &record).await {
        for file in &saved {
            state.uploads.remove(&file.relative_path).await;
        }
        return Err(e.into());
    }

    let names: Vec<&str> = saved.iter().map(|f| f.original_name.as_str()).collect();
    log_activity(
        &state.db,
        &user,
        Action::Update,
        kind.as_str(),
        Some(record.id),
        format!("Attached {} to \"{}\"", names.join(", "), record.title),
        record.department_id,
    )
    .await;

    Ok(Json(load_record(&state, &user, kind, id).await?))
}

/// DELETE /api/records/:kind/:id
pub async fn delete_record(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((kind, id)): Path<(String, Uuid)>,
) -> ApiResult<StatusCode> {
    let kind = parse_kind(&kind)?;
    let record = load_record(&state, &user, kind, id).await?;

    let allowed = user.is_admin()
        || user.coordinates(record.department_id)
        || (record.owner_id == user.id && record.status != Status::Approved);
    if !allowed {
        return Err(ApiError::forbidden("You cannot delete this record"));
    }

    if !db::records::delete(&state.db, id).await? {
        return Err(ApiError::not_found("Record"));
    }
    for file in &record.files.0 {
        state.uploads.remove(file).await;
    }

    log_activity(
        &state.db,
        &user,
        Action::Delete,
        kind.as_str(),
        Some(record.id),
        format!("Deleted {} record \"{}\"", kind.as_str(), record.title),
        record.department_id,
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}
