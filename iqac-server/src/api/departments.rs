//! Department administration

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use iqac_common::models::{Action, Department, DepartmentInput};
use iqac_common::Role;
use serde::Deserialize;
use uuid::Uuid;

use crate::activity::log_activity;
use crate::auth::{require_admin, CurrentUser};
use crate::error::{ApiError, ApiResult};
use crate::{db, AppState};

#[derive(Debug, Deserialize)]
pub struct CoordinatorAssignment {
    pub user_id: Uuid,
}

/// Department list for the registration form
pub fn public_routes() -> Router<AppState> {
    Router::new().route("/api/public/departments", get(list_departments))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/departments",
            get(list_departments).post(create_department),
        )
        .route(
            "/api/departments/:id",
            get(get_department)
                .put(update_department)
                .delete(delete_department),
        )
        .route("/api/departments/:id/coordinator", put(assign_coordinator))
}

async fn load_department(state: &AppState, id: Uuid) -> ApiResult<Department> {
    db::departments::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Department"))
}

/// GET /api/departments and GET /api/public/departments
pub async fn list_departments(State(state): State<AppState>) -> ApiResult<Json<Vec<Department>>> {
    Ok(Json(db::departments::list(&state.db).await?))
}

/// GET /api/departments/:id
pub async fn get_department(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Department>> {
    Ok(Json(load_department(&state, id).await?))
}

/// POST /api/departments
pub async fn create_department(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<DepartmentInput>,
) -> ApiResult<(StatusCode, Json<Department>)> {
    require_admin(&user)?;
    let input = input.validate()?;
    let department = db::departments::insert(&state.db, &input).await?;

    log_activity(
        &state.db,
        &user,
        Action::Create,
        "department",
        Some(department.id),
        format!("Created department {} ({})", department.name, department.code),
        Some(department.id),
    )
    .await;

    Ok((StatusCode::CREATED, Json(department)))
}

/// PUT /api/departments/:id
pub async fn update_department(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<DepartmentInput>,
) -> ApiResult<Json<Department>> {
    require_admin(&user)?;
    let input = input.validate()?;
    if !db::departments::update(&state.db, id, &input).await? {
        return Err(ApiError::not_found("Department"));
    }

    log_activity(
        &state.db,
        &user,
        Action::Update,
        "department",
        Some(id),
        format!("Updated department {} ({})", input.name, input.code),
        Some(id),
    )
    .await;

    Ok(Json(load_department(&state, id).await?))
}

/// PUT /api/departments/:id/coordinator
///
/// The user must hold the coordinator role and either belong to the
/// department already or have no department yet.
pub async fn assign_coordinator(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(assignment): Json<CoordinatorAssignment>,
) -> ApiResult<Json<Department>> {
    require_admin(&user)?;
    let department = load_department(&state, id).await?;
    let coordinator = db::users::find_by_id(&state.db, assignment.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;

    if coordinator.role != Role::Coordinator {
        return Err(ApiError::Validation(format!(
            "{} does not have the coordinator role",
            coordinator.email
        )));
    }
    if coordinator.department_id.is_some_and(|d| d != id) {
        return Err(ApiError::Validation(format!(
            "{} belongs to another department",
            coordinator.email
        )));
    }

    db::departments::set_coordinator(&state.db, id, coordinator.id).await?;

    log_activity(
        &state.db,
        &user,
        Action::Update,
        "department",
        Some(id),
        format!(
            "Assigned {} as coordinator of {}",
            coordinator.email, department.name
        ),
        Some(id),
    )
    .await;

    Ok(Json(load_department(&state, id).await?))
}

/// DELETE /api/departments/:id
pub async fn delete_department(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    require_admin(&user)?;
    let department = load_department(&state, id).await?;

    let members = db::departments::count_members(&state.db, id).await?;
    if members > 0 {
        return Err(ApiError::Conflict(format!(
            "Department still has {} member(s)",
            members
        )));
    }
    db::departments::delete(&state.db, id).await?;

    log_activity(
        &state.db,
        &user,
        Action::Delete,
        "department",
        Some(id),
        format!("Deleted department {}", department.name),
        None,
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}
