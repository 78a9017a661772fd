//! Account administration
//!
//! Admins manage every account. Coordinators manage the faculty and
//! students of their own department and approve sign-ups from it.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use iqac_common::models::{Action, NewUser, User, UserUpdate};
use iqac_common::password::hash_password_blocking;
use iqac_common::Role;
use serde::Deserialize;
use uuid::Uuid;

use crate::activity::log_activity;
use crate::auth::{require_admin, require_staff_department, CurrentUser};
use crate::db::users::UserFilter;
use crate::error::{ApiError, ApiResult};
use crate::scope::Scope;
use crate::{db, AppState};

/// Roles a coordinator may create and edit
const COORDINATOR_MANAGED: &[Role] = &[Role::Faculty, Role::Student];

/// Roles whose sign-ups a coordinator may approve
const COORDINATOR_APPROVES: &[Role] = &[Role::Faculty, Role::Student, Role::Sports];

#[derive(Debug, Deserialize)]
pub struct ApprovalRequest {
    pub approved: bool,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/users", get(list_users).post(create_user))
        .route("/api/users/pending", get(list_pending))
        .route(
            "/api/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route("/api/users/:id/approve", put(approve_user))
}

fn staff_scope(department_id: Option<Uuid>) -> Scope {
    match department_id {
        Some(department_id) => Scope::Department(department_id),
        None => Scope::All,
    }
}

async fn load_user(state: &AppState, id: Uuid) -> ApiResult<User> {
    db::users::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))
}

async fn ensure_department(state: &AppState, department_id: Option<Uuid>) -> ApiResult<()> {
    if let Some(department_id) = department_id {
        if !db::departments::exists(&state.db, department_id).await? {
            return Err(ApiError::Validation("Department does not exist".to_string()));
        }
    }
    Ok(())
}

/// GET /api/users
pub async fn list_users(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(filter): Query<UserFilter>,
) -> ApiResult<Json<Vec<User>>> {
    let department_id = require_staff_department(&user)?;
    let users = db::users::list(&state.db, staff_scope(department_id), &filter).await?;
    Ok(Json(users))
}

/// GET /api/users/pending
pub async fn list_pending(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<Vec<User>>> {
    let department_id = require_staff_department(&user)?;
    let users = db::users::list_pending(&state.db, department_id).await?;
    Ok(Json(users))
}

/// GET /api/users/:id
pub async fn get_user(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<User>> {
    let target = load_user(&state, id).await?;
    if !Scope::for_user(&user).allows(target.id, target.department_id) {
        return Err(ApiError::not_found("User"));
    }
    Ok(Json(target))
}

/// POST /api/users
///
/// Accounts created here are approved immediately.
pub async fn create_user(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(mut input): Json<NewUser>,
) -> ApiResult<(StatusCode, Json<User>)> {
    if let Some(own_department) = require_staff_department(&user)? {
        if !COORDINATOR_MANAGED.contains(&input.role) {
            return Err(ApiError::forbidden(
                "Coordinators can only create faculty and student accounts",
            ));
        }
        match input.department_id {
            None => input.department_id = Some(own_department),
            Some(d) if d == own_department => {}
            Some(_) => {
                return Err(ApiError::forbidden(
                    "Coordinators can only create accounts in their own department",
                ))
            }
        }
    }

    let input = input.validate()?;
    ensure_department(&state, input.department_id).await?;
    if db::users::find_by_email(&state.db, &input.email).await?.is_some() {
        return Err(ApiError::Conflict("Email is already registered".to_string()));
    }

    let hash = hash_password_blocking(input.password.clone(), state.settings.bcrypt_cost).await?;
    let created = db::users::insert(&state.db, &input, &hash, true).await?;

    log_activity(
        &state.db,
        &user,
        Action::Create,
        "user",
        Some(created.id),
        format!("Created {} account {}", created.role, created.email),
        created.department_id,
    )
    .await;

    Ok((StatusCode::CREATED, Json(created)))
}

/// PUT /api/users/:id
pub async fn update_user(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(update): Json<UserUpdate>,
) -> ApiResult<Json<User>> {
    let own_department = require_staff_department(&user)?;
    let target = load_user(&state, id).await?;

    if let Some(own_department) = own_department {
        if target.department_id != Some(own_department) {
            return Err(ApiError::not_found("User"));
        }
        if !COORDINATOR_MANAGED.contains(&target.role) {
            return Err(ApiError::forbidden(
                "Coordinators can only edit faculty and student accounts",
            ));
        }
        if update.role.is_some_and(|r| !COORDINATOR_MANAGED.contains(&r)) {
            return Err(ApiError::forbidden(
                "Coordinators can only assign the faculty or student role",
            ));
        }
        if update.department_id.is_some_and(|d| d != own_department) {
            return Err(ApiError::forbidden(
                "Coordinators cannot move users to another department",
            ));
        }
    }
    if target.id == user.id && update.role.is_some_and(|r| r != user.role) {
        return Err(ApiError::Validation("You cannot change your own role".to_string()));
    }

    let mut updated = target.clone();
    update.apply(&mut updated)?;
    if updated.department_id != target.department_id {
        ensure_department(&state, updated.department_id).await?;
    }
    if updated.email != target.email
        && db::users::find_by_email(&state.db, &updated.email).await?.is_some()
    {
        return Err(ApiError::Conflict("Email is already registered".to_string()));
    }

    db::users::save(&state.db, &updated).await?;

    // A coordinator who changes role or department leaves their old post
    let left_post = target.role == Role::Coordinator
        && (updated.role != Role::Coordinator || updated.department_id != target.department_id);
    if left_post {
        db::departments::clear_coordinator(&state.db, target.id).await?;
    }

    log_activity(
        &state.db,
        &user,
        Action::Update,
        "user",
        Some(target.id),
        format!("Updated account {}", updated.email),
        updated.department_id,
    )
    .await;

    Ok(Json(load_user(&state, id).await?))
}

/// PUT /api/users/:id/approve
pub async fn approve_user(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(request): Json<ApprovalRequest>,
) -> ApiResult<Json<User>> {
    let own_department = require_staff_department(&user)?;
    let mut target = load_user(&state, id).await?;

    if target.id == user.id {
        return Err(ApiError::Validation(
            "You cannot change your own approval".to_string(),
        ));
    }
    if let Some(own_department) = own_department {
        if target.department_id != Some(own_department) {
            return Err(ApiError::not_found("User"));
        }
        if !COORDINATOR_APPROVES.contains(&target.role) {
            return Err(ApiError::forbidden(format!(
                "Coordinators cannot approve {} accounts",
                target.role
            )));
        }
    }

    target.is_approved = request.approved;
    db::users::save(&state.db, &target).await?;

    let verb = if request.approved { "Approved" } else { "Revoked approval of" };
    log_activity(
        &state.db,
        &user,
        Action::Update,
        "user",
        Some(target.id),
        format!("{} account {}", verb, target.email),
        target.department_id,
    )
    .await;

    Ok(Json(load_user(&state, id).await?))
}

/// DELETE /api/users/:id
///
/// Deletes the account with everything it owns; stored files go too.
pub async fn delete_user(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    require_admin(&user)?;
    let target = load_user(&state, id).await?;

    if target.id == user.id {
        return Err(ApiError::Validation("You cannot delete your own account".to_string()));
    }
    if db::departments::is_coordinator_of_any(&state.db, target.id).await? {
        return Err(ApiError::Conflict(
            "User is the coordinator of a department; assign another coordinator first"
                .to_string(),
        ));
    }

    let mut files = db::records::file_paths_of_owner(&state.db, target.id).await?;
    files.extend(db::documents::file_paths_of_uploader(&state.db, target.id).await?);

    if !db::users::delete(&state.db, target.id).await? {
        return Err(ApiError::not_found("User"));
    }
    for file in &files {
        state.uploads.remove(file).await;
    }

    log_activity(
        &state.db,
        &user,
        Action::Delete,
        "user",
        Some(target.id),
        format!("Deleted account {}", target.email),
        target.department_id,
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}
