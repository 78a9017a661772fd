//! Announcement broadcast

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use iqac_common::models::{
    Action, Announcement, AnnouncementInput, AnnouncementUpdate, User, Visibility,
};
use iqac_common::Role;
use serde::Deserialize;
use uuid::Uuid;

use crate::activity::log_activity;
use crate::auth::CurrentUser;
use crate::error::{ApiError, ApiResult};
use crate::{db, AppState};

#[derive(Debug, Default, Deserialize)]
pub struct AnnouncementQuery {
    /// Honoured for administrators only
    #[serde(default)]
    pub include_expired: bool,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/announcements",
            get(list_announcements).post(create_announcement),
        )
        .route(
            "/api/announcements/:id",
            get(get_announcement)
                .put(update_announcement)
                .delete(delete_announcement),
        )
}

fn can_see(user: &User, announcement: &Announcement) -> bool {
    announcement.created_by == user.id
        || announcement.is_visible_to(user.role, user.department_id)
}

fn can_manage(user: &User, announcement: &Announcement) -> bool {
    user.is_admin() || announcement.created_by == user.id
}

/// Apply the per-role publishing rules to a draft
fn check_publisher(user: &User, input: &mut AnnouncementInput) -> ApiResult<()> {
    match user.role {
        Role::Admin => Ok(()),
        Role::Coordinator => {
            if input.visibility == Visibility::All {
                return Err(ApiError::forbidden(
                    "Coordinators cannot address the whole institution",
                ));
            }
            let department_id = user
                .department_id
                .ok_or_else(|| ApiError::forbidden("Coordinator has no department assigned"))?;
            input.department_id = Some(department_id);
            Ok(())
        }
        Role::Sports => match input.visibility {
            Visibility::All | Visibility::Student => Ok(()),
            _ => Err(ApiError::forbidden(
                "Sports staff can only address everyone or students",
            )),
        },
        Role::Faculty | Role::Student => Err(ApiError::forbidden(format!(
            "Role {} cannot publish announcements",
            user.role
        ))),
    }
}

async fn load_announcement(state: &AppState, user: &User, id: Uuid) -> ApiResult<Announcement> {
    match db::announcements::find(&state.db, id).await? {
        Some(announcement) if can_see(user, &announcement) => Ok(announcement),
        _ => Err(ApiError::not_found("Announcement")),
    }
}

/// POST /api/announcements
pub async fn create_announcement(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(mut input): Json<AnnouncementInput>,
) -> ApiResult<(StatusCode, Json<Announcement>)> {
    check_publisher(&user, &mut input)?;
    let input = input.validate(iqac_common::time::now())?;

    if let Some(department_id) = input.department_id {
        if !db::departments::exists(&state.db, department_id).await? {
            return Err(ApiError::Validation("Department does not exist".to_string()));
        }
    }

    let announcement = db::announcements::insert(&state.db, &input, user.id).await?;

    log_activity(
        &state.db,
        &user,
        Action::Create,
        "announcement",
        Some(announcement.id),
        format!(
            "Published announcement \"{}\" to {}",
            announcement.title,
            announcement.visibility.as_str()
        ),
        announcement.department_id,
    )
    .await;

    Ok((StatusCode::CREATED, Json(announcement)))
}

/// GET /api/announcements
///
/// Announcements addressed to the caller, urgent first, then newest.
pub async fn list_announcements(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<AnnouncementQuery>,
) -> ApiResult<Json<Vec<Announcement>>> {
    let include_expired = query.include_expired && user.is_admin();
    let announcements =
        db::announcements::list(&state.db, include_expired, iqac_common::time::now()).await?;

    let visible = announcements
        .into_iter()
        .filter(|a| can_see(&user, a))
        .collect();
    Ok(Json(visible))
}

/// GET /api/announcements/:id
///
/// Expired announcements are readable by admins only, as in the list.
pub async fn get_announcement(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Announcement>> {
    let announcement = load_announcement(&state, &user, id).await?;
    if !user.is_admin() && announcement.is_expired(iqac_common::time::now()) {
        return Err(ApiError::not_found("Announcement"));
    }
    Ok(Json(announcement))
}

/// PUT /api/announcements/:id
pub async fn update_announcement(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(update): Json<AnnouncementUpdate>,
) -> ApiResult<Json<Announcement>> {
    let current = load_announcement(&state, &user, id).await?;
    if !can_manage(&user, &current) {
        return Err(ApiError::forbidden("Only the author can edit this announcement"));
    }
    if update
        .expires_at
        .is_some_and(|at| at <= iqac_common::time::now())
    {
        return Err(ApiError::Validation("expires_at must be in the future".to_string()));
    }

    let (title, message, priority, expires_at) = update.apply(&current)?;
    db::announcements::update(&state.db, id, &title, &message, priority, expires_at).await?;

    log_activity(
        &state.db,
        &user,
        Action::Update,
        "announcement",
        Some(id),
        format!("Updated announcement \"{}\"", title),
        current.department_id,
    )
    .await;

    Ok(Json(load_announcement(&state, &user, id).await?))
}

/// DELETE /api/announcements/:id
pub async fn delete_announcement(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let current = load_announcement(&state, &user, id).await?;
    if !can_manage(&user, &current) {
        return Err(ApiError::forbidden("Only the author can delete this announcement"));
    }

    db::announcements::delete(&state.db, id).await?;

    log_activity(
        &state.db,
        &user,
        Action::Delete,
        "announcement",
        Some(id),
        format!("Deleted announcement \"{}\"", current.title),
        current.department_id,
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}
