//! Weekly timetables

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use iqac_common::models::{find_faculty_clash, Action, Slot, Timetable, TimetableInput, User};
use iqac_common::Role;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::activity::log_activity;
use crate::auth::{require_role, require_staff_department, CurrentUser};
use crate::db::timetables::TimetableFilter;
use crate::error::{ApiError, ApiResult};
use crate::{db, AppState};

#[derive(Debug, Default, Deserialize)]
pub struct ScheduleQuery {
    pub academic_year: Option<String>,
}

/// One teaching slot of the caller with the timetable it belongs to
#[derive(Debug, Serialize)]
pub struct ScheduleEntry {
    pub timetable_id: Uuid,
    pub department_id: Uuid,
    pub department_name: Option<String>,
    pub semester: i64,
    pub academic_year: String,
    pub section: String,
    #[serde(flatten)]
    pub slot: Slot,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/timetables",
            get(list_timetables).put(upsert_timetable),
        )
        .route("/api/timetables/my-schedule", get(my_schedule))
        .route(
            "/api/timetables/:id",
            get(get_timetable).delete(delete_timetable),
        )
}

/// Every slot's faculty must be an existing teaching account
async fn check_faculty(state: &AppState, slots: &[Slot]) -> ApiResult<()> {
    let faculty: BTreeSet<Uuid> = slots.iter().filter_map(|s| s.faculty_id).collect();
    for id in faculty {
        match db::users::find_by_id(&state.db, id).await? {
            Some(teacher) if teacher.role.is_teaching() => {}
            _ => {
                return Err(ApiError::Validation(format!(
                    "faculty_id {} is not a faculty member",
                    id
                )))
            }
        }
    }
    Ok(())
}

/// PUT /api/timetables
///
/// Creates the timetable for (department, semester, year, section) or
/// replaces its slots. Returns 201 on create and 200 on replace.
pub async fn upsert_timetable(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(mut input): Json<TimetableInput>,
) -> ApiResult<(StatusCode, Json<Timetable>)> {
    if let Some(own_department) = require_staff_department(&user)? {
        if input.department_id != own_department {
            return Err(ApiError::forbidden(
                "Coordinators can only manage their own department's timetables",
            ));
        }
    }

    if input.academic_year.trim().is_empty() {
        input.academic_year = iqac_common::db::current_academic_year(&state.db).await?;
    }
    let input = input.validate()?;
    if !db::departments::exists(&state.db, input.department_id).await? {
        return Err(ApiError::Validation("Department does not exist".to_string()));
    }
    check_faculty(&state, &input.slots).await?;

    let section = input.section.clone().unwrap_or_default();
    let existing = db::timetables::find_by_key(
        &state.db,
        input.department_id,
        input.semester,
        &input.academic_year,
        &section,
    )
    .await?;

    let others = db::timetables::others_in_year(
        &state.db,
        &input.academic_year,
        existing.as_ref().map(|t| t.id),
    )
    .await?;
    if let Some(clash) = find_faculty_clash(&input.slots, &others) {
        return Err(ApiError::Conflict(format!(
            "Faculty {} is already scheduled on {:?} {}-{} in timetable {}",
            clash.faculty_id, clash.day, clash.start_time, clash.end_time, clash.other_timetable_id
        )));
    }

    let (timetable, action, status) = match existing {
        Some(current) => {
            db::timetables::replace_slots(&state.db, current.id, &input.slots).await?;
            let updated = db::timetables::find(&state.db, current.id)
                .await?
                .ok_or_else(|| ApiError::not_found("Timetable"))?;
            (updated, Action::Update, StatusCode::OK)
        }
        None => {
            let created = db::timetables::insert(&state.db, &input, user.id).await?;
            (created, Action::Create, StatusCode::CREATED)
        }
    };

    log_activity(
        &state.db,
        &user,
        action,
        "timetable",
        Some(timetable.id),
        format!(
            "Saved timetable for semester {} {} ({} slots)",
            timetable.semester,
            timetable.academic_year,
            timetable.slots.0.len()
        ),
        Some(timetable.department_id),
    )
    .await;

    Ok((status, Json(timetable)))
}

/// GET /api/timetables
///
/// Everyone but the admin reads only their own department's timetables.
pub async fn list_timetables(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(mut filter): Query<TimetableFilter>,
) -> ApiResult<Json<Vec<Timetable>>> {
    if !user.is_admin() {
        match user.department_id {
            Some(department_id) => filter.department_id = Some(department_id),
            None => return Ok(Json(Vec::new())),
        }
    }
    Ok(Json(db::timetables::list(&state.db, &filter).await?))
}

async fn load_timetable(state: &AppState, user: &User, id: Uuid) -> ApiResult<Timetable> {
    match db::timetables::find(&state.db, id).await? {
        Some(t) if user.is_admin() || user.department_id == Some(t.department_id) => Ok(t),
        _ => Err(ApiError::not_found("Timetable")),
    }
}

/// GET /api/timetables/:id
pub async fn get_timetable(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Timetable>> {
    Ok(Json(load_timetable(&state, &user, id).await?))
}

/// DELETE /api/timetables/:id
pub async fn delete_timetable(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    require_staff_department(&user)?;
    let timetable = load_timetable(&state, &user, id).await?;

    if !db::timetables::delete(&state.db, id).await? {
        return Err(ApiError::not_found("Timetable"));
    }

    log_activity(
        &state.db,
        &user,
        Action::Delete,
        "timetable",
        Some(id),
        format!(
            "Deleted timetable for semester {} {}",
            timetable.semester, timetable.academic_year
        ),
        Some(timetable.department_id),
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}

/// Slots assigned to `faculty_id`, by day then start time
pub(crate) fn schedule_of(faculty_id: Uuid, timetables: Vec<Timetable>) -> Vec<ScheduleEntry> {
    let mut entries: Vec<ScheduleEntry> = timetables
        .into_iter()
        .flat_map(|t| {
            let Timetable {
                id,
                department_id,
                department_name,
                semester,
                academic_year,
                section,
                slots,
                ..
            } = t;
            slots
                .0
                .into_iter()
                .filter(|slot| slot.faculty_id == Some(faculty_id))
                .map(move |slot| ScheduleEntry {
                    timetable_id: id,
                    department_id,
                    department_name: department_name.clone(),
                    semester,
                    academic_year: academic_year.clone(),
                    section: section.clone(),
                    slot,
                })
                .collect::<Vec<_>>()
        })
        .collect();

    entries.sort_by(|a, b| (a.slot.day, &a.slot.start_time).cmp(&(b.slot.day, &b.slot.start_time)));
    entries
}

/// GET /api/timetables/my-schedule
pub async fn my_schedule(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ScheduleQuery>,
) -> ApiResult<Json<Vec<ScheduleEntry>>> {
    require_role(&user, &[Role::Faculty, Role::Coordinator])?;
    let filter = TimetableFilter {
        academic_year: query.academic_year,
        ..Default::default()
    };
    let timetables = db::timetables::list(&state.db, &filter).await?;
    Ok(Json(schedule_of(user.id, timetables)))
}
