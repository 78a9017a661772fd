//! Student feedback
//!
//! Students rate courses, teachers and the institution. Teachers read
//! what was said about them without ever learning who said it.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use iqac_common::models::{
    Action, Feedback, FeedbackInput, FeedbackSummary, FeedbackType, RecordKind, User,
};
use iqac_common::{Role, Status};
use uuid::Uuid;

use crate::activity::log_activity;
use crate::auth::{require_role, CurrentUser};
use crate::db::feedback::{FeedbackFilter, FeedbackScope};
use crate::error::{ApiError, ApiResult};
use crate::{db, AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/feedback", get(list_feedback).post(submit_feedback))
        .route("/api/feedback/summary", get(feedback_summary))
}

/// Strip the student's identity where the reader may not see it
///
/// Admins see everything and students see their own submissions.
/// Teachers never see who rated them; coordinators see names only on
/// feedback that was not submitted anonymously.
pub(crate) fn redact_for(scope: FeedbackScope, feedback: &mut Feedback) {
    match scope {
        FeedbackScope::All | FeedbackScope::Student(_) => {}
        FeedbackScope::Teacher(_) => feedback.redact(),
        FeedbackScope::Department(_) => {
            if feedback.is_anonymous {
                feedback.redact();
            }
        }
    }
}

/// Check the target exists and fits the feedback type; returns the
/// department the feedback is filed under
async fn resolve_target(
    state: &AppState,
    student: &User,
    input: &FeedbackInput,
) -> ApiResult<Option<Uuid>> {
    match input.feedback_type {
        FeedbackType::Course => {
            let id = input.target_record_id.unwrap_or_default();
            match db::records::find(&state.db, id).await? {
                Some(course)
                    if course.kind == RecordKind::CourseTaught
                        && course.status == Status::Approved =>
                {
                    Ok(course.department_id)
                }
                _ => Err(ApiError::Validation(
                    "target_record_id must reference an approved course".to_string(),
                )),
            }
        }
        FeedbackType::Faculty => {
            let id = input.target_user_id.unwrap_or_default();
            match db::users::find_by_id(&state.db, id).await? {
                Some(teacher) if teacher.role.is_teaching() => Ok(teacher.department_id),
                _ => Err(ApiError::Validation(
                    "target_user_id must reference a faculty member".to_string(),
                )),
            }
        }
        FeedbackType::Institution => Ok(student.department_id),
    }
}

/// POST /api/feedback
pub async fn submit_feedback(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(mut input): Json<FeedbackInput>,
) -> ApiResult<(StatusCode, Json<Feedback>)> {
    require_role(&user, &[Role::Student])?;
    if input.academic_year.trim().is_empty() {
        input.academic_year = iqac_common::db::current_academic_year(&state.db).await?;
    }
    let input = input.validate()?;
    let department_id = resolve_target(&state, &user, &input).await?;

    let duplicate = || {
        ApiError::Conflict(format!(
            "You already submitted {} feedback for this target in {}",
            input.feedback_type.as_str(),
            input.academic_year
        ))
    };
    if db::feedback::exists_for(&state.db, user.id, &input).await? {
        return Err(duplicate());
    }

    // The unique index settles concurrent submissions
    let feedback = db::feedback::insert(&state.db, user.id, &input, department_id)
        .await
        .map_err(|e| {
            if iqac_common::db::is_unique_violation(&e) {
                duplicate()
            } else {
                e.into()
            }
        })?;

    log_activity(
        &state.db,
        &user,
        Action::Create,
        "feedback",
        Some(feedback.id),
        format!(
            "Submitted {} feedback for {}",
            feedback.feedback_type.as_str(),
            feedback.academic_year
        ),
        feedback.department_id,
    )
    .await;

    Ok((StatusCode::CREATED, Json(feedback)))
}

/// GET /api/feedback
pub async fn list_feedback(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(filter): Query<FeedbackFilter>,
) -> ApiResult<Json<Vec<Feedback>>> {
    let scope = FeedbackScope::for_user(&user);
    let mut entries = db::feedback::list(&state.db, scope, &filter).await?;
    for entry in &mut entries {
        redact_for(scope, entry);
    }
    Ok(Json(entries))
}

/// GET /api/feedback/summary
pub async fn feedback_summary(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(filter): Query<FeedbackFilter>,
) -> ApiResult<Json<Vec<FeedbackSummary>>> {
    let scope = FeedbackScope::for_user(&user);
    Ok(Json(db::feedback::summary(&state.db, scope, &filter).await?))
}
