//! Role-scoped dashboard counters

use axum::{extract::State, routing::get, Json, Router};
use iqac_common::models::{ActivityLog, RecordKind, User};
use iqac_common::{Role, Status};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::auth::CurrentUser;
use crate::db::activity::ActivityFilter;
use crate::db::feedback::{FeedbackFilter, FeedbackScope};
use crate::error::ApiResult;
use crate::scope::Scope;
use crate::{db, AppState};

/// Entries shown in the recent activity panel
const RECENT_ACTIVITY: i64 = 10;

#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct StatusCounts {
    pub pending: i64,
    pub approved: i64,
    pub rejected: i64,
}

impl StatusCounts {
    fn add(&mut self, status: Status, count: i64) {
        match status {
            Status::Pending => self.pending += count,
            Status::Approved => self.approved += count,
            Status::Rejected => self.rejected += count,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserCounts {
    pub by_role: BTreeMap<&'static str, i64>,
    pub pending_approvals: i64,
}

#[derive(Debug, Serialize)]
pub struct FeedbackCounts {
    pub count: i64,
    pub average_rating: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct Dashboard {
    /// Keyed by record path segment
    pub records: BTreeMap<&'static str, StatusCounts>,
    pub documents: StatusCounts,
    /// Present for admins and coordinators
    pub users: Option<UserCounts>,
    pub announcements: usize,
    pub feedback: FeedbackCounts,
    pub recent_activity: Vec<ActivityLog>,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/dashboard", get(dashboard))
}

async fn user_counts(state: &AppState, user: &User) -> ApiResult<Option<UserCounts>> {
    let department_id = match (user.role, user.department_id) {
        (Role::Admin, _) => None,
        (Role::Coordinator, Some(department_id)) => Some(department_id),
        _ => return Ok(None),
    };

    let mut by_role: BTreeMap<&'static str, i64> =
        Role::ALL.iter().map(|r| (r.as_str(), 0)).collect();
    for (role, count) in db::users::count_by_role(&state.db, department_id).await? {
        by_role.insert(role.as_str(), count);
    }
    let pending_approvals = db::users::count_pending(&state.db, department_id).await?;

    Ok(Some(UserCounts { by_role, pending_approvals }))
}

/// GET /api/dashboard
pub async fn dashboard(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<Dashboard>> {
    let scope = Scope::for_user(&user);
    let now = iqac_common::time::now();

    let mut records: BTreeMap<&'static str, StatusCounts> = RecordKind::ALL
        .iter()
        .map(|k| (k.path_segment(), StatusCounts::default()))
        .collect();
    for (kind, status, count) in db::records::count_by_status(&state.db, scope).await? {
        records.entry(kind.path_segment()).or_default().add(status, count);
    }

    let mut documents = StatusCounts::default();
    for (status, count) in db::documents::count_by_status(&state.db, scope).await? {
        documents.add(status, count);
    }

    let announcements = db::announcements::list(&state.db, false, now)
        .await?
        .iter()
        .filter(|a| a.created_by == user.id || a.is_visible_to(user.role, user.department_id))
        .count();

    let summary = db::feedback::summary(
        &state.db,
        FeedbackScope::for_user(&user),
        &FeedbackFilter::default(),
    )
    .await?;
    let count: i64 = summary.iter().map(|s| s.count).sum();
    let rating_sum: f64 = summary
        .iter()
        .map(|s| s.average_rating.unwrap_or(0.0) * s.count as f64)
        .sum();
    let feedback = FeedbackCounts {
        count,
        average_rating: (count > 0).then(|| rating_sum / count as f64),
    };

    let recent_activity = db::activity::list(
        &state.db,
        scope,
        &ActivityFilter::default(),
        RECENT_ACTIVITY,
        0,
    )
    .await?;

    Ok(Json(Dashboard {
        records,
        documents,
        users: user_counts(&state, &user).await?,
        announcements,
        feedback,
        recent_activity,
    }))
}
