//! Audit trail browsing

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use iqac_common::models::{Action, ActivityLog};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::db::activity::ActivityFilter;
use crate::error::ApiResult;
use crate::pagination::{Page, PageWindow};
use crate::scope::Scope;
use crate::{db, AppState};

/// Query parameters for the activity log
#[derive(Debug, Default, Deserialize)]
pub struct ActivityQuery {
    /// Page number (1-indexed, default 1)
    pub page: Option<i64>,
    pub user_id: Option<Uuid>,
    pub action: Option<Action>,
    pub entity_type: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/activity", get(list_activity))
}

/// GET /api/activity
///
/// Admins read everything, coordinators their department and everyone
/// else their own entries, newest first.
pub async fn list_activity(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ActivityQuery>,
) -> ApiResult<Json<Page<ActivityLog>>> {
    let scope = Scope::for_user(&user);
    let filter = ActivityFilter {
        user_id: query.user_id,
        action: query.action,
        entity_type: query.entity_type,
        from: query.from,
        to: query.to,
    };

    let total_results = db::activity::count(&state.db, scope, &filter).await?;
    let window = PageWindow::clamp(total_results, query.page.unwrap_or(1));
    let entries =
        db::activity::list(&state.db, scope, &filter, window.limit(), window.offset()).await?;

    Ok(Json(Page::new(window, entries)))
}
