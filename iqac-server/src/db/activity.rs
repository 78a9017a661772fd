use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use iqac_common::models::{Action, ActivityLog};
use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::scope::Scope;

const SELECT_ACTIVITY: &str = "SELECT l.*, u.name AS user_name \
     FROM activity_logs l LEFT JOIN users u ON u.id = l.user_id";

#[derive(Debug, Default, Clone, Deserialize)]
pub struct ActivityFilter {
    pub user_id: Option<Uuid>,
    pub action: Option<Action>,
    pub entity_type: Option<String>,
    /// Inclusive start date
    pub from: Option<NaiveDate>,
    /// Inclusive end date
    pub to: Option<NaiveDate>,
}

pub async fn insert(
    pool: &SqlitePool,
    user_id: Uuid,
    action: Action,
    entity_type: &str,
    entity_id: Option<Uuid>,
    description: &str,
    department_id: Option<Uuid>,
) -> sqlx::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO activity_logs (id, user_id, action, entity_type, entity_id, description,
                                   department_id, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(iqac_common::uuid_utils::generate())
    .bind(user_id)
    .bind(action)
    .bind(entity_type)
    .bind(entity_id)
    .bind(description)
    .bind(department_id)
    .bind(Utc::now())
    .execute(pool)
    .await?;
    Ok(())
}

fn start_of_day(date: NaiveDate) -> Option<DateTime<Utc>> {
    date.and_hms_opt(0, 0, 0).map(|dt| Utc.from_utc_datetime(&dt))
}

fn push_conditions(query: &mut QueryBuilder<'_, Sqlite>, scope: Scope, filter: &ActivityFilter) {
    query.push(" WHERE 1 = 1");
    scope.push_filter(query, "l.department_id", "l.user_id");

    if let Some(user_id) = filter.user_id {
        query.push(" AND l.user_id = ").push_bind(user_id);
    }
    if let Some(action) = filter.action {
        query.push(" AND l.action = ").push_bind(action);
    }
    if let Some(entity_type) = filter.entity_type.as_deref().filter(|e| !e.is_empty()) {
        query.push(" AND l.entity_type = ").push_bind(entity_type.to_string());
    }
    if let Some(start) = filter.from.and_then(start_of_day) {
        query.push(" AND l.created_at >= ").push_bind(start);
    }
    if let Some(end) = filter.to.and_then(|d| d.succ_opt()).and_then(start_of_day) {
        query.push(" AND l.created_at < ").push_bind(end);
    }
}

pub async fn count(pool: &SqlitePool, scope: Scope, filter: &ActivityFilter) -> sqlx::Result<i64> {
    let mut query = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM activity_logs l");
    push_conditions(&mut query, scope, filter);
    query.build_query_scalar::<i64>().fetch_one(pool).await
}

/// One page of entries, newest first
pub async fn list(
    pool: &SqlitePool,
    scope: Scope,
    filter: &ActivityFilter,
    limit: i64,
    offset: i64,
) -> sqlx::Result<Vec<ActivityLog>> {
    let mut query = QueryBuilder::<Sqlite>::new(SELECT_ACTIVITY);
    push_conditions(&mut query, scope, filter);
    query
        .push(" ORDER BY l.created_at DESC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);

    query.build_query_as::<ActivityLog>().fetch_all(pool).await
}
