//! Audit trail writer
//!
//! Called by every write handler after the write succeeded. A failed log
//! insert is reported but never turns a successful write into an error.

use iqac_common::models::{Action, User};
use sqlx::SqlitePool;
use tracing::{info, warn};
use uuid::Uuid;

/// Record one activity entry
///
/// `department_id` defaults to the actor's department.
pub async fn log_activity(
    db: &SqlitePool,
    actor: &User,
    action: Action,
    entity_type: &str,
    entity_id: Option<Uuid>,
    description: impl Into<String>,
    department_id: Option<Uuid>,
) {
    let description = description.into();
    let department_id = department_id.or(actor.department_id);

    info!(
        user = %actor.email,
        action = action.as_str(),
        entity = entity_type,
        "{}",
        description
    );

    if let Err(e) = crate::db::activity::insert(
        db,
        actor.id,
        action,
        entity_type,
        entity_id,
        &description,
        department_id,
    )
    .await
    {
        warn!("Failed to write activity log entry ({}): {}", entity_type, e);
    }
}
