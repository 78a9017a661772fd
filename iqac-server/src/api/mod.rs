//! HTTP API handlers for iqac-server

pub mod activity;
pub mod announcements;
pub mod auth;
pub mod buildinfo;
pub mod dashboard;
pub mod departments;
pub mod documents;
pub mod feedback;
pub mod health;
pub mod records;
pub mod reports;
pub mod timetables;
pub mod users;

pub use buildinfo::get_build_info;
pub use health::health_routes;

use iqac_common::models::User;
use iqac_common::{Role, Status};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

/// Who may approve or reject a submission
///
/// Admins review anything, at any time. Coordinators review pending
/// submissions of their own department that they did not submit.
pub(crate) fn check_reviewer(
    reviewer: &User,
    owner_id: Uuid,
    department_id: Option<Uuid>,
    status: Status,
) -> ApiResult<()> {
    match reviewer.role {
        Role::Admin => Ok(()),
        Role::Coordinator if reviewer.coordinates(department_id) => {
            if owner_id == reviewer.id {
                return Err(ApiError::forbidden("You cannot review your own submission"));
            }
            if status != Status::Pending {
                return Err(ApiError::Conflict(format!(
                    "Submission is already {}",
                    status
                )));
            }
            Ok(())
        }
        _ => Err(ApiError::forbidden(
            "Only an administrator or the department coordinator can review this",
        )),
    }
}
