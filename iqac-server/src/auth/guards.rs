//! Role checks shared by the handlers

use iqac_common::models::User;
use iqac_common::Role;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

/// Require one of the given roles
pub fn require_role(user: &User, allowed: &[Role]) -> ApiResult<()> {
    if allowed.contains(&user.role) {
        Ok(())
    } else {
        Err(ApiError::forbidden(format!(
            "This action is not available to role {}",
            user.role
        )))
    }
}

pub fn require_admin(user: &User) -> ApiResult<()> {
    require_role(user, &[Role::Admin])
}

/// Require admin or coordinator; returns the coordinator's department
/// (`None` for admin)
pub fn require_staff_department(user: &User) -> ApiResult<Option<Uuid>> {
    match user.role {
        Role::Admin => Ok(None),
        Role::Coordinator => user
            .department_id
            .map(Some)
            .ok_or_else(|| ApiError::forbidden("Coordinator has no department assigned")),
        _ => Err(ApiError::forbidden("Administrator or coordinator role required")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(role: Role, department_id: Option<Uuid>) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            name: "Test".into(),
            email: "t@college.edu".into(),
            password_hash: String::new(),
            role,
            department_id,
            is_approved: true,
            phone: None,
            designation: None,
            created_at: now,
            updated_at: now,
            department_name: None,
        }
    }

    #[test]
    fn test_require_role() {
        let student = user(Role::Student, None);
        assert!(require_role(&student, &[Role::Student, Role::Faculty]).is_ok());
        assert!(require_role(&student, &[Role::Faculty]).is_err());
        assert!(require_admin(&student).is_err());
        assert!(require_admin(&user(Role::Admin, None)).is_ok());
    }

    #[test]
    fn test_staff_department() {
        let dept = Uuid::new_v4();
        assert_eq!(require_staff_department(&user(Role::Admin, None)).unwrap(), None);
        assert_eq!(
            require_staff_department(&user(Role::Coordinator, Some(dept))).unwrap(),
            Some(dept)
        );
        assert!(require_staff_department(&user(Role::Coordinator, None)).is_err());
        assert!(require_staff_department(&user(Role::Faculty, Some(dept))).is_err());
    }
}
