//! Role-scoped read filters
//!
//! Every list endpoint narrows its query by the caller's scope: admins see
//! the whole institution, coordinators their department, everyone else
//! only what they own.

use iqac_common::models::User;
use iqac_common::Role;
use sqlx::{QueryBuilder, Sqlite};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    All,
    Department(Uuid),
    Owner(Uuid),
}

impl Scope {
    pub fn for_user(user: &User) -> Self {
        match (user.role, user.department_id) {
            (Role::Admin, _) => Scope::All,
            (Role::Coordinator, Some(department_id)) => Scope::Department(department_id),
            _ => Scope::Owner(user.id),
        }
    }

    /// Append ` AND <column> = ?` for this scope to a query that already
    /// has a WHERE clause
    pub fn push_filter(
        &self,
        query: &mut QueryBuilder<'_, Sqlite>,
        department_column: &str,
        owner_column: &str,
    ) {
        match *self {
            Scope::All => {}
            Scope::Department(department_id) => {
                query
                    .push(format!(" AND {} = ", department_column))
                    .push_bind(department_id);
            }
            Scope::Owner(owner_id) => {
                query
                    .push(format!(" AND {} = ", owner_column))
                    .push_bind(owner_id);
            }
        }
    }

    /// Whether a row with this owner and department is inside the scope
    pub fn allows(&self, owner_id: Uuid, department_id: Option<Uuid>) -> bool {
        match *self {
            Scope::All => true,
            Scope::Department(d) => department_id == Some(d),
            Scope::Owner(o) => owner_id == o,
        }
    }
}
