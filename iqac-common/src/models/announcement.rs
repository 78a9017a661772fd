//! Broadcast announcements

use super::{required_text, Role};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Audience of an announcement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Visibility {
    All,
    Department,
    Faculty,
    Student,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::All => "all",
            Visibility::Department => "department",
            Visibility::Faculty => "faculty",
            Visibility::Student => "student",
        }
    }

    /// Roles reached by a role-targeted announcement
    pub fn audience_roles(&self) -> &'static [Role] {
        match self {
            Visibility::All | Visibility::Department => &Role::ALL,
            Visibility::Faculty => &[Role::Faculty, Role::Coordinator, Role::Sports],
            Visibility::Student => &[Role::Student],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Priority {
    Normal,
    Important,
    Urgent,
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Normal
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Announcement {
    pub id: Uuid,
    pub title: String,
    pub message: String,
    pub visibility: Visibility,
    pub department_id: Option<Uuid>,
    pub priority: Priority,
    pub created_by: Uuid,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sqlx(default)]
    pub author_name: Option<String>,
    #[sqlx(default)]
    pub department_name: Option<String>,
}

impl Announcement {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    /// Whether a reader with this role and department is in the audience
    pub fn is_visible_to(&self, role: Role, department_id: Option<Uuid>) -> bool {
        if role == Role::Admin {
            return true;
        }
        match self.visibility {
            Visibility::All => true,
            Visibility::Department => {
                self.department_id.is_some() && self.department_id == department_id
            }
            Visibility::Faculty | Visibility::Student => {
                let role_ok = self.visibility.audience_roles().contains(&role);
                let department_ok =
                    self.department_id.is_none() || self.department_id == department_id;
                role_ok && department_ok
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnnouncementInput {
    pub title: String,
    pub message: String,
    pub visibility: Visibility,
    pub department_id: Option<Uuid>,
    #[serde(default)]
    pub priority: Priority,
    pub expires_at: Option<DateTime<Utc>>,
}

impl AnnouncementInput {
    pub fn validate(mut self, now: DateTime<Utc>) -> Result<Self> {
        self.title = required_text("title", &self.title, 200)?;
        self.message = required_text("message", &self.message, 5000)?;
        if self.visibility == Visibility::Department && self.department_id.is_none() {
            return Err(Error::invalid(
                "Department visibility requires a department",
            ));
        }
        if self.visibility == Visibility::All {
            self.department_id = None;
        }
        if self.expires_at.is_some_and(|at| at <= now) {
            return Err(Error::invalid("expires_at must be in the future"));
        }
        Ok(self)
    }
}

/// Partial update; absent fields keep their value
#[derive(Debug, Clone, Deserialize)]
pub struct AnnouncementUpdate {
    pub title: Option<String>,
    pub message: Option<String>,
    pub priority: Option<Priority>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl AnnouncementUpdate {
    pub fn apply(
        self,
        current: &Announcement,
    ) -> Result<(String, String, Priority, Option<DateTime<Utc>>)> {
        let title = match self.title {
            Some(t) => required_text("title", &t, 200)?,
            None => current.title.clone(),
        };
        let message = match self.message {
            Some(m) => required_text("message", &m, 5000)?,
            None => current.message.clone(),
        };
        Ok((
            title,
            message,
            self.priority.unwrap_or(current.priority),
            self.expires_at.or(current.expires_at),
        ))
    }
}
