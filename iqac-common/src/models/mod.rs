//! Entity models and their validation rules
//!
//! Models mirror the database tables one-to-one. Fields that come from
//! joined tables (display names) are marked `#[sqlx(default)]` so the same
//! struct can be read with or without the join.

pub mod activity;
pub mod announcement;
pub mod department;
pub mod document;
pub mod feedback;
pub mod record;
pub mod timetable;
pub mod user;

pub use activity::{Action, ActivityLog};
pub use announcement::{Announcement, AnnouncementInput, AnnouncementUpdate, Priority, Visibility};
pub use department::{Department, DepartmentInput};
pub use document::{DocType, Document, DocumentMeta};
pub use feedback::{Feedback, FeedbackInput, FeedbackSummary, FeedbackType};
pub use record::{Record, RecordInput, RecordKind, ValidatedRecord};
pub use timetable::{
    find_faculty_clash, validate_slots, Day, FacultyClash, Slot, SlotType, Timetable,
    TimetableInput,
};
pub use user::{NewUser, ProfileUpdate, User, UserUpdate};

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Portal roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Coordinator,
    Faculty,
    Student,
    Sports,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Admin,
        Role::Coordinator,
        Role::Faculty,
        Role::Student,
        Role::Sports,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Coordinator => "coordinator",
            Role::Faculty => "faculty",
            Role::Student => "student",
            Role::Sports => "sports",
        }
    }

    /// Roles that teach: may be assigned timetable slots and receive feedback
    pub fn is_teaching(&self) -> bool {
        matches!(self, Role::Faculty | Role::Coordinator)
    }

    /// Roles allowed to sign up through the public registration endpoint
    pub fn is_self_registrable(&self) -> bool {
        matches!(self, Role::Faculty | Role::Student | Role::Sports)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| Error::invalid(format!("Unknown role: {}", s)))
    }
}

/// Review status shared by records and documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Status {
    Pending,
    Approved,
    Rejected,
}

impl Status {
    pub const ALL: [Status; 3] = [Status::Pending, Status::Approved, Status::Rejected];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::Approved => "approved",
            Status::Rejected => "rejected",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reviewer decision on a pending submission
#[derive(Debug, Clone, Deserialize)]
pub struct ReviewDecision {
    pub status: Status,
    pub remarks: Option<String>,
}

impl ReviewDecision {
    /// Only approve/reject are decisions; rejection must say why
    pub fn validate(&self) -> Result<Option<String>> {
        let remarks = optional_text("remarks", self.remarks.as_deref(), 1000)?;
        match self.status {
            Status::Pending => Err(Error::invalid("Review status must be approved or rejected")),
            Status::Rejected if remarks.is_none() => {
                Err(Error::invalid("Remarks are required when rejecting"))
            }
            _ => Ok(remarks),
        }
    }
}

/// Trim a required text field and enforce a maximum length
pub fn required_text(field: &str, value: &str, max_len: usize) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::invalid(format!("{} is required", field)));
    }
    if trimmed.chars().count() > max_len {
        return Err(Error::invalid(format!(
            "{} must be at most {} characters",
            field, max_len
        )));
    }
    Ok(trimmed.to_string())
}

/// Trim an optional text field; blank becomes `None`
pub fn optional_text(field: &str, value: Option<&str>, max_len: usize) -> Result<Option<String>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => required_text(field, v, max_len).map(Some),
    }
}

/// Minimal structural e-mail check, returns the lowercased address
pub fn normalize_email(email: &str) -> Result<String> {
    let email = email.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
                && !domain.contains('@')
        }
        None => false,
    };
    if valid {
        Ok(email)
    } else {
        Err(Error::invalid(format!("Invalid email address: {}", email)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip_names() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("superuser".parse::<Role>().is_err());
    }

    #[test]
    fn test_self_registration_roles() {
        assert!(Role::Student.is_self_registrable());
        assert!(Role::Sports.is_self_registrable());
        assert!(!Role::Admin.is_self_registrable());
        assert!(!Role::Coordinator.is_self_registrable());
    }

    #[test]
    fn test_review_rejection_requires_remarks() {
        let decision = ReviewDecision { status: Status::Rejected, remarks: Some("  ".into()) };
        assert!(decision.validate().is_err());

        let decision = ReviewDecision {
            status: Status::Rejected,
            remarks: Some("Missing certificate".into()),
        };
        assert_eq!(decision.validate().unwrap().as_deref(), Some("Missing certificate"));
    }

    #[test]
    fn test_review_pending_is_not_a_decision() {
        let decision = ReviewDecision { status: Status::Pending, remarks: None };
        assert!(decision.validate().is_err());
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Jane.Doe@College.EDU ").unwrap(), "jane.doe@college.edu");
        assert!(normalize_email("no-at-sign").is_err());
        assert!(normalize_email("@college.edu").is_err());
        assert!(normalize_email("a@localhost").is_err());
        assert!(normalize_email("a b@college.edu").is_err());
    }

    #[test]
    fn test_text_helpers() {
        assert_eq!(required_text("title", "  Paper ", 10).unwrap(), "Paper");
        assert!(required_text("title", "   ", 10).is_err());
        assert!(required_text("title", "abcdefghijk", 10).is_err());
        assert_eq!(optional_text("note", Some("  "), 10).unwrap(), None);
        assert_eq!(optional_text("note", None, 10).unwrap(), None);
    }
}
