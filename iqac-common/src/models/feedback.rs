//! Student feedback

use super::optional_text;
use crate::time::is_valid_academic_year;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum comment length in characters
pub const MAX_COMMENT_LEN: usize = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum FeedbackType {
    Course,
    Faculty,
    Institution,
}

impl FeedbackType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackType::Course => "course",
            FeedbackType::Faculty => "faculty",
            FeedbackType::Institution => "institution",
        }
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Feedback {
    pub id: Uuid,
    /// Cleared before the feedback is shown to anyone who may not see it
    pub student_id: Option<Uuid>,
    pub feedback_type: FeedbackType,
    pub target_user_id: Option<Uuid>,
    pub target_record_id: Option<Uuid>,
    pub department_id: Option<Uuid>,
    pub academic_year: String,
    pub semester: Option<i64>,
    pub rating: i64,
    pub comments: Option<String>,
    pub is_anonymous: bool,
    pub created_at: DateTime<Utc>,
    #[sqlx(default)]
    pub student_name: Option<String>,
    #[sqlx(default)]
    pub target_name: Option<String>,
}

impl Feedback {
    /// Remove the submitting student's identity
    pub fn redact(&mut self) {
        self.student_id = None;
        self.student_name = None;
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedbackInput {
    pub feedback_type: FeedbackType,
    pub target_user_id: Option<Uuid>,
    pub target_record_id: Option<Uuid>,
    /// Blank means the configured current academic year
    #[serde(default)]
    pub academic_year: String,
    pub semester: Option<i64>,
    pub rating: i64,
    pub comments: Option<String>,
    #[serde(default)]
    pub is_anonymous: bool,
}

impl FeedbackInput {
    /// Check rating range, comment length and that the target matches
    /// the feedback type
    pub fn validate(mut self) -> Result<Self> {
        if !(1..=5).contains(&self.rating) {
            return Err(Error::invalid("Rating must be between 1 and 5"));
        }
        self.comments = optional_text("comments", self.comments.as_deref(), MAX_COMMENT_LEN)?;
        self.academic_year = self.academic_year.trim().to_string();
        if !is_valid_academic_year(&self.academic_year) {
            return Err(Error::invalid(format!(
                "Invalid academic year '{}'",
                self.academic_year
            )));
        }
        if let Some(semester) = self.semester {
            if !(1..=10).contains(&semester) {
                return Err(Error::invalid("semester must be between 1 and 10"));
            }
        }

        match self.feedback_type {
            FeedbackType::Course => {
                if self.target_record_id.is_none() {
                    return Err(Error::invalid("Course feedback requires target_record_id"));
                }
                self.target_user_id = None;
            }
            FeedbackType::Faculty => {
                if self.target_user_id.is_none() {
                    return Err(Error::invalid("Faculty feedback requires target_user_id"));
                }
                self.target_record_id = None;
            }
            FeedbackType::Institution => {
                if self.target_user_id.is_some() || self.target_record_id.is_some() {
                    return Err(Error::invalid("Institution feedback takes no target"));
                }
            }
        }
        Ok(self)
    }
}

/// Aggregate for one feedback type
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct FeedbackSummary {
    pub feedback_type: FeedbackType,
    pub count: i64,
    pub average_rating: Option<f64>,
}
