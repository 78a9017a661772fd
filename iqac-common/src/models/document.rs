//! Generic uploaded documents

use super::Status;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum DocType {
    Syllabus,
    LessonPlan,
    QuestionPaper,
    Result,
    Certificate,
    Report,
    Minutes,
    Policy,
    Other,
}

impl DocType {
    pub const ALL: [DocType; 9] = [
        DocType::Syllabus,
        DocType::LessonPlan,
        DocType::QuestionPaper,
        DocType::Result,
        DocType::Certificate,
        DocType::Report,
        DocType::Minutes,
        DocType::Policy,
        DocType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocType::Syllabus => "syllabus",
            DocType::LessonPlan => "lesson_plan",
            DocType::QuestionPaper => "question_paper",
            DocType::Result => "result",
            DocType::Certificate => "certificate",
            DocType::Report => "report",
            DocType::Minutes => "minutes",
            DocType::Policy => "policy",
            DocType::Other => "other",
        }
    }
}

impl FromStr for DocType {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Error> {
        DocType::ALL
            .into_iter()
            .find(|t| t.as_str() == s.trim())
            .ok_or_else(|| Error::invalid(format!("Unknown document type: {}", s)))
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Document {
    pub id: Uuid,
    pub title: String,
    pub doc_type: DocType,
    pub description: Option<String>,
    pub file_path: String,
    pub original_name: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub sha256: String,
    pub uploaded_by: Uuid,
    pub department_id: Option<Uuid>,
    pub status: Status,
    pub approved_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub remarks: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sqlx(default)]
    pub uploader_name: Option<String>,
    #[sqlx(default)]
    pub department_name: Option<String>,
}

/// Validated metadata accompanying an upload
#[derive(Debug, Clone)]
pub struct DocumentMeta {
    pub title: String,
    pub doc_type: DocType,
    pub description: Option<String>,
}

impl DocumentMeta {
    pub fn new(title: Option<&str>, doc_type: Option<&str>, description: Option<&str>) -> Result<Self> {
        let title = super::required_text("title", title.unwrap_or_default(), 300)?;
        let doc_type = doc_type
            .ok_or_else(|| Error::invalid("doc_type is required"))?
            .parse()?;
        let description = super::optional_text("description", description, 2000)?;
        Ok(Self { title, doc_type, description })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doc_type_parse() {
        assert_eq!("lesson_plan".parse::<DocType>().unwrap(), DocType::LessonPlan);
        assert!("memo".parse::<DocType>().is_err());
    }

    #[test]
    fn test_meta_requires_title_and_type() {
        assert!(DocumentMeta::new(None, Some("report"), None).is_err());
        assert!(DocumentMeta::new(Some("Annual report"), None, None).is_err());
        let meta = DocumentMeta::new(Some(" Annual report "), Some("report"), Some("")).unwrap();
        assert_eq!(meta.title, "Annual report");
        assert_eq!(meta.doc_type, DocType::Report);
        assert_eq!(meta.description, None);
    }
}
