//! Faculty and department activity records
//!
//! Five kinds of record share one table and one review workflow. The
//! kind-specific fields live in the `details` JSON column and are checked
//! against a typed structure per kind before they are stored, so the
//! database only ever holds normalized details.

use super::{optional_text, required_text, Role, Status};
use crate::time::is_valid_academic_year;
use crate::{Error, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::types::Json;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum RecordKind {
    ResearchPublication,
    ProfessionalDevelopment,
    CourseTaught,
    EventOrganized,
    InstitutionalEvent,
}

impl RecordKind {
    pub const ALL: [RecordKind; 5] = [
        RecordKind::ResearchPublication,
        RecordKind::ProfessionalDevelopment,
        RecordKind::CourseTaught,
        RecordKind::EventOrganized,
        RecordKind::InstitutionalEvent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::ResearchPublication => "research_publication",
            RecordKind::ProfessionalDevelopment => "professional_development",
            RecordKind::CourseTaught => "course_taught",
            RecordKind::EventOrganized => "event_organized",
            RecordKind::InstitutionalEvent => "institutional_event",
        }
    }

    /// URL segment used by the HTTP API
    pub fn path_segment(&self) -> &'static str {
        match self {
            RecordKind::ResearchPublication => "research-publications",
            RecordKind::ProfessionalDevelopment => "professional-development",
            RecordKind::CourseTaught => "courses-taught",
            RecordKind::EventOrganized => "events-organized",
            RecordKind::InstitutionalEvent => "institutional-events",
        }
    }

    pub fn from_path_segment(segment: &str) -> Option<Self> {
        RecordKind::ALL
            .into_iter()
            .find(|k| k.path_segment() == segment)
    }

    /// Human-readable plural used in report titles
    pub fn label(&self) -> &'static str {
        match self {
            RecordKind::ResearchPublication => "Research Publications",
            RecordKind::ProfessionalDevelopment => "Professional Development",
            RecordKind::CourseTaught => "Courses Taught",
            RecordKind::EventOrganized => "Events Organized",
            RecordKind::InstitutionalEvent => "Institutional Events",
        }
    }

    pub fn creatable_by(&self, role: Role) -> bool {
        match role {
            Role::Admin | Role::Coordinator => true,
            Role::Faculty => *self != RecordKind::InstitutionalEvent,
            Role::Sports => matches!(
                self,
                RecordKind::EventOrganized | RecordKind::InstitutionalEvent
            ),
            Role::Student => false,
        }
    }

    /// Detail keys shown as report columns, with their headings
    pub fn detail_columns(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            RecordKind::ResearchPublication => &[
                ("publication_type", "Type"),
                ("venue", "Journal / Venue"),
                ("authors", "Authors"),
                ("indexing", "Indexing"),
                ("doi", "DOI"),
            ],
            RecordKind::ProfessionalDevelopment => &[
                ("program_type", "Program"),
                ("organizer", "Organizer"),
                ("mode", "Mode"),
                ("duration_days", "Days"),
            ],
            RecordKind::CourseTaught => &[
                ("course_code", "Course Code"),
                ("course_name", "Course Name"),
                ("semester", "Semester"),
                ("credits", "Credits"),
                ("students_count", "Students"),
            ],
            RecordKind::EventOrganized => &[
                ("event_type", "Event Type"),
                ("role_in_event", "Role"),
                ("participants_count", "Participants"),
                ("funding_agency", "Funding Agency"),
            ],
            RecordKind::InstitutionalEvent => &[
                ("category", "Category"),
                ("venue", "Venue"),
                ("participants_count", "Participants"),
                ("chief_guest", "Chief Guest"),
            ],
        }
    }

    /// Parse, check and normalize the details object for this kind
    pub fn validate_details(&self, value: Value) -> Result<Value> {
        match self {
            RecordKind::ResearchPublication => normalize::<PublicationDetails>(value),
            RecordKind::ProfessionalDevelopment => normalize::<DevelopmentDetails>(value),
            RecordKind::CourseTaught => normalize::<CourseDetails>(value),
            RecordKind::EventOrganized => normalize::<EventOrganizedDetails>(value),
            RecordKind::InstitutionalEvent => normalize::<InstitutionalEventDetails>(value),
        }
    }
}

trait Details: DeserializeOwned + Serialize {
    fn check(&mut self) -> Result<()>;
}

fn normalize<D: Details>(value: Value) -> Result<Value> {
    let mut details: D = serde_json::from_value(value)
        .map_err(|e| Error::invalid(format!("Invalid details: {}", e)))?;
    details.check()?;
    serde_json::to_value(details).map_err(|e| Error::Internal(e.to_string()))
}

fn non_negative(field: &str, value: Option<f64>) -> Result<()> {
    match value {
        Some(v) if !v.is_finite() || v < 0.0 => {
            Err(Error::invalid(format!("{} must not be negative", field)))
        }
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum PublicationType {
    Journal,
    Conference,
    Book,
    BookChapter,
    Patent,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Indexing {
    Scopus,
    Wos,
    UgcCare,
    Other,
    None,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct PublicationDetails {
    publication_type: PublicationType,
    venue: String,
    authors: Vec<String>,
    doi: Option<String>,
    issn_isbn: Option<String>,
    indexing: Option<Indexing>,
    impact_factor: Option<f64>,
}

impl Details for PublicationDetails {
    fn check(&mut self) -> Result<()> {
        self.venue = required_text("venue", &self.venue, 250)?;
        self.authors = self
            .authors
            .iter()
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .collect();
        if self.authors.is_empty() {
            return Err(Error::invalid("At least one author is required"));
        }
        self.doi = optional_text("doi", self.doi.as_deref(), 120)?;
        self.issn_isbn = optional_text("issn_isbn", self.issn_isbn.as_deref(), 40)?;
        non_negative("impact_factor", self.impact_factor)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum ProgramType {
    Fdp,
    Sttp,
    Workshop,
    Seminar,
    Conference,
    Webinar,
    Mooc,
    Other,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Mode {
    Online,
    Offline,
    Hybrid,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct DevelopmentDetails {
    program_type: ProgramType,
    organizer: String,
    mode: Mode,
    duration_days: Option<u32>,
}

impl Details for DevelopmentDetails {
    fn check(&mut self) -> Result<()> {
        self.organizer = required_text("organizer", &self.organizer, 200)?;
        if self.duration_days == Some(0) {
            return Err(Error::invalid("duration_days must be at least 1"));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct CourseDetails {
    course_code: String,
    course_name: String,
    semester: u8,
    credits: Option<f64>,
    section: Option<String>,
    students_count: Option<u32>,
}

impl Details for CourseDetails {
    fn check(&mut self) -> Result<()> {
        self.course_code = required_text("course_code", &self.course_code, 20)?.to_uppercase();
        self.course_name = required_text("course_name", &self.course_name, 200)?;
        if !(1..=10).contains(&self.semester) {
            return Err(Error::invalid("semester must be between 1 and 10"));
        }
        self.section = optional_text("section", self.section.as_deref(), 10)?;
        non_negative("credits", self.credits)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum EventType {
    Workshop,
    Seminar,
    GuestLecture,
    Conference,
    Competition,
    Cultural,
    Sports,
    Other,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum EventRole {
    Convener,
    Coordinator,
    Organizer,
    ResourcePerson,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct EventOrganizedDetails {
    event_type: EventType,
    role_in_event: EventRole,
    participants_count: Option<u32>,
    funding_agency: Option<String>,
    budget: Option<f64>,
}

impl Details for EventOrganizedDetails {
    fn check(&mut self) -> Result<()> {
        self.funding_agency =
            optional_text("funding_agency", self.funding_agency.as_deref(), 200)?;
        non_negative("budget", self.budget)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum EventCategory {
    Academic,
    Cultural,
    Sports,
    Technical,
    Social,
    Other,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct InstitutionalEventDetails {
    category: EventCategory,
    venue: String,
    participants_count: Option<u32>,
    chief_guest: Option<String>,
    organized_by: Option<String>,
}

impl Details for InstitutionalEventDetails {
    fn check(&mut self) -> Result<()> {
        self.venue = required_text("venue", &self.venue, 200)?;
        self.chief_guest = optional_text("chief_guest", self.chief_guest.as_deref(), 200)?;
        self.organized_by = optional_text("organized_by", self.organized_by.as_deref(), 200)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Record {
    pub id: Uuid,
    pub kind: RecordKind,
    pub title: String,
    pub description: Option<String>,
    pub owner_id: Uuid,
    pub department_id: Option<Uuid>,
    pub academic_year: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub details: Json<Value>,
    pub files: Json<Vec<String>>,
    pub status: Status,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub remarks: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sqlx(default)]
    pub owner_name: Option<String>,
    #[sqlx(default)]
    pub department_name: Option<String>,
    #[sqlx(default)]
    pub reviewer_name: Option<String>,
}

impl Record {
    /// Render a details value as a single report cell
    pub fn detail_text(&self, key: &str) -> String {
        match self.details.0.get(key) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.replace('_', " "),
            Some(Value::Array(items)) => items
                .iter()
                .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
                .collect::<Vec<_>>()
                .join(", "),
            Some(other) => other.to_string(),
        }
    }

    /// Category of an institutional event, if present
    pub fn category(&self) -> Option<&str> {
        self.details.0.get("category").and_then(Value::as_str)
    }
}

/// Create/update payload
#[derive(Debug, Clone, Deserialize)]
pub struct RecordInput {
    pub title: String,
    pub description: Option<String>,
    pub academic_year: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub details: Value,
    /// Honoured for administrators only
    pub department_id: Option<Uuid>,
}

/// A payload that passed validation for a given kind
#[derive(Debug, Clone)]
pub struct ValidatedRecord {
    pub title: String,
    pub description: Option<String>,
    pub academic_year: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub details: Value,
    pub department_id: Option<Uuid>,
}

impl ValidatedRecord {
    pub fn category(&self) -> Option<&str> {
        self.details.get("category").and_then(Value::as_str)
    }
}

impl RecordInput {
    pub fn validate(self, kind: RecordKind) -> Result<ValidatedRecord> {
        let title = required_text("title", &self.title, 300)?;
        let description = optional_text("description", self.description.as_deref(), 4000)?;

        let academic_year = self.academic_year.trim().to_string();
        if !is_valid_academic_year(&academic_year) {
            return Err(Error::invalid(format!(
                "Invalid academic year '{}', expected e.g. 2024-25",
                academic_year
            )));
        }

        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if end < start {
                return Err(Error::invalid("end_date must not be before start_date"));
            }
        }

        let details = kind.validate_details(self.details)?;

        Ok(ValidatedRecord {
            title,
            description,
            academic_year,
            start_date: self.start_date,
            end_date: self.end_date,
            details,
            department_id: self.department_id,
        })
    }
}
