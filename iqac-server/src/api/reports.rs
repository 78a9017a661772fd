//! Excel and PDF report downloads

use axum::{
    extract::{Path, Query, State},
    response::Response,
    routing::get,
    Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use iqac_common::models::{DocType, FeedbackType, Record, RecordKind};
use iqac_common::{Role, Status};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::feedback::redact_for;
use crate::api::records::{parse_kind, record_scope};
use crate::auth::{require_role, require_staff_department, CurrentUser};
use crate::db::documents::DocumentFilter;
use crate::db::feedback::{FeedbackFilter, FeedbackScope};
use crate::db::records::RecordFilter;
use crate::error::ApiResult;
use crate::reports::{download, ReportFormat, ReportTable};
use crate::scope::Scope;
use crate::{db, AppState};

#[derive(Debug, Default, Deserialize)]
pub struct RecordReportQuery {
    #[serde(default)]
    pub format: ReportFormat,
    pub status: Option<Status>,
    pub academic_year: Option<String>,
    /// Honoured for administrators only
    pub department_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DocumentReportQuery {
    #[serde(default)]
    pub format: ReportFormat,
    pub status: Option<Status>,
    pub doc_type: Option<DocType>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FeedbackReportQuery {
    #[serde(default)]
    pub format: ReportFormat,
    pub feedback_type: Option<FeedbackType>,
    pub academic_year: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/reports/records/:kind", get(records_report))
        .route("/api/reports/documents", get(documents_report))
        .route("/api/reports/feedback", get(feedback_report))
}

fn date_text(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%d-%m-%Y").to_string()).unwrap_or_default()
}

fn timestamp_text(at: DateTime<Utc>) -> String {
    at.format("%d-%m-%Y").to_string()
}

/// Build the table for records of one kind
pub(crate) fn records_table(kind: RecordKind, records: &[Record]) -> ReportTable {
    let details = kind.detail_columns();
    let mut headers = vec!["#", "Title", "Owner", "Department", "Academic Year", "From", "To"];
    headers.extend(details.iter().map(|(_, heading)| *heading));
    headers.extend(["Status", "Remarks"]);

    let mut table = ReportTable::new(format!("{} Report", kind.label()), &headers);
    for (index, record) in records.iter().enumerate() {
        let mut row = vec![
            (index + 1).to_string(),
            record.title.clone(),
            record.owner_name.clone().unwrap_or_default(),
            record.department_name.clone().unwrap_or_default(),
            record.academic_year.clone(),
            date_text(record.start_date),
            date_text(record.end_date),
        ];
        row.extend(details.iter().map(|(key, _)| record.detail_text(key)));
        row.push(record.status.to_string());
        row.push(record.remarks.clone().unwrap_or_default());
        table.push_row(row);
    }
    table
}

/// GET /api/reports/records/:kind
pub async fn records_report(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(kind): Path<String>,
    Query(query): Query<RecordReportQuery>,
) -> ApiResult<Response> {
    require_role(&user, &[Role::Admin, Role::Coordinator, Role::Faculty])?;
    let kind = parse_kind(&kind)?;

    let mut filter = RecordFilter {
        status: query.status,
        academic_year: query.academic_year,
        department_id: query.department_id.filter(|_| user.is_admin()),
        ..Default::default()
    };
    let scope = record_scope(&user, kind, &mut filter);
    let records = db::records::list(&state.db, kind, scope, &filter).await?;

    let table = records_table(kind, &records);
    download(&format!("{}-report", kind.path_segment()), &table, query.format)
}

/// GET /api/reports/documents
pub async fn documents_report(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<DocumentReportQuery>,
) -> ApiResult<Response> {
    let scope = match require_staff_department(&user)? {
        Some(department_id) => Scope::Department(department_id),
        None => Scope::All,
    };
    let filter = DocumentFilter {
        status: query.status,
        doc_type: query.doc_type,
        q: None,
    };
    let documents = db::documents::list(&state.db, scope, &filter).await?;

    let mut table = ReportTable::new(
        "Documents Report",
        &["#", "Title", "Type", "Uploaded By", "Department", "File", "Size (KB)", "Status", "Uploaded"],
    );
    for (index, doc) in documents.iter().enumerate() {
        table.push_row(vec![
            (index + 1).to_string(),
            doc.title.clone(),
            doc.doc_type.as_str().replace('_', " "),
            doc.uploader_name.clone().unwrap_or_default(),
            doc.department_name.clone().unwrap_or_default(),
            doc.original_name.clone(),
            format!("{:.1}", doc.size_bytes as f64 / 1024.0),
            doc.status.to_string(),
            timestamp_text(doc.created_at),
        ]);
    }

    download("documents-report", &table, query.format)
}

/// GET /api/reports/feedback
pub async fn feedback_report(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<FeedbackReportQuery>,
) -> ApiResult<Response> {
    require_staff_department(&user)?;
    let scope = FeedbackScope::for_user(&user);
    let filter = FeedbackFilter {
        feedback_type: query.feedback_type,
        academic_year: query.academic_year,
    };
    let mut entries = db::feedback::list(&state.db, scope, &filter).await?;

    let mut table = ReportTable::new(
        "Feedback Report",
        &["#", "Type", "Target", "Academic Year", "Semester", "Rating", "Comments", "Student", "Submitted"],
    );
    for (index, entry) in entries.iter_mut().enumerate() {
        redact_for(scope, entry);
        table.push_row(vec![
            (index + 1).to_string(),
            entry.feedback_type.as_str().to_string(),
            entry.target_name.clone().unwrap_or_else(|| "Institution".to_string()),
            entry.academic_year.clone(),
            entry.semester.map(|s| s.to_string()).unwrap_or_default(),
            entry.rating.to_string(),
            entry.comments.clone().unwrap_or_default(),
            entry
                .student_name
                .clone()
                .unwrap_or_else(|| "Anonymous".to_string()),
            timestamp_text(entry.created_at),
        ]);
    }

    download("feedback-report", &table, query.format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sqlx::types::Json;

    #[test]
    fn test_records_table_detail_columns() {
        let now = Utc::now();
        let record = Record {
            id: Uuid::new_v4(),
            kind: RecordKind::ResearchPublication,
            title: "Crop yield prediction".into(),
            description: None,
            owner_id: Uuid::new_v4(),
            department_id: None,
            academic_year: "2024-25".into(),
            start_date: NaiveDate::from_ymd_opt(2024, 8, 1),
            end_date: None,
            details: Json(json!({
                "publication_type": "book_chapter",
                "venue": "Springer",
                "authors": ["A. Rao", "B. Singh"],
            })),
            files: Json(Vec::new()),
            status: Status::Approved,
            reviewed_by: None,
            reviewed_at: None,
            remarks: None,
            created_at: now,
            updated_at: now,
            owner_name: Some("A. Rao".into()),
            department_name: None,
            reviewer_name: None,
        };

        let table = records_table(RecordKind::ResearchPublication, &[record]);
        assert_eq!(table.headers.len(), table.rows[0].len());
        assert_eq!(table.headers[7], "Type");
        assert_eq!(table.rows[0][5], "01-08-2024");
        assert_eq!(table.rows[0][7], "book chapter");
        assert_eq!(table.rows[0][9], "A. Rao, B. Singh");
        assert_eq!(table.rows[0][12], "approved");
    }
}
