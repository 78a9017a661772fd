//! Tabular report rendering
//!
//! Report handlers collect their scoped rows into a [`ReportTable`], which
//! is rendered as an Excel workbook or a paginated PDF.

pub mod pdf;
pub mod xlsx;

use axum::{
    http::header,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Xlsx,
    Pdf,
}

impl ReportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Xlsx => "xlsx",
            ReportFormat::Pdf => "pdf",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ReportFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            ReportFormat::Pdf => "application/pdf",
        }
    }
}

/// A titled grid of text cells
#[derive(Debug, Clone, Default)]
pub struct ReportTable {
    pub title: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ReportTable {
    pub fn new(title: impl Into<String>, headers: &[&str]) -> Self {
        Self {
            title: title.into(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }
}

pub fn render(table: &ReportTable, format: ReportFormat) -> ApiResult<Vec<u8>> {
    match format {
        ReportFormat::Xlsx => {
            xlsx::render_xlsx(table).map_err(|e| ApiError::Report(e.to_string()))
        }
        ReportFormat::Pdf => pdf::render_pdf(table).map_err(|e| ApiError::Report(e.to_string())),
    }
}

/// `<name>-<YYYYMMDD>.<ext>`
pub fn report_file_name(name: &str, format: ReportFormat) -> String {
    format!(
        "{}-{}.{}",
        name,
        Utc::now().format("%Y%m%d"),
        format.extension()
    )
}

/// Render a table and wrap it as a file download
pub fn download(name: &str, table: &ReportTable, format: ReportFormat) -> ApiResult<Response> {
    let bytes = render(table, format)?;
    let disposition = format!(
        "attachment; filename=\"{}\"",
        report_file_name(name, format)
    );

    Ok((
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_file_name() {
        let name = report_file_name("research-publications", ReportFormat::Pdf);
        assert!(name.starts_with("research-publications-"));
        assert!(name.ends_with(".pdf"));
        // name + '-' + YYYYMMDD + ".pdf"
        assert_eq!(name.len(), "research-publications".len() + 1 + 8 + 4);
    }

    #[test]
    fn test_format_defaults_to_xlsx() {
        assert_eq!(ReportFormat::default(), ReportFormat::Xlsx);
        let parsed: ReportFormat = serde_json::from_str("\"pdf\"").unwrap();
        assert_eq!(parsed, ReportFormat::Pdf);
    }
}
