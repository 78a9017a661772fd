//! HTTP error type
//!
//! Every handler returns `ApiResult<T>`. Errors render as
//! `{"error": "<message>"}`; server-side failures hide their details from
//! the client and log them instead.

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed request (bad multipart, unknown path segment value)
    #[error("{0}")]
    BadRequest(String),

    /// Payload failed a validation rule
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Report error: {0}")]
    Report(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn forbidden(msg: impl Into<String>) -> Self {
        ApiError::Forbidden(msg.into())
    }

    pub fn not_found(what: &str) -> Self {
        ApiError::NotFound(format!("{} not found", what))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Database(_)
            | ApiError::Io(_)
            | ApiError::Report(_)
            | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Database(e) => {
                error!("Database error: {:?}", e);
                "Database error occurred".to_string()
            }
            ApiError::Io(e) => {
                error!("IO error: {}", e);
                "File storage error".to_string()
            }
            ApiError::Report(msg) => {
                error!("Report rendering failed: {}", msg);
                "Report generation failed".to_string()
            }
            ApiError::Internal(msg) => {
                error!("Internal error: {}", msg);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        if iqac_common::db::is_unique_violation(&err) {
            return ApiError::Conflict("A matching entry already exists".to_string());
        }
        if iqac_common::db::is_foreign_key_violation(&err) {
            return ApiError::Conflict("Entry is referenced by other data".to_string());
        }
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Not found".to_string()),
            other => ApiError::Database(other),
        }
    }
}

impl From<iqac_common::Error> for ApiError {
    fn from(err: iqac_common::Error) -> Self {
        use iqac_common::Error;
        match err {
            Error::Database(e) => e.into(),
            Error::Io(e) => ApiError::Io(e),
            Error::NotFound(msg) => ApiError::NotFound(msg),
            Error::InvalidInput(msg) => ApiError::Validation(msg),
            Error::Config(msg) | Error::Internal(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge("Upload exceeds the size limit".to_string())
        } else {
            ApiError::BadRequest(format!("Invalid multipart data: {}", err.body_text()))
        }
    }
}

impl From<jsonwebtoken::errors::Error> for ApiError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                ApiError::Unauthorized("Token has expired".to_string())
            }
            _ => ApiError::Unauthorized("Invalid token".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::Validation("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::forbidden("x").status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::not_found("Record").status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::Conflict("x".into()).status(), StatusCode::CONFLICT);
        assert_eq!(
            ApiError::PayloadTooLarge("x".into()).status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            ApiError::Internal("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_common_errors_convert() {
        let err: ApiError = iqac_common::Error::invalid("bad rating").into();
        assert!(matches!(err, ApiError::Validation(ref m) if m == "bad rating"));

        let err: ApiError = sqlx::Error::RowNotFound.into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_internal_details_hidden() {
        let response = ApiError::Internal("secret stack trace".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
