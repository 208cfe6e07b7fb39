use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use thiserror::Error;

use crate::export::SUPPORTED_FORMATS;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("category name already exists: {0}")]
    DuplicateCategory(String),
    #[error("categories are invalid or unavailable: {0:?}")]
    InvalidCategories(Vec<i32>),
    #[error("malformed row: {0}")]
    MalformedRow(String),
    #[error(transparent)]
    Database(#[from] libsql::Error),
}

impl StoreError {
    pub(crate) fn is_unique_violation(err: &libsql::Error) -> bool {
        err.to_string().contains("UNIQUE constraint failed")
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Invalid export format '{0}'. Supported formats: {formats}", formats = SUPPORTED_FORMATS.join(", "))]
    UnsupportedFormat(String),
    #[error("Invalid category id: {0}")]
    InvalidCategoryId(String),
    #[error("store query failed: {0}")]
    Store(#[from] StoreError),
    #[error("failed to render {format} export: {message}")]
    Render { format: &'static str, message: String },
}

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("{0}")]
    Validation(String),
    #[error("{message}")]
    InvalidReferences { message: String, invalid_ids: Vec<i32> },
    #[error("Not authenticated. Please log in.")]
    Unauthenticated,
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    /// The public message; the cause is logged, never returned.
    #[error("{0}")]
    Internal(String),
}

impl HandlerError {
    pub fn status(&self) -> StatusCode {
        use HandlerError::*;
        match self {
            Validation(_) | InvalidReferences { .. } => StatusCode::BAD_REQUEST,
            Unauthenticated => StatusCode::UNAUTHORIZED,
            NotFound(_) => StatusCode::NOT_FOUND,
            Conflict(_) => StatusCode::CONFLICT,
            Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Maps a store failure, logging anything that is not the caller's fault.
    pub fn from_store(err: StoreError, public_message: &str) -> Self {
        match err {
            StoreError::DuplicateCategory(_) => {
                HandlerError::Conflict("You already have a category with that name.".to_string())
            }
            StoreError::InvalidCategories(ids) => HandlerError::InvalidReferences {
                message: "One or more categories are invalid or unavailable.".to_string(),
                invalid_ids: ids,
            },
            other => {
                tracing::error!(error = %crate::unpack_error(&other), "{}", public_message);
                HandlerError::Internal(public_message.to_string())
            }
        }
    }
}

impl From<ExportError> for HandlerError {
    fn from(err: ExportError) -> Self {
        match err {
            ExportError::UnsupportedFormat(_) | ExportError::InvalidCategoryId(_) => {
                HandlerError::Validation(err.to_string())
            }
            other => {
                tracing::error!(error = %crate::unpack_error(&other), "export failed");
                HandlerError::Internal("Failed to export URLs".to_string())
            }
        }
    }
}

impl From<JsonRejection> for HandlerError {
    fn from(rejection: JsonRejection) -> Self {
        HandlerError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for HandlerError {
    fn from(rejection: PathRejection) -> Self {
        HandlerError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for HandlerError {
    fn from(rejection: QueryRejection) -> Self {
        HandlerError::Validation(rejection.body_text())
    }
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        let body: Value = match &self {
            HandlerError::InvalidReferences { message, invalid_ids } => json!({
                "error": message,
                "details": { "invalidCategoryIds": invalid_ids },
            }),
            other => json!({ "error": other.to_string() }),
        };
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_format_names_every_format() {
        let msg = ExportError::UnsupportedFormat("docx".into()).to_string();
        for format in SUPPORTED_FORMATS {
            assert!(msg.contains(format), "{msg} should mention {format}");
        }
    }

    #[test]
    fn export_errors_split_into_client_and_server_faults() {
        let bad: HandlerError = ExportError::UnsupportedFormat("xml".into()).into();
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);

        let broken: HandlerError = ExportError::Render {
            format: "pdf",
            message: "boom".into(),
        }
        .into();
        assert_eq!(broken.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(broken.to_string(), "Failed to export URLs");
    }

    #[test]
    fn store_conflicts_map_to_409() {
        let err = HandlerError::from_store(StoreError::DuplicateCategory("work".into()), "x");
        assert_eq!(err.status(), StatusCode::CONFLICT);
        let err = HandlerError::from_store(StoreError::InvalidCategories(vec![9]), "x");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
