use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Main service error type
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("No file part in request")]
    MissingFile,

    #[error("No file selected")]
    EmptyFilename,

    #[error("Only ZIP files are allowed")]
    UnsupportedExtension,

    #[error("Invalid ZIP file")]
    InvalidArchive {
        #[source]
        source: zip::result::ZipError,
    },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Document processing failed")]
    Processing(#[from] ProcessingError),
}

/// Pipeline errors
#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("Failed to read document {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write output archive")]
    Pack(#[source] zip::result::ZipError),

    #[error("IO error")]
    Io(#[from] std::io::Error),
}

/// JSON error body returned to clients
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::MissingFile
            | ServiceError::EmptyFilename
            | ServiceError::UnsupportedExtension
            | ServiceError::InvalidArchive { .. }
            | ServiceError::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
            ServiceError::Processing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let response = ErrorResponse {
            error: self.to_string(),
        };

        (status, Json(response)).into_response()
    }
}

/// Result type alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_archive_message_is_verbatim() {
        let err = ServiceError::InvalidArchive {
            source: zip::result::ZipError::InvalidArchive("bad header".into()),
        };
        assert_eq!(err.to_string(), "Invalid ZIP file");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_processing_errors_are_internal() {
        let err = ServiceError::Processing(ProcessingError::Read {
            path: "a.md".to_string(),
            source: std::io::Error::other("boom"),
        });
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
