//! ZIP upload endpoint.

use axum::{
    extract::{Multipart, Path, State},
    http::header,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::info;

use crate::error::ServiceError;

use super::AppState;

/// Handle `POST /upload/{session_id}`.
///
/// Validates the multipart request (file field present, filename non-empty,
/// `.zip` extension), then runs the extraction-and-consolidation pipeline
/// and returns the result ZIP as an attachment.
pub async fn upload_handler(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    mut multipart: Multipart,
) -> Result<Response, ServiceError> {
    let mut upload: Option<(Vec<u8>, String)> = None;

    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or("").to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| ServiceError::InvalidRequest {
                message: e.to_string(),
            })?;
        upload = Some((data.to_vec(), filename));
    }

    let (data, filename) = upload.ok_or(ServiceError::MissingFile)?;
    if filename.is_empty() {
        return Err(ServiceError::EmptyFilename);
    }
    if !filename.ends_with(".zip") {
        return Err(ServiceError::UnsupportedExtension);
    }

    info!(
        session_id = %session_id,
        filename = %filename,
        size = data.len(),
        "Received upload"
    );

    let processed = state.service.process_upload(&data, &filename, &session_id)?;

    let disposition = format!("attachment; filename=\"{}\"", processed.download_name);
    Ok((
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        processed.bytes,
    )
        .into_response())
}
