use axum::extract::Multipart;
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use thiserror::Error;

use medreports_ai::ocr::ReportImage;

/// Multipart field carrying the report image.
const FILE_FIELD: &str = "file";

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Please select a file first")]
    MissingFile,

    #[error("Please upload an image file (got {0})")]
    NotAnImage(String),

    #[error("File is too large (limit is {limit} bytes)")]
    TooLarge { limit: usize },

    #[error("Error reading file: {0}")]
    Read(String),
}

fn multipart_error(e: MultipartError, limit: usize) -> UploadError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        UploadError::TooLarge { limit }
    } else {
        UploadError::Read(e.body_text())
    }
}

/// Read the `file` field of an upload form. Only `image/*` parts up to
/// `limit` bytes are accepted; other fields are skipped.
pub async fn read_report_image(
    mut multipart: Multipart,
    limit: usize,
) -> Result<ReportImage, UploadError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or("report").to_string();
        let mime_type = field.content_type().unwrap_or_default().to_string();
        if !mime_type.starts_with("image/") {
            let got = if mime_type.is_empty() {
                "no content type".to_string()
            } else {
                mime_type
            };
            return Err(UploadError::NotAnImage(got));
        }

        let bytes = field.bytes().await.map_err(|e| multipart_error(e, limit))?;
        if bytes.is_empty() {
            return Err(UploadError::MissingFile);
        }
        if bytes.len() > limit {
            return Err(UploadError::TooLarge { limit });
        }

        return Ok(ReportImage {
            bytes: bytes.to_vec(),
            mime_type,
            file_name,
        });
    }

    Err(UploadError::MissingFile)
}
