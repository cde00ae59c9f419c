use std::collections::HashMap;

use axum::extract::Multipart;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::api::errors::ApiError;
use crate::core::metrics;
use crate::core::state::AppState;
use crate::services::storage::StoredObject;
use crate::services::uploads::{self, UploadError};

#[derive(Debug)]
pub(crate) struct UploadedFile {
    pub(crate) filename: String,
    pub(crate) content_type: String,
    pub(crate) bytes: Vec<u8>,
}

/// The `file` part of a multipart body plus every other text field.
#[derive(Debug, Default)]
pub(crate) struct MultipartForm {
    pub(crate) file: Option<UploadedFile>,
    pub(crate) fields: HashMap<String, String>,
}

impl MultipartForm {
    /// Returns a trimmed, non-empty text field.
    pub(crate) fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(|value| value.trim()).filter(|value| !value.is_empty())
    }
}

pub(crate) async fn read_multipart(
    state: &AppState,
    mut multipart: Multipart,
) -> Result<MultipartForm, ApiError> {
    let storage = state.settings().storage();
    let max_bytes = storage.max_upload_bytes();
    let mut form = MultipartForm::default();

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::BadRequest("Invalid multipart data".to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();
        if name == "file" {
            let filename = field.file_name().unwrap_or("").to_string();
            let content_type =
                field.content_type().unwrap_or("application/octet-stream").to_string();
            let mut bytes = Vec::new();
            while let Some(chunk) = field
                .chunk()
                .await
                .map_err(|_| ApiError::BadRequest("Failed to read file".to_string()))?
            {
                if bytes.len() as u64 + chunk.len() as u64 > max_bytes {
                    let limit_mb = storage.max_upload_size_mb;
                    return Err(UploadError::TooLarge { limit_mb }.into());
                }
                bytes.extend_from_slice(&chunk);
            }
            form.file = Some(UploadedFile { filename, content_type, bytes });
        } else if !name.is_empty() {
            let text = field
                .text()
                .await
                .map_err(|_| ApiError::BadRequest(format!("Invalid field '{name}'")))?;
            form.fields.insert(name, text);
        }
    }

    Ok(form)
}

/// Validates the upload against the configured limits and writes it under
/// `prefix/owner_id/`.
pub(crate) async fn store_upload(
    state: &AppState,
    kind: &'static str,
    owner_id: i64,
    file: UploadedFile,
) -> Result<(StoredObject, String), ApiError> {
    let settings = state.settings().storage();
    if file.filename.trim().is_empty() {
        return Err(ApiError::BadRequest("File must have a name".to_string()));
    }
    uploads::validate_extension(&file.filename, &settings.allowed_extensions)?;
    uploads::validate_size(
        file.bytes.len() as u64,
        settings.max_upload_bytes(),
        settings.max_upload_size_mb,
    )?;

    let original_filename = uploads::sanitized_filename(&file.filename);
    let key = uploads::object_key(kind, owner_id, &original_filename);
    let stored = state
        .storage()
        .put(&key, &file.content_type, file.bytes)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to store uploaded file"))?;

    metrics::record_upload(kind, stored.size);
    tracing::debug!(kind, key = %stored.key, size = stored.size, "Stored upload");

    Ok((stored, original_filename))
}

/// Serves stored bytes as an attachment named after the original upload.
pub(crate) fn file_response(bytes: Vec<u8>, original_filename: &str) -> Response {
    let mime = uploads::guess_mime(original_filename);
    let safe_name = uploads::sanitized_filename(original_filename);

    let mut response = (StatusCode::OK, bytes).into_response();
    response.headers_mut().insert(header::CONTENT_TYPE, HeaderValue::from_static(mime));
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("private, no-store"));
    if let Ok(disposition) =
        HeaderValue::from_str(&format!("attachment; filename=\"{safe_name}\""))
    {
        response.headers_mut().insert(header::CONTENT_DISPOSITION, disposition);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_response_sets_download_headers() {
        let response = file_response(b"%PDF".to_vec(), "hw 1.pdf");
        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers.get(header::CONTENT_TYPE).unwrap(), "application/pdf");
        assert_eq!(
            headers.get(header::CONTENT_DISPOSITION).unwrap(),
            "attachment; filename=\"hw1.pdf\""
        );
    }

    #[test]
    fn text_ignores_blank_fields() {
        let mut form = MultipartForm::default();
        form.fields.insert("title".into(), "  Lab 1 ".into());
        form.fields.insert("description".into(), "   ".into());
        assert_eq!(form.text("title"), Some("Lab 1"));
        assert_eq!(form.text("description"), None);
        assert_eq!(form.text("missing"), None);
    }
}
