//! Buffered multipart forms: text fields plus at most one file

use crate::error::{AppError, Result};
use crate::services::MediaUpload;
use actix_multipart::Multipart;
use futures_util::stream::StreamExt;
use std::collections::HashMap;

const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;
const MAX_TEXT_FIELD_BYTES: usize = 64 * 1024;

#[derive(Debug, Default)]
pub struct UploadForm {
    fields: HashMap<String, String>,
    pub file: Option<MediaUpload>,
}

impl UploadForm {
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Text field parsed as a UUID; absent or malformed is a validation error
    pub fn uuid(&self, name: &str, missing: &str) -> Result<uuid::Uuid> {
        self.text(name)
            .and_then(|raw| raw.trim().parse().ok())
            .ok_or_else(|| AppError::validation(missing))
    }
}

/// Drain `payload`. The part named `file_field` becomes the upload when it
/// carries a filename and at least one byte.
pub async fn read_form(mut payload: Multipart, file_field: &str) -> Result<UploadForm> {
    let mut form = UploadForm::default();

    while let Some(item) = payload.next().await {
        let mut field = item.map_err(|e| AppError::validation(format!("Malformed form: {}", e)))?;
        let name = field.name().unwrap_or_default().to_string();
        let filename = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::to_string);
        let content_type = field.content_type().cloned();
        let is_file = name == file_field && filename.is_some();
        let limit = if is_file {
            MAX_UPLOAD_BYTES
        } else {
            MAX_TEXT_FIELD_BYTES
        };

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|e| {
                tracing::error!("Error reading upload field: {}", e);
                AppError::validation("Failed to read form data")
            })?;
            if bytes.len() + chunk.len() > limit {
                return Err(AppError::validation(format!(
                    "Field '{}' exceeds {} bytes",
                    name, limit
                )));
            }
            bytes.extend_from_slice(&chunk);
        }

        if is_file {
            if !bytes.is_empty() {
                form.file = Some(MediaUpload {
                    filename,
                    content_type,
                    bytes,
                });
            }
        } else {
            let value = String::from_utf8(bytes)
                .map_err(|_| AppError::validation(format!("Field '{}' is not UTF-8", name)))?;
            form.fields.insert(name, value);
        }
    }

    Ok(form)
}
