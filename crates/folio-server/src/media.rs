//! Uploaded files: multipart parsing, validation and storage under the
//! media root in dated folders (`posts/content/2024/05/...`).

use axum::body::Bytes;
use axum::extract::Multipart;
use chrono::{Datelike, Utc};
use folio_common::slug;
use folio_common::validation::{allowed_extension, FieldErrors};
use std::collections::HashMap;
use std::path::Path;

pub const POST_CONTENT_DIR: &str = "posts/content";
pub const POST_FEATURED_DIR: &str = "posts/featured";
pub const MODEL_FILE_DIR: &str = "ai_models";
pub const MODEL_CONFIG_DIR: &str = "ai_models/config";

#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Bytes,
}

/// A multipart body split into file parts and plain text parts.
#[derive(Debug, Default)]
pub struct MultipartForm {
    pub files: HashMap<String, Upload>,
    pub fields: HashMap<String, String>,
}

impl MultipartForm {
    pub async fn read(mut multipart: Multipart) -> Result<Self, String> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await.map_err(|e| e.to_string())? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let bytes = field.bytes().await.map_err(|e| e.to_string())?;
                    if !file_name.is_empty() && !bytes.is_empty() {
                        form.files.insert(name, Upload { file_name, bytes });
                    }
                }
                None => {
                    let text = field.text().await.map_err(|e| e.to_string())?;
                    form.fields.insert(name, text);
                }
            }
        }
        Ok(form)
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// Check an upload's extension and size; returns the normalized extension.
pub fn check_upload(
    errors: &mut FieldErrors,
    field: &str,
    upload: &Upload,
    allowed: &[&str],
    max_bytes: usize,
) -> Option<String> {
    let ext = allowed_extension(&upload.file_name, allowed);
    if ext.is_none() {
        errors.add(
            field,
            format!("File extension is not allowed. Allowed extensions are: {}.", allowed.join(", ")),
        );
    }
    if upload.bytes.len() > max_bytes {
        errors.add(
            field,
            format!("File is too large; the limit is {} MB.", max_bytes / (1024 * 1024)),
        );
        return None;
    }
    ext
}

/// Relative path for a new upload: `<dir>/YYYY/MM/<stem>-<id>.<ext>`.
fn dated_path(dir: &str, file_name: &str, ext: &str) -> String {
    let now = Utc::now();
    let stem = file_name
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(file_name);
    let stem = slug::bounded(stem, 50, "file");
    format!(
        "{dir}/{:04}/{:02}/{stem}-{}.{ext}",
        now.year(),
        now.month(),
        folio_common::id::next_id()
    )
}

/// Write an upload below `root`, returning its path relative to the root.
pub async fn save_upload(root: &Path, dir: &str, upload: &Upload, ext: &str) -> std::io::Result<String> {
    let relative = dated_path(dir, &upload.file_name, ext);
    let target = root.join(&relative);
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&target, &upload.bytes).await?;
    tracing::info!(path = %relative, bytes = upload.bytes.len(), "Upload stored");
    Ok(relative)
}
