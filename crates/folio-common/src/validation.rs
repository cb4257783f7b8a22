use serde::Serialize;
use std::collections::BTreeMap;
use utoipa::ToSchema;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];
pub const MODEL_FILE_EXTENSIONS: &[&str] = &["pkl", "pth", "h5", "onnx", "pt", "json", "yaml", "yml"];
pub const CONFIG_FILE_EXTENSIONS: &[&str] = &["json", "yaml", "yml"];

pub const MODEL_FILE_MAX_BYTES: usize = 100 * 1024 * 1024;
pub const CONFIG_FILE_MAX_BYTES: usize = 10 * 1024 * 1024;

/// Per-field validation messages, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn merge(&mut self, other: FieldErrors) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_default().extend(messages);
        }
    }

    /// `Ok(value)` when no errors were recorded.
    pub fn into_result<T>(self, value: T) -> Result<T, FieldErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    write!(f, "; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Required, trimmed text no longer than `max_chars`.
pub fn check_required(errors: &mut FieldErrors, field: &str, value: &str, max_chars: usize) {
    if value.trim().is_empty() {
        errors.add(field, "This field is required.");
    } else {
        check_len(errors, field, value, max_chars);
    }
}

pub fn check_len(errors: &mut FieldErrors, field: &str, value: &str, max_chars: usize) {
    let len = value.chars().count();
    if len > max_chars {
        errors.add(
            field,
            format!("Ensure this value has at most {max_chars} characters (it has {len})."),
        );
    }
}

/// Metrics such as accuracy are fractions in `[0, 1]`.
pub fn check_unit_interval(errors: &mut FieldErrors, field: &str, value: Option<f64>) {
    if let Some(v) = value {
        if !(0.0..=1.0).contains(&v) {
            errors.add(field, "Ensure this value is between 0 and 1.");
        }
    }
}

pub fn check_min(errors: &mut FieldErrors, field: &str, value: i64, min: i64) {
    if value < min {
        errors.add(
            field,
            format!("Ensure this value is greater than or equal to {min}."),
        );
    }
}

pub fn check_url(errors: &mut FieldErrors, field: &str, value: Option<&str>) {
    if let Some(url) = value {
        let rest = url
            .strip_prefix("http://")
            .or_else(|| url.strip_prefix("https://"));
        let valid = rest.is_some_and(|r| {
            let host = r.split(['/', '?', '#']).next().unwrap_or("");
            !host.is_empty() && !r.contains(char::is_whitespace)
        });
        if !valid {
            errors.add(field, "Enter a valid URL.");
        }
    }
}

pub fn is_hex_color(value: &str) -> bool {
    value.len() == 7
        && value.starts_with('#')
        && value[1..].bytes().all(|b| b.is_ascii_hexdigit())
}

/// Lowercased extension of `file_name` when it is one of `allowed`.
pub fn allowed_extension(file_name: &str, allowed: &[&str]) -> Option<String> {
    let (_, ext) = file_name.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    allowed.contains(&ext.as_str()).then_some(ext)
}
