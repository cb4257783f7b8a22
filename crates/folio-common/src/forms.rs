//! Request bodies and their validated forms.
//!
//! Each `*Form` is what a client sends; `validate` turns it into a draft
//! whose derived fields (slug base, excerpt, defaults) are fixed at
//! construction time, or returns the per-field errors.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::slug;
use crate::text;
use crate::types::{DeploymentType, FeedbackType, ModelStatus, ModelType, PostStatus};
use crate::validation::{self, FieldErrors};

pub const DEFAULT_TAG_COLOR: &str = "#007bff";
pub const DEFAULT_MODEL_VERSION: &str = "1.0";
pub const DEFAULT_FRAMEWORK: &str = "PyTorch";
pub const DEFAULT_MAX_INPUT_LENGTH: i32 = 512;
pub const DEFAULT_BATCH_SIZE: i32 = 1;
pub const DEFAULT_CPU_LIMIT: &str = "1000m";
pub const DEFAULT_MEMORY_LIMIT: &str = "1Gi";

fn optional_text(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn parse_choice<T: std::str::FromStr<Err = String>>(
    errors: &mut FieldErrors,
    field: &str,
    raw: Option<&str>,
) -> Option<T> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => {
            errors.add(field, "This field is required.");
            None
        }
        Some(raw) => match raw.parse::<T>() {
            Ok(v) => Some(v),
            Err(msg) => {
                errors.add(field, msg);
                None
            }
        },
    }
}

fn check_color(errors: &mut FieldErrors, color: &Option<String>) -> String {
    match optional_text(color) {
        None => DEFAULT_TAG_COLOR.to_string(),
        Some(c) if validation::is_hex_color(&c) => c.to_ascii_lowercase(),
        Some(_) => {
            errors.add("color", "Enter a hex colour such as #007bff.");
            DEFAULT_TAG_COLOR.to_string()
        }
    }
}

// ---- auth ----

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub access_token: String,
    /// Always `Bearer`
    pub token_type: String,
    /// Token lifetime in seconds
    pub expires_in: u64,
    pub username: String,
    pub is_staff: bool,
}

// ---- blog ----

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct PostForm {
    #[serde(default)]
    pub title: String,
    /// Markdown
    #[serde(default)]
    pub body: String,
    /// Generated from the body when empty
    #[serde(default)]
    pub excerpt: Option<String>,
    /// `draft` (default) or `published`
    #[serde(default)]
    pub status: Option<String>,
    /// Tag ids
    #[serde(default)]
    pub tags: Vec<String>,
}

/// A validated post with its derived fields resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct PostDraft {
    pub title: String,
    pub slug_base: String,
    pub body: String,
    pub excerpt: String,
    pub status: PostStatus,
    pub tag_ids: Vec<String>,
}

impl PostDraft {
    pub fn new(
        title: &str,
        body: &str,
        excerpt: Option<&str>,
        status: PostStatus,
        tag_ids: Vec<String>,
    ) -> Self {
        let title = title.trim().to_string();
        let excerpt = match excerpt.map(str::trim).filter(|e| !e.is_empty()) {
            Some(e) => e.to_string(),
            None => text::excerpt_from_body(body),
        };
        let mut tag_ids = tag_ids;
        tag_ids.sort();
        tag_ids.dedup();
        Self {
            slug_base: slug::bounded(&title, slug::POST_SLUG_MAX, "post"),
            title,
            body: body.to_string(),
            excerpt,
            status,
            tag_ids,
        }
    }
}

impl PostForm {
    pub fn validate(&self) -> Result<PostDraft, FieldErrors> {
        let mut errors = FieldErrors::new();
        validation::check_required(&mut errors, "title", &self.title, 200);
        if self.body.trim().is_empty() {
            errors.add("body", "This field is required.");
        }
        if let Some(excerpt) = &self.excerpt {
            validation::check_len(&mut errors, "excerpt", excerpt.trim(), text::EXCERPT_MAX_CHARS);
        }
        let status = match optional_text(&self.status) {
            None => Some(PostStatus::Draft),
            Some(raw) => parse_choice(&mut errors, "status", Some(&raw)),
        };
        let draft = PostDraft::new(
            &self.title,
            &self.body,
            self.excerpt.as_deref(),
            status.unwrap_or(PostStatus::Draft),
            self.tags.clone(),
        );
        errors.into_result(draft)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct TagForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TagDraft {
    pub name: String,
    pub slug_base: String,
    pub color: String,
}

impl TagDraft {
    pub fn new(name: &str, color: &str) -> Self {
        let name = name.trim().to_string();
        Self {
            slug_base: slug::bounded(&name, slug::TAG_SLUG_MAX, "tag"),
            name,
            color: color.to_string(),
        }
    }
}

impl TagForm {
    pub fn validate(&self) -> Result<TagDraft, FieldErrors> {
        let mut errors = FieldErrors::new();
        validation::check_required(&mut errors, "name", &self.name, 50);
        let color = check_color(&mut errors, &self.color);
        errors.into_result(TagDraft::new(&self.name, &color))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CommentForm {
    #[serde(default)]
    pub content: String,
}

impl CommentForm {
    pub fn validate(&self) -> Result<String, FieldErrors> {
        let mut errors = FieldErrors::new();
        if self.content.trim().is_empty() {
            errors.add("content", "This field is required.");
        }
        errors.into_result(self.content.trim().to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CommentApprovalRequest {
    pub is_approved: bool,
}

// ---- ai models ----

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CategoryForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryDraft {
    pub name: String,
    pub slug_base: String,
    pub description: String,
    pub color: String,
}

impl CategoryForm {
    pub fn validate(&self) -> Result<CategoryDraft, FieldErrors> {
        let mut errors = FieldErrors::new();
        validation::check_required(&mut errors, "name", &self.name, 100);
        let color = check_color(&mut errors, &self.color);
        let name = self.name.trim().to_string();
        errors.into_result(CategoryDraft {
            slug_base: slug::bounded(&name, slug::CATEGORY_SLUG_MAX, "category"),
            name,
            description: optional_text(&self.description).unwrap_or_default(),
            color,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct AIModelForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// One of the model type values, e.g. `sentiment_analysis`
    #[serde(default)]
    pub model_type: Option<String>,
    /// Category id
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub framework: Option<String>,
    #[serde(default)]
    pub accuracy: Option<f64>,
    #[serde(default)]
    pub precision: Option<f64>,
    #[serde(default)]
    pub recall: Option<f64>,
    #[serde(default)]
    pub f1_score: Option<f64>,
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub input_format: Option<Value>,
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub output_format: Option<Value>,
    #[serde(default)]
    pub max_input_length: Option<i64>,
    #[serde(default)]
    pub batch_size: Option<i64>,
    #[serde(default)]
    pub is_public: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelDraft {
    pub name: String,
    pub slug_base: String,
    pub description: String,
    pub model_type: ModelType,
    pub category_id: Option<String>,
    pub version: String,
    pub framework: String,
    pub accuracy: Option<f64>,
    pub precision: Option<f64>,
    pub recall: Option<f64>,
    pub f1_score: Option<f64>,
    pub input_format: Value,
    pub output_format: Value,
    pub max_input_length: i32,
    pub batch_size: i32,
    pub is_public: bool,
}

impl ModelDraft {
    /// A draft with the registry defaults; the slug comes from `"{name}-{version}"`.
    pub fn new(name: &str, description: &str, model_type: ModelType, version: &str) -> Self {
        let name = name.trim().to_string();
        let version = version.trim().to_string();
        Self {
            slug_base: slug::bounded(&format!("{name}-{version}"), slug::MODEL_SLUG_MAX, "model"),
            name,
            description: description.trim().to_string(),
            model_type,
            category_id: None,
            version,
            framework: DEFAULT_FRAMEWORK.to_string(),
            accuracy: None,
            precision: None,
            recall: None,
            f1_score: None,
            input_format: Value::Object(Default::default()),
            output_format: Value::Object(Default::default()),
            max_input_length: DEFAULT_MAX_INPUT_LENGTH,
            batch_size: DEFAULT_BATCH_SIZE,
            is_public: true,
        }
    }
}

fn json_object(errors: &mut FieldErrors, field: &str, value: &Option<Value>) -> Value {
    match value {
        None | Some(Value::Null) => Value::Object(Default::default()),
        Some(v @ Value::Object(_)) => v.clone(),
        Some(_) => {
            errors.add(field, "Enter a JSON object.");
            Value::Object(Default::default())
        }
    }
}

fn positive_i32(errors: &mut FieldErrors, field: &str, value: Option<i64>, default: i32) -> i32 {
    match value {
        None => default,
        Some(v) => {
            validation::check_min(errors, field, v, 1);
            i32::try_from(v).unwrap_or_else(|_| {
                errors.add(field, "Value is too large.");
                default
            })
        }
    }
}

impl AIModelForm {
    pub fn validate(&self) -> Result<ModelDraft, FieldErrors> {
        let mut errors = FieldErrors::new();
        validation::check_required(&mut errors, "name", &self.name, 200);
        if self.description.trim().is_empty() {
            errors.add("description", "This field is required.");
        }
        let model_type = parse_choice::<ModelType>(&mut errors, "model_type", self.model_type.as_deref());
        let version = optional_text(&self.version).unwrap_or_else(|| DEFAULT_MODEL_VERSION.to_string());
        validation::check_len(&mut errors, "version", &version, 20);
        let framework = optional_text(&self.framework).unwrap_or_else(|| DEFAULT_FRAMEWORK.to_string());
        validation::check_len(&mut errors, "framework", &framework, 50);
        validation::check_unit_interval(&mut errors, "accuracy", self.accuracy);
        validation::check_unit_interval(&mut errors, "precision", self.precision);
        validation::check_unit_interval(&mut errors, "recall", self.recall);
        validation::check_unit_interval(&mut errors, "f1_score", self.f1_score);
        let input_format = json_object(&mut errors, "input_format", &self.input_format);
        let output_format = json_object(&mut errors, "output_format", &self.output_format);
        let max_input_length = positive_i32(
            &mut errors,
            "max_input_length",
            self.max_input_length,
            DEFAULT_MAX_INPUT_LENGTH,
        );
        let batch_size = positive_i32(&mut errors, "batch_size", self.batch_size, DEFAULT_BATCH_SIZE);

        let Some(model_type) = model_type else {
            return Err(errors);
        };
        let mut draft = ModelDraft::new(&self.name, &self.description, model_type, &version);
        draft.category_id = optional_text(&self.category);
        draft.framework = framework;
        draft.accuracy = self.accuracy;
        draft.precision = self.precision;
        draft.recall = self.recall;
        draft.f1_score = self.f1_score;
        draft.input_format = input_format;
        draft.output_format = output_format;
        draft.max_input_length = max_input_length;
        draft.batch_size = batch_size;
        draft.is_public = self.is_public.unwrap_or(true);
        errors.into_result(draft)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ModelStatusRequest {
    pub status: ModelStatus,
    #[serde(default)]
    pub last_trained: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct TeamRequest {
    #[serde(default)]
    pub usernames: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct DeploymentForm {
    /// `local`, `cloud`, `edge` or `api`
    #[serde(default)]
    pub deployment_type: Option<String>,
    #[serde(default)]
    pub endpoint_url: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub replicas: Option<i64>,
    #[serde(default)]
    pub cpu_limit: Option<String>,
    #[serde(default)]
    pub memory_limit: Option<String>,
    #[serde(default)]
    pub health_check_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentDraft {
    pub deployment_type: DeploymentType,
    pub endpoint_url: Option<String>,
    pub is_active: bool,
    pub replicas: i32,
    pub cpu_limit: String,
    pub memory_limit: String,
    pub health_check_url: Option<String>,
}

impl DeploymentForm {
    pub fn validate(&self) -> Result<DeploymentDraft, FieldErrors> {
        let mut errors = FieldErrors::new();
        let deployment_type =
            parse_choice::<DeploymentType>(&mut errors, "deployment_type", self.deployment_type.as_deref());
        let endpoint_url = optional_text(&self.endpoint_url);
        validation::check_url(&mut errors, "endpoint_url", endpoint_url.as_deref());
        let health_check_url = optional_text(&self.health_check_url);
        validation::check_url(&mut errors, "health_check_url", health_check_url.as_deref());
        let replicas = positive_i32(&mut errors, "replicas", self.replicas, 1);
        let cpu_limit = optional_text(&self.cpu_limit).unwrap_or_else(|| DEFAULT_CPU_LIMIT.to_string());
        validation::check_len(&mut errors, "cpu_limit", &cpu_limit, 20);
        let memory_limit =
            optional_text(&self.memory_limit).unwrap_or_else(|| DEFAULT_MEMORY_LIMIT.to_string());
        validation::check_len(&mut errors, "memory_limit", &memory_limit, 20);

        let Some(deployment_type) = deployment_type else {
            return Err(errors);
        };
        errors.into_result(DeploymentDraft {
            deployment_type,
            endpoint_url,
            is_active: self.is_active.unwrap_or(true),
            replicas,
            cpu_limit,
            memory_limit,
            health_check_url,
        })
    }
}

// ---- inference ----

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct InferenceRequestBody {
    /// Model input; a string or an object, required
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub input_data: Option<Value>,
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub parameters: Option<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct FeedbackForm {
    /// `correct`, `incorrect`, `partially_correct` or `not_sure`
    #[serde(default)]
    pub feedback_type: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
    /// 1 to 5
    #[serde(default)]
    pub rating: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackDraft {
    pub feedback_type: FeedbackType,
    pub comment: String,
    pub rating: Option<i32>,
}

impl FeedbackForm {
    pub fn validate(&self) -> Result<FeedbackDraft, FieldErrors> {
        let mut errors = FieldErrors::new();
        let feedback_type =
            parse_choice::<FeedbackType>(&mut errors, "feedback_type", self.feedback_type.as_deref());
        let rating = match self.rating {
            None => None,
            Some(r) if (1..=5).contains(&r) => Some(r as i32),
            Some(_) => {
                errors.add("rating", "Rating must be between 1 and 5.");
                None
            }
        };
        let Some(feedback_type) = feedback_type else {
            return Err(errors);
        };
        errors.into_result(FeedbackDraft {
            feedback_type,
            comment: optional_text(&self.comment).unwrap_or_default(),
            rating,
        })
    }
}
