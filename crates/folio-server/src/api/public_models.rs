//! Read-only model API under `/api/models`.
//!
//! These routes predate the `/v1` envelope and answer with bare JSON:
//! a list or an object on success, `{"detail": "..."}` on error.

use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use folio_common::types::{AIModel, AIModelCategory, ModelStatus, ModelType};
use folio_storage::ModelFilter;
use serde::Serialize;
use serde_json::{json, Value};
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

#[derive(Debug, Serialize, ToSchema)]
pub struct CategorySummary {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub color: String,
}

impl From<AIModelCategory> for CategorySummary {
    fn from(c: AIModelCategory) -> Self {
        Self {
            id: c.id,
            name: c.name,
            slug: c.slug,
            description: c.description,
            color: c.color,
        }
    }
}

/// Serialized model as exposed by the public API.
#[derive(Debug, Serialize, ToSchema)]
pub struct PublicModel {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub model_type: ModelType,
    pub category: Option<CategorySummary>,
    pub version: String,
    pub framework: String,
    pub accuracy: Option<f64>,
    pub precision: Option<f64>,
    pub recall: Option<f64>,
    pub f1_score: Option<f64>,
    #[schema(value_type = Object)]
    pub input_format: Value,
    #[schema(value_type = Object)]
    pub output_format: Value,
    pub max_input_length: i32,
    pub batch_size: i32,
    pub status: ModelStatus,
    pub is_public: bool,
    /// Username of the creator
    pub created_by: String,
    pub success_rate: f64,
    pub total_inferences: i64,
    pub successful_inferences: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<AIModel> for PublicModel {
    fn from(m: AIModel) -> Self {
        Self {
            id: m.id,
            name: m.name,
            slug: m.slug,
            description: m.description,
            model_type: m.model_type,
            category: m.category.map(CategorySummary::from),
            version: m.version,
            framework: m.framework,
            accuracy: m.accuracy,
            precision: m.precision,
            recall: m.recall,
            f1_score: m.f1_score,
            input_format: m.input_format,
            output_format: m.output_format,
            max_input_length: m.max_input_length,
            batch_size: m.batch_size,
            status: m.status,
            is_public: m.is_public,
            created_by: m.created_by_username,
            success_rate: m.success_rate,
            total_inferences: m.total_inferences,
            successful_inferences: m.successful_inferences,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

fn detail(status: StatusCode, msg: &str) -> Response {
    (status, Json(json!({ "detail": msg }))).into_response()
}

fn internal(e: folio_storage::StorageError) -> Response {
    tracing::error!(error = %e, "Public model query failed");
    detail(StatusCode::INTERNAL_SERVER_ERROR, "A server error occurred.")
}

/// Public models in `ready` status, newest first.
#[utoipa::path(
    get,
    path = "/api/models",
    tag = "Public API",
    responses(
        (status = 200, description = "Models", body = Vec<PublicModel>)
    )
)]
async fn list_public_models(State(state): State<AppState>) -> Response {
    let filter = ModelFilter::visible();
    let total = match state.store.count_models(&filter).await {
        Ok(total) => total,
        Err(e) => return internal(e),
    };
    match state.store.list_models(&filter, total, 0).await {
        Ok(models) => Json(models.into_iter().map(PublicModel::from).collect::<Vec<_>>()).into_response(),
        Err(e) => internal(e),
    }
}

#[utoipa::path(
    get,
    path = "/api/models/{model}",
    tag = "Public API",
    params(("model" = String, Path, description = "Model slug")),
    responses(
        (status = 200, description = "Model", body = PublicModel),
        (status = 404, description = "No public ready model with this slug")
    )
)]
async fn get_public_model(State(state): State<AppState>, Path(slug): Path<String>) -> Response {
    match state.store.get_model_by_slug(&slug).await {
        Ok(Some(model)) if model.is_public && model.status == ModelStatus::Ready => {
            Json(PublicModel::from(model)).into_response()
        }
        Ok(_) => detail(StatusCode::NOT_FOUND, "Not found."),
        Err(e) => internal(e),
    }
}

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(list_public_models))
        .routes(routes!(get_public_model))
}
