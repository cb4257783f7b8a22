use crate::api::{storage_failure, success_response, validation_response, ApiError, ApiResult};
use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::Json;
use folio_common::forms::CategoryForm;
use folio_common::types::AIModelCategory;
use utoipa_axum::{router::OpenApiRouter, routes};

/// Model categories, by name.
#[utoipa::path(
    get,
    path = "/v1/ai-models/categories",
    tag = "AI Models",
    responses(
        (status = 200, description = "Categories", body = Vec<AIModelCategory>)
    )
)]
async fn list_categories(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> ApiResult {
    let categories = state
        .store
        .list_categories()
        .await
        .map_err(|e| storage_failure(&trace_id, e, "Failed to list categories"))?;
    Ok(success_response(StatusCode::OK, &trace_id, categories))
}

#[utoipa::path(
    post,
    path = "/v1/ai-models/categories",
    tag = "AI Models",
    security(("bearer_auth" = [])),
    request_body = CategoryForm,
    responses(
        (status = 201, description = "Created", body = AIModelCategory),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 409, description = "Name already taken", body = ApiError)
    )
)]
async fn create_category(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Json(form): Json<CategoryForm>,
) -> ApiResult {
    let draft = form
        .validate()
        .map_err(|errors| validation_response(&trace_id, errors))?;
    let category = state
        .store
        .create_category(&draft)
        .await
        .map_err(|e| storage_failure(&trace_id, e, "Failed to create category"))?;
    Ok(success_response(StatusCode::CREATED, &trace_id, category))
}

pub fn public_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(list_categories))
}

pub fn protected_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(create_category))
}
