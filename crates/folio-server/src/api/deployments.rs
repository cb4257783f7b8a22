use crate::api::models::editable_model;
use crate::api::{forbidden, not_found, storage_failure, success_response, validation_response, ApiError, ApiResult};
use crate::auth::CurrentUser;
use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::Json;
use folio_common::forms::DeploymentForm;
use folio_common::types::ModelDeployment;
use utoipa_axum::{router::OpenApiRouter, routes};

/// Deployments of a model, newest first.
#[utoipa::path(
    get,
    path = "/v1/ai-models/{slug}/deployments",
    tag = "Deployments",
    security(("bearer_auth" = [])),
    params(("slug" = String, Path, description = "Model slug")),
    responses(
        (status = 200, description = "Deployments", body = Vec<ModelDeployment>),
        (status = 403, description = "Caller may not edit this model", body = ApiError),
        (status = 404, description = "Unknown model", body = ApiError)
    )
)]
async fn list_deployments(
    Extension(trace_id): Extension<TraceId>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult {
    let model = editable_model(&state, &trace_id, &slug, &user).await?;
    let deployments = state
        .store
        .list_deployments(&model.id)
        .await
        .map_err(|e| storage_failure(&trace_id, e, "Failed to list deployments"))?;
    Ok(success_response(StatusCode::OK, &trace_id, deployments))
}

#[utoipa::path(
    post,
    path = "/v1/ai-models/{slug}/deployments",
    tag = "Deployments",
    security(("bearer_auth" = [])),
    params(("slug" = String, Path, description = "Model slug")),
    request_body = DeploymentForm,
    responses(
        (status = 201, description = "Created", body = ModelDeployment),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 403, description = "Caller may not edit this model", body = ApiError)
    )
)]
async fn create_deployment(
    Extension(trace_id): Extension<TraceId>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(form): Json<DeploymentForm>,
) -> ApiResult {
    let model = editable_model(&state, &trace_id, &slug, &user).await?;
    let draft = form
        .validate()
        .map_err(|errors| validation_response(&trace_id, errors))?;
    let deployment = state
        .store
        .create_deployment(&model.id, &draft)
        .await
        .map_err(|e| storage_failure(&trace_id, e, "Failed to create deployment"))?;
    tracing::info!(
        model = %model.slug,
        deployment_id = %deployment.id,
        kind = %deployment.deployment_type,
        "Deployment registered"
    );
    Ok(success_response(StatusCode::CREATED, &trace_id, deployment))
}

/// Record a health check. Active deployments report healthy.
#[utoipa::path(
    post,
    path = "/v1/deployments/{id}/health",
    tag = "Deployments",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Deployment id")),
    responses(
        (status = 200, description = "Checked", body = ModelDeployment),
        (status = 403, description = "Caller may not edit the model", body = ApiError),
        (status = 404, description = "Unknown deployment", body = ApiError)
    )
)]
async fn health_check(
    Extension(trace_id): Extension<TraceId>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult {
    let deployment = state
        .store
        .get_deployment(&id)
        .await
        .map_err(|e| storage_failure(&trace_id, e, "Failed to load deployment"))?
        .ok_or_else(|| not_found(&trace_id, "Deployment"))?;
    let model = state
        .store
        .get_model_by_id(&deployment.model_id)
        .await
        .map_err(|e| storage_failure(&trace_id, e, "Failed to load model"))?
        .ok_or_else(|| not_found(&trace_id, "Model"))?;
    if !model.can_edit(&user) {
        return Err(forbidden(&trace_id, "you do not have permission to edit this model"));
    }
    let checked = state
        .store
        .record_health_check(&deployment.id)
        .await
        .map_err(|e| storage_failure(&trace_id, e, "Failed to record health check"))?
        .ok_or_else(|| not_found(&trace_id, "Deployment"))?;
    Ok(success_response(StatusCode::OK, &trace_id, checked))
}

pub fn protected_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(list_deployments, create_deployment))
        .routes(routes!(health_check))
}
