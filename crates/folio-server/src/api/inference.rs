//! Inference runs against registered models, plus per-request follow-ups
//! (lookup, cancellation, feedback).

use crate::api::{
    error_response, error_response_with_data, not_found, storage_failure, success_response,
    validation_response, ApiError, ApiResult,
};
use crate::auth::CurrentUser;
use crate::logging::{ClientIp, TraceId};
use crate::state::AppState;
use axum::extract::{Extension, Path, State};
use axum::http::{header, HeaderMap, StatusCode, Uri};
use axum::response::Response;
use axum::Json;
use folio_common::forms::{FeedbackForm, InferenceRequestBody};
use folio_common::types::{InferenceRequest, InferenceStatus, ModelFeedback, User};
use folio_inference::InferenceJob;
use folio_storage::{InferenceOutcome, StorageError, UsageLogEntry};
use serde::Serialize;
use serde_json::Value;
use std::time::Instant;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

#[derive(Serialize, ToSchema)]
struct InferenceResponse {
    inference_id: String,
    status: InferenceStatus,
    #[schema(value_type = Object)]
    result: Value,
    /// Seconds spent in the engine
    processing_time: f64,
}

#[derive(Serialize, ToSchema)]
struct InferenceFailure {
    inference_id: String,
    error: String,
}

/// Run a model on `input_data`.
///
/// The model must be `ready` or `deployed` and either public or editable by
/// the caller. Every run is recorded as an inference request and a usage
/// log row, whether it succeeds or not.
#[utoipa::path(
    post,
    path = "/api/models/{model}/inference",
    tag = "Inference",
    security(("bearer_auth" = [])),
    params(("model" = String, Path, description = "Model id")),
    request_body = InferenceRequestBody,
    responses(
        (status = 200, description = "Completed", body = InferenceResponse),
        (status = 400, description = "Missing input_data", body = ApiError),
        (status = 404, description = "No usable model with this id", body = ApiError),
        (status = 500, description = "Inference failed", body = ApiError)
    )
)]
async fn run_inference(
    Extension(trace_id): Extension<TraceId>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Extension(ClientIp(ip)): Extension<ClientIp>,
    State(state): State<AppState>,
    Path(id): Path<String>,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<InferenceRequestBody>,
) -> ApiResult {
    let started = Instant::now();
    if !folio_common::id::looks_like_id(&id) {
        return Err(not_found(&trace_id, "Model"));
    }
    let model = state
        .store
        .get_model_by_id(&id)
        .await
        .map_err(|e| storage_failure(&trace_id, e, "Failed to load model"))?
        .filter(|m| m.status.accepts_inference() && (m.is_public || m.can_edit(&user)))
        .ok_or_else(|| not_found(&trace_id, "Model"))?;

    let input_data = match body.input_data {
        Some(Value::Null) | None => {
            return Err(error_response(
                StatusCode::BAD_REQUEST,
                &trace_id,
                "bad_request",
                "input_data is required",
            ))
        }
        Some(v) => v,
    };
    let parameters = match body.parameters {
        Some(Value::Null) | None => Value::Object(Default::default()),
        Some(v) => v,
    };

    let request = state
        .store
        .create_inference_request(&model.id, &user.id, &input_data, &parameters)
        .await
        .map_err(|e| storage_failure(&trace_id, e, "Failed to record inference request"))?;
    if let Err(e) = state
        .store
        .transition_inference(&request.id, InferenceStatus::Processing, InferenceOutcome::default())
        .await
    {
        return Err(abandon(&state, &trace_id, &request.id, e, "Failed to start inference").await);
    }

    let job = InferenceJob {
        model_type: model.model_type,
        max_input_length: model.max_input_length.max(1) as usize,
        input_data,
        parameters,
    };
    let engine_start = Instant::now();
    let outcome = state.engine.infer(job).await;
    let processing_time = engine_start.elapsed().as_secs_f64();

    let (next, recorded) = match &outcome {
        Ok(result) => (
            InferenceStatus::Completed,
            InferenceOutcome {
                result: Some(result.clone()),
                processing_time: Some(processing_time),
                ..Default::default()
            },
        ),
        Err(e) => (
            InferenceStatus::Failed,
            InferenceOutcome {
                error_message: Some(e.to_string()),
                processing_time: Some(processing_time),
                ..Default::default()
            },
        ),
    };
    let finished = match state.store.transition_inference(&request.id, next, recorded).await {
        Ok(finished) => finished,
        Err(e) => {
            return Err(abandon(&state, &trace_id, &request.id, e, "Failed to finish inference").await)
        }
    };
    state
        .store
        .record_inference_outcome(&model.id, outcome.is_ok())
        .await
        .map_err(|e| storage_failure(&trace_id, e, "Failed to update model counters"))?;

    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let entry = UsageLogEntry {
        model_id: model.id.clone(),
        user_id: user.id.clone(),
        inference_request_id: finished.id.clone(),
        ip_address: ip,
        user_agent,
        api_endpoint: uri.path().to_string(),
        response_time: started.elapsed().as_secs_f64(),
    };
    state
        .store
        .insert_usage_log(&entry)
        .await
        .map_err(|e| storage_failure(&trace_id, e, "Failed to write usage log"))?;

    match outcome {
        Ok(result) => {
            tracing::info!(
                model = %model.slug,
                inference_id = %finished.id,
                engine = state.engine.name(),
                processing_time,
                "Inference completed"
            );
            Ok(success_response(
                StatusCode::OK,
                &trace_id,
                InferenceResponse {
                    inference_id: finished.id,
                    status: finished.status,
                    result,
                    processing_time,
                },
            ))
        }
        Err(e) => {
            tracing::warn!(model = %model.slug, inference_id = %finished.id, error = %e, "Inference failed");
            Err(error_response_with_data(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "inference_failed",
                "inference failed",
                Some(InferenceFailure {
                    inference_id: finished.id,
                    error: e.to_string(),
                }),
            ))
        }
    }
}

/// Close a request left open by a failed store write, then report the
/// original failure. A request never stays `pending` or `processing` after
/// its run has returned.
async fn abandon(state: &AppState, trace_id: &str, request_id: &str, err: StorageError, context: &str) -> Response {
    if let Err(close_err) = state.store.abandon_inference(request_id, context).await {
        tracing::warn!(
            trace_id = %trace_id,
            inference_id = %request_id,
            error = %close_err,
            "Failed to close interrupted inference request"
        );
    }
    storage_failure(trace_id, err, context)
}

/// The caller's own inference request. Anyone else's is reported as missing.
async fn own_request(state: &AppState, trace_id: &str, id: &str, user: &User) -> Result<InferenceRequest, Response> {
    if !folio_common::id::looks_like_id(id) {
        return Err(not_found(trace_id, "Inference request"));
    }
    state
        .store
        .get_inference_request(id)
        .await
        .map_err(|e| storage_failure(trace_id, e, "Failed to load inference request"))?
        .filter(|r| r.user_id == user.id)
        .ok_or_else(|| not_found(trace_id, "Inference request"))
}

#[utoipa::path(
    get,
    path = "/v1/inference/{id}",
    tag = "Inference",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Inference request id")),
    responses(
        (status = 200, description = "Inference request", body = InferenceRequest),
        (status = 404, description = "Not the caller's request", body = ApiError)
    )
)]
async fn get_inference(
    Extension(trace_id): Extension<TraceId>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult {
    let request = own_request(&state, &trace_id, &id, &user).await?;
    Ok(success_response(StatusCode::OK, &trace_id, request))
}

/// Cancel a pending or processing request.
#[utoipa::path(
    post,
    path = "/v1/inference/{id}/cancel",
    tag = "Inference",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Inference request id")),
    responses(
        (status = 200, description = "Cancelled", body = InferenceRequest),
        (status = 404, description = "Not the caller's request", body = ApiError),
        (status = 409, description = "Request already finished", body = ApiError)
    )
)]
async fn cancel_inference(
    Extension(trace_id): Extension<TraceId>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult {
    let request = own_request(&state, &trace_id, &id, &user).await?;
    let cancelled = state
        .store
        .transition_inference(&request.id, InferenceStatus::Cancelled, InferenceOutcome::default())
        .await
        .map_err(|e| storage_failure(&trace_id, e, "Failed to cancel inference"))?;
    Ok(success_response(StatusCode::OK, &trace_id, cancelled))
}

/// Rate a result. One submission per request and user.
#[utoipa::path(
    post,
    path = "/v1/inference/{id}/feedback",
    tag = "Inference",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Inference request id")),
    request_body = FeedbackForm,
    responses(
        (status = 201, description = "Recorded", body = ModelFeedback),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 404, description = "Not the caller's request", body = ApiError),
        (status = 409, description = "Feedback already submitted", body = ApiError)
    )
)]
async fn submit_feedback(
    Extension(trace_id): Extension<TraceId>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(form): Json<FeedbackForm>,
) -> ApiResult {
    let request = own_request(&state, &trace_id, &id, &user).await?;
    let draft = form
        .validate()
        .map_err(|errors| validation_response(&trace_id, errors))?;
    let feedback = state
        .store
        .create_feedback(&request.id, &user.id, &draft)
        .await
        .map_err(|e| storage_failure(&trace_id, e, "Failed to record feedback"))?;
    Ok(success_response(StatusCode::CREATED, &trace_id, feedback))
}

/// The run endpoint. Mounted behind authentication only when inference is enabled.
pub fn run_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(run_inference))
}

pub fn protected_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(get_inference))
        .routes(routes!(cancel_inference))
        .routes(routes!(submit_feedback))
}
