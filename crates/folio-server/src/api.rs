pub mod categories;
pub mod comments;
pub mod deployments;
pub mod inference;
pub mod models;
pub mod pagination;
pub mod posts;
pub mod profiles;
pub mod public_models;
pub mod tags;

use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use folio_common::validation::FieldErrors;
use folio_storage::StorageError;
use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

/// Handlers return the error response in `Err` so lookups can use `?`.
pub type ApiResult = Result<Response, Response>;

/// Error envelope
#[derive(Serialize, ToSchema)]
pub struct ApiError {
    /// Non-zero error code
    pub err_code: i32,
    pub err_msg: String,
    pub trace_id: String,
}

/// Uniform response envelope
#[derive(Serialize)]
pub struct ApiResponse<T>
where
    T: Serialize,
{
    /// 0 on success
    pub err_code: i32,
    pub err_msg: String,
    pub trace_id: String,
    pub data: Option<T>,
}

pub fn success_response<T>(status: StatusCode, trace_id: &str, data: T) -> Response
where
    T: Serialize,
{
    (
        status,
        Json(ApiResponse {
            err_code: 0,
            err_msg: "success".to_string(),
            trace_id: trace_id.to_string(),
            data: Some(data),
        }),
    )
        .into_response()
}

pub fn success_empty_response(status: StatusCode, trace_id: &str, msg: &str) -> Response {
    (
        status,
        Json(ApiResponse::<Value> {
            err_code: 0,
            err_msg: msg.to_string(),
            trace_id: trace_id.to_string(),
            data: None,
        }),
    )
        .into_response()
}

fn to_custom_error_code(code: &str) -> i32 {
    match code {
        "bad_request" => 1001,
        "unauthorized" => 1002,
        "token_expired" => 1003,
        "not_found" => 1004,
        "conflict" => 1005,
        "forbidden" => 1006,
        "validation_failed" => 1010,
        "inference_failed" => 1202,
        "storage_error" => 1501,
        "internal_error" => 1500,
        _ => 1999,
    }
}

pub fn error_response(status: StatusCode, trace_id: &str, code: &str, msg: &str) -> Response {
    error_response_with_data::<Value>(status, trace_id, code, msg, None)
}

pub fn error_response_with_data<T>(
    status: StatusCode,
    trace_id: &str,
    code: &str,
    msg: &str,
    data: Option<T>,
) -> Response
where
    T: Serialize,
{
    (
        status,
        Json(ApiResponse {
            err_code: to_custom_error_code(code),
            err_msg: msg.to_string(),
            trace_id: trace_id.to_string(),
            data,
        }),
    )
        .into_response()
}

/// 400 with the per-field messages as `data`.
pub fn validation_response(trace_id: &str, errors: FieldErrors) -> Response {
    error_response_with_data(
        StatusCode::BAD_REQUEST,
        trace_id,
        "validation_failed",
        &errors.to_string(),
        Some(errors),
    )
}

pub fn not_found(trace_id: &str, what: &str) -> Response {
    error_response(
        StatusCode::NOT_FOUND,
        trace_id,
        "not_found",
        &format!("{what} not found"),
    )
}

pub fn forbidden(trace_id: &str, msg: &str) -> Response {
    error_response(StatusCode::FORBIDDEN, trace_id, "forbidden", msg)
}

/// Map a storage failure to a response, logging anything unexpected.
pub fn storage_failure(trace_id: &str, err: StorageError, context: &str) -> Response {
    match err {
        StorageError::NotFound { entity, .. } => not_found(trace_id, entity),
        StorageError::Conflict(msg) => {
            error_response(StatusCode::CONFLICT, trace_id, "conflict", &msg)
        }
        StorageError::InvalidTransition { from, to, .. } => error_response(
            StatusCode::CONFLICT,
            trace_id,
            "conflict",
            &format!("cannot move from {from} to {to}"),
        ),
        other => {
            tracing::error!(trace_id = %trace_id, error = %other, "{context}");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                trace_id,
                "storage_error",
                context,
            )
        }
    }
}

/// Health response
#[derive(Serialize, ToSchema)]
struct HealthResponse {
    version: String,
    uptime_secs: i64,
    /// `ok` or `error`
    storage_status: String,
    /// `ok`, `error`, or `disabled` when the run endpoint is not mounted
    inference_status: String,
}

/// Service health.
#[utoipa::path(
    get,
    path = "/v1/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service health", body = HealthResponse)
    )
)]
async fn health(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let uptime = (Utc::now() - state.start_time).num_seconds();
    let storage_status = match state.store.ping().await {
        Ok(()) => "ok",
        Err(e) => {
            tracing::error!(error = %e, "Storage ping failed");
            "error"
        }
    };
    let inference_status = if !state.config.inference.enabled {
        "disabled"
    } else {
        match state.engine.health_check().await {
            Ok(()) => "ok",
            Err(e) => {
                tracing::error!(engine = state.engine.name(), error = %e, "Inference engine health check failed");
                "error"
            }
        }
    };
    success_response(
        StatusCode::OK,
        &trace_id,
        HealthResponse {
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_secs: uptime,
            storage_status: storage_status.to_string(),
            inference_status: inference_status.to_string(),
        },
    )
}

pub fn public_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(health))
        .merge(posts::public_routes())
        .merge(tags::public_routes())
        .merge(profiles::public_routes())
        .merge(models::public_routes())
        .merge(categories::public_routes())
}

pub fn auth_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(crate::auth::login))
}

pub fn protected_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(crate::auth::logout))
        .routes(routes!(crate::auth::me))
        .merge(posts::protected_routes())
        .merge(comments::protected_routes())
        .merge(tags::protected_routes())
        .merge(models::protected_routes())
        .merge(categories::protected_routes())
        .merge(deployments::protected_routes())
        .merge(inference::protected_routes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(to_custom_error_code("bad_request"), 1001);
        assert_eq!(to_custom_error_code("forbidden"), 1006);
        assert_eq!(to_custom_error_code("validation_failed"), 1010);
        assert_eq!(to_custom_error_code("inference_failed"), 1202);
        assert_eq!(to_custom_error_code("something_else"), 1999);
    }

    #[test]
    fn conflicts_map_to_409() {
        let resp = storage_failure("t", StorageError::Conflict("dup".into()), "ctx");
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let resp = storage_failure(
            "t",
            StorageError::NotFound {
                entity: "post",
                id: "1".into(),
            },
            "ctx",
        );
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let resp = storage_failure("t", StorageError::Other("boom".into()), "ctx");
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
