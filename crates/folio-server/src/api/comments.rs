use crate::api::{forbidden, not_found, storage_failure, success_response, ApiError, ApiResult};
use crate::auth::CurrentUser;
use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::Json;
use folio_common::forms::CommentApprovalRequest;
use folio_common::types::Comment;
use utoipa_axum::{router::OpenApiRouter, routes};

/// Approve or hide a comment. Staff only.
#[utoipa::path(
    put,
    path = "/v1/comments/{id}/approval",
    tag = "Blog",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Comment id")),
    request_body = CommentApprovalRequest,
    responses(
        (status = 200, description = "Updated", body = Comment),
        (status = 403, description = "Caller is not staff", body = ApiError),
        (status = 404, description = "Unknown comment", body = ApiError)
    )
)]
async fn set_approval(
    Extension(trace_id): Extension<TraceId>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<CommentApprovalRequest>,
) -> ApiResult {
    if !user.is_staff {
        return Err(forbidden(&trace_id, "only staff can moderate comments"));
    }
    let comment = state
        .store
        .set_comment_approval(&id, req.is_approved)
        .await
        .map_err(|e| storage_failure(&trace_id, e, "Failed to moderate comment"))?
        .ok_or_else(|| not_found(&trace_id, "Comment"))?;
    tracing::info!(comment_id = %comment.id, approved = comment.is_approved, moderator = %user.username, "Comment moderated");
    Ok(success_response(StatusCode::OK, &trace_id, comment))
}

pub fn protected_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(set_approval))
}
