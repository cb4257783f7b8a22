use crate::api::pagination::PageQuery;
use crate::api::posts::post_page;
use crate::api::{not_found, storage_failure, success_response, ApiError, ApiResult};
use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use folio_common::paging::{self, Page};
use folio_common::types::{Post, User};
use folio_storage::PostFilter;
use serde::Serialize;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

#[derive(Serialize, ToSchema)]
struct ProfileResponse {
    user: User,
    posts: Page<Post>,
    /// Published posts by this user
    total_posts: u64,
}

/// A user's published posts.
#[utoipa::path(
    get,
    path = "/v1/users/{username}/posts",
    tag = "Blog",
    params(("username" = String, Path, description = "Username"), PageQuery),
    responses(
        (status = 200, description = "Profile", body = ProfileResponse),
        (status = 404, description = "Unknown user", body = ApiError)
    )
)]
async fn user_posts(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(page): Query<PageQuery>,
) -> ApiResult {
    let user = state
        .store
        .get_user_by_username(&username)
        .await
        .map_err(|e| storage_failure(&trace_id, e, "Failed to load user"))?
        .ok_or_else(|| not_found(&trace_id, "User"))?;
    let filter = PostFilter {
        author_id: Some(user.id.clone()),
        ..PostFilter::published()
    };
    let posts = post_page(&state, &trace_id, &filter, &page, paging::PROFILE_PAGE_SIZE).await?;
    Ok(success_response(
        StatusCode::OK,
        &trace_id,
        ProfileResponse {
            total_posts: posts.total,
            user,
            posts,
        },
    ))
}

pub fn public_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(user_posts))
}
