use crate::api::pagination::PageQuery;
use crate::api::posts::post_page;
use crate::api::{not_found, storage_failure, success_response, validation_response, ApiError, ApiResult};
use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use folio_common::forms::TagForm;
use folio_common::paging::{self, Page};
use folio_common::types::{Post, Tag};
use folio_storage::PostFilter;
use serde::Serialize;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

/// All tags, by name.
#[utoipa::path(
    get,
    path = "/v1/tags",
    tag = "Blog",
    responses(
        (status = 200, description = "Tags", body = Vec<Tag>)
    )
)]
async fn list_tags(Extension(trace_id): Extension<TraceId>, State(state): State<AppState>) -> ApiResult {
    let tags = state
        .store
        .list_tags()
        .await
        .map_err(|e| storage_failure(&trace_id, e, "Failed to list tags"))?;
    Ok(success_response(StatusCode::OK, &trace_id, tags))
}

/// Create a tag. Names are unique.
#[utoipa::path(
    post,
    path = "/v1/tags",
    tag = "Blog",
    security(("bearer_auth" = [])),
    request_body = TagForm,
    responses(
        (status = 201, description = "Created", body = Tag),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 409, description = "Name already taken", body = ApiError)
    )
)]
async fn create_tag(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Json(form): Json<TagForm>,
) -> ApiResult {
    let draft = form
        .validate()
        .map_err(|errors| validation_response(&trace_id, errors))?;
    let tag = state
        .store
        .create_tag(&draft)
        .await
        .map_err(|e| storage_failure(&trace_id, e, "Failed to create tag"))?;
    Ok(success_response(StatusCode::CREATED, &trace_id, tag))
}

#[derive(Serialize, ToSchema)]
struct TagPostsResponse {
    tag: Tag,
    posts: Page<Post>,
}

/// Published posts carrying one tag.
#[utoipa::path(
    get,
    path = "/v1/tags/{slug}/posts",
    tag = "Blog",
    params(("slug" = String, Path, description = "Tag slug"), PageQuery),
    responses(
        (status = 200, description = "Tagged posts", body = TagPostsResponse),
        (status = 404, description = "Unknown tag", body = ApiError)
    )
)]
async fn tag_posts(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(page): Query<PageQuery>,
) -> ApiResult {
    let tag = state
        .store
        .get_tag_by_slug(&slug)
        .await
        .map_err(|e| storage_failure(&trace_id, e, "Failed to load tag"))?
        .ok_or_else(|| not_found(&trace_id, "Tag"))?;
    let filter = PostFilter {
        tag_slug: Some(tag.slug.clone()),
        ..PostFilter::published()
    };
    let posts = post_page(&state, &trace_id, &filter, &page, paging::TAG_POSTS_PAGE_SIZE).await?;
    Ok(success_response(StatusCode::OK, &trace_id, TagPostsResponse { tag, posts }))
}

pub fn public_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(list_tags))
        .routes(routes!(tag_posts))
}

pub fn protected_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(create_tag))
}
