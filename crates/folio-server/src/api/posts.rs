use crate::api::pagination::{non_empty, PageQuery};
use crate::api::{
    error_response_with_data, not_found, storage_failure, success_empty_response,
    success_response, validation_response, ApiError, ApiResult,
};
use crate::auth::CurrentUser;
use crate::logging::TraceId;
use crate::media::{self, MultipartForm};
use crate::state::AppState;
use axum::extract::{Extension, Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use folio_common::forms::{CommentForm, PostDraft, PostForm};
use folio_common::paging::{self, Page};
use folio_common::text;
use folio_common::types::{Comment, Post, PostImage, Tag};
use folio_common::validation::{FieldErrors, IMAGE_EXTENSIONS};
use folio_storage::PostFilter;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::{router::OpenApiRouter, routes};

const FEATURED_POSTS: u64 = 3;

/// One page of posts matching `filter`.
pub(crate) async fn post_page(
    state: &AppState,
    trace_id: &str,
    filter: &PostFilter,
    page: &PageQuery,
    page_size: u64,
) -> Result<Page<Post>, Response> {
    let total = state
        .store
        .count_posts(filter)
        .await
        .map_err(|e| storage_failure(trace_id, e, "Failed to count posts"))?;
    let window = page.window(total, page_size);
    let items = state
        .store
        .list_posts(filter, window.limit(), window.offset())
        .await
        .map_err(|e| storage_failure(trace_id, e, "Failed to list posts"))?;
    Ok(window.into_page(items))
}

/// The caller's own post, in any status. Other authors' posts are reported
/// as missing.
async fn own_post(state: &AppState, trace_id: &str, slug: &str, user: &CurrentUser) -> Result<Post, Response> {
    state
        .store
        .get_post_for_author(slug, &user.0.id)
        .await
        .map_err(|e| storage_failure(trace_id, e, "Failed to load post"))?
        .ok_or_else(|| not_found(trace_id, "Post"))
}

async fn published_post(state: &AppState, trace_id: &str, slug: &str) -> Result<Post, Response> {
    state
        .store
        .get_published_post_by_slug(slug)
        .await
        .map_err(|e| storage_failure(trace_id, e, "Failed to load post"))?
        .ok_or_else(|| not_found(trace_id, "Post"))
}

/// Validate the form and check that every tag id exists.
async fn post_draft(state: &AppState, trace_id: &str, form: &PostForm) -> Result<PostDraft, Response> {
    let mut errors = FieldErrors::new();
    let draft = match form.validate() {
        Ok(draft) => Some(draft),
        Err(e) => {
            errors.merge(e);
            None
        }
    };
    let mut wanted = form.tags.clone();
    wanted.sort();
    wanted.dedup();
    if !wanted.is_empty() {
        let found: Vec<Tag> = state
            .store
            .get_tags_by_ids(&wanted)
            .await
            .map_err(|e| storage_failure(trace_id, e, "Failed to load tags"))?;
        for id in wanted.iter().filter(|id| !found.iter().any(|t| &&t.id == id)) {
            errors.add("tags", format!("Select a valid choice. {id} is not one of the available choices."));
        }
    }
    match draft {
        Some(draft) if errors.is_empty() => Ok(draft),
        _ => Err(validation_response(trace_id, errors)),
    }
}

#[derive(Serialize, ToSchema)]
struct HomeResponse {
    posts: Page<Post>,
    /// Up to three published posts with a featured image
    featured_posts: Vec<Post>,
}

/// Published posts, newest first, with the featured strip.
#[utoipa::path(
    get,
    path = "/v1/home",
    tag = "Blog",
    params(PageQuery),
    responses(
        (status = 200, description = "Home page", body = HomeResponse)
    )
)]
async fn home(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> ApiResult {
    let posts = post_page(&state, &trace_id, &PostFilter::published(), &page, paging::HOME_PAGE_SIZE).await?;
    let featured_filter = PostFilter {
        has_featured_image: Some(true),
        ..PostFilter::published()
    };
    let featured_posts = state
        .store
        .list_posts(&featured_filter, FEATURED_POSTS, 0)
        .await
        .map_err(|e| storage_failure(&trace_id, e, "Failed to list featured posts"))?;
    Ok(success_response(
        StatusCode::OK,
        &trace_id,
        HomeResponse {
            posts,
            featured_posts,
        },
    ))
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
struct PostListQuery {
    /// Case-insensitive match on title, body or tag name
    #[param(required = false)]
    search: Option<String>,
    /// Tag slug
    #[param(required = false)]
    tag: Option<String>,
    #[param(required = false)]
    page: Option<String>,
}

#[derive(Serialize, ToSchema)]
struct PostListResponse {
    posts: Page<Post>,
    all_tags: Vec<Tag>,
    current_tag: Option<String>,
    search: Option<String>,
}

/// Published posts with optional search and tag filter.
#[utoipa::path(
    get,
    path = "/v1/posts",
    tag = "Blog",
    params(PostListQuery),
    responses(
        (status = 200, description = "Posts", body = PostListResponse)
    )
)]
async fn list_posts(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(query): Query<PostListQuery>,
) -> ApiResult {
    let search = non_empty(&query.search);
    let current_tag = non_empty(&query.tag);
    let filter = PostFilter {
        search: search.clone(),
        tag_slug: current_tag.clone(),
        ..PostFilter::published()
    };
    let page = PageQuery { page: query.page };
    let posts = post_page(&state, &trace_id, &filter, &page, paging::POST_LIST_PAGE_SIZE).await?;
    let all_tags = state
        .store
        .list_tags()
        .await
        .map_err(|e| storage_failure(&trace_id, e, "Failed to list tags"))?;
    Ok(success_response(
        StatusCode::OK,
        &trace_id,
        PostListResponse {
            posts,
            all_tags,
            current_tag,
            search,
        },
    ))
}

#[derive(Serialize, ToSchema)]
struct OurWorkResponse {
    title: String,
    description: String,
    posts: Page<Post>,
}

/// Published posts carrying any tag whose name contains "our".
#[utoipa::path(
    get,
    path = "/v1/posts/our-work",
    tag = "Blog",
    params(PageQuery),
    responses(
        (status = 200, description = "Our work showcase", body = OurWorkResponse)
    )
)]
async fn our_work(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> ApiResult {
    let filter = PostFilter {
        tag_name_contains: Some("our".to_string()),
        ..PostFilter::published()
    };
    let posts = post_page(&state, &trace_id, &filter, &page, paging::OUR_WORK_PAGE_SIZE).await?;
    Ok(success_response(
        StatusCode::OK,
        &trace_id,
        OurWorkResponse {
            title: "Our Work".to_string(),
            description: "Showcasing our team's projects, research, and achievements".to_string(),
            posts,
        },
    ))
}

#[derive(Serialize, ToSchema)]
struct PostDetailResponse {
    post: Post,
    /// Body rendered from markdown
    body_html: String,
    images: Vec<PostImage>,
    /// Approved comments, newest first
    comments: Vec<Comment>,
}

/// A published post. Each call counts as one view.
#[utoipa::path(
    get,
    path = "/v1/posts/{slug}",
    tag = "Blog",
    params(("slug" = String, Path, description = "Post slug")),
    responses(
        (status = 200, description = "Post", body = PostDetailResponse),
        (status = 404, description = "No published post with this slug", body = ApiError)
    )
)]
async fn post_detail(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult {
    let mut post = published_post(&state, &trace_id, &slug).await?;
    state
        .store
        .increment_post_views(&post.id)
        .await
        .map_err(|e| storage_failure(&trace_id, e, "Failed to count view"))?;
    post.views += 1;

    let images = state
        .store
        .list_post_images(&post.id)
        .await
        .map_err(|e| storage_failure(&trace_id, e, "Failed to list images"))?;
    let comments = state
        .store
        .list_approved_comments(&post.id)
        .await
        .map_err(|e| storage_failure(&trace_id, e, "Failed to list comments"))?;
    Ok(success_response(
        StatusCode::OK,
        &trace_id,
        PostDetailResponse {
            body_html: text::render_markdown(&post.body),
            post,
            images,
            comments,
        },
    ))
}

/// Create a post authored by the caller.
#[utoipa::path(
    post,
    path = "/v1/posts",
    tag = "Blog",
    security(("bearer_auth" = [])),
    request_body = PostForm,
    responses(
        (status = 201, description = "Created", body = Post),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 401, description = "Unauthenticated", body = ApiError)
    )
)]
async fn create_post(
    Extension(trace_id): Extension<TraceId>,
    Extension(user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Json(form): Json<PostForm>,
) -> ApiResult {
    let draft = post_draft(&state, &trace_id, &form).await?;
    let post = state
        .store
        .create_post(&user.0.id, &draft)
        .await
        .map_err(|e| storage_failure(&trace_id, e, "Failed to create post"))?;
    Ok(success_response(StatusCode::CREATED, &trace_id, post))
}

/// The caller's post in any status, for editing.
#[utoipa::path(
    get,
    path = "/v1/posts/{slug}/edit",
    tag = "Blog",
    security(("bearer_auth" = [])),
    params(("slug" = String, Path, description = "Post slug")),
    responses(
        (status = 200, description = "Post", body = Post),
        (status = 404, description = "Not the caller's post", body = ApiError)
    )
)]
async fn edit_post(
    Extension(trace_id): Extension<TraceId>,
    Extension(user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult {
    let post = own_post(&state, &trace_id, &slug, &user).await?;
    Ok(success_response(StatusCode::OK, &trace_id, post))
}

/// Replace a post's title, body, excerpt, status and tags. The slug is kept.
#[utoipa::path(
    put,
    path = "/v1/posts/{slug}",
    tag = "Blog",
    security(("bearer_auth" = [])),
    params(("slug" = String, Path, description = "Post slug")),
    request_body = PostForm,
    responses(
        (status = 200, description = "Updated", body = Post),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 404, description = "Not the caller's post", body = ApiError)
    )
)]
async fn update_post(
    Extension(trace_id): Extension<TraceId>,
    Extension(user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(form): Json<PostForm>,
) -> ApiResult {
    let post = own_post(&state, &trace_id, &slug, &user).await?;
    let draft = post_draft(&state, &trace_id, &form).await?;
    let updated = state
        .store
        .update_post(&post.id, &draft)
        .await
        .map_err(|e| storage_failure(&trace_id, e, "Failed to update post"))?
        .ok_or_else(|| not_found(&trace_id, "Post"))?;
    Ok(success_response(StatusCode::OK, &trace_id, updated))
}

/// Delete a post with its tag links, comments and images.
#[utoipa::path(
    delete,
    path = "/v1/posts/{slug}",
    tag = "Blog",
    security(("bearer_auth" = [])),
    params(("slug" = String, Path, description = "Post slug")),
    responses(
        (status = 200, description = "Deleted"),
        (status = 404, description = "Not the caller's post", body = ApiError)
    )
)]
async fn delete_post(
    Extension(trace_id): Extension<TraceId>,
    Extension(user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult {
    let post = own_post(&state, &trace_id, &slug, &user).await?;
    state
        .store
        .delete_post(&post.id)
        .await
        .map_err(|e| storage_failure(&trace_id, e, "Failed to delete post"))?;
    tracing::info!(slug = %post.slug, "Post deleted");
    Ok(success_empty_response(StatusCode::OK, &trace_id, "post deleted"))
}

/// Comment on a published post. Comments are visible immediately.
#[utoipa::path(
    post,
    path = "/v1/posts/{slug}/comments",
    tag = "Blog",
    security(("bearer_auth" = [])),
    params(("slug" = String, Path, description = "Post slug")),
    request_body = CommentForm,
    responses(
        (status = 201, description = "Created", body = Comment),
        (status = 400, description = "Empty comment", body = ApiError),
        (status = 404, description = "No published post with this slug", body = ApiError)
    )
)]
async fn create_comment(
    Extension(trace_id): Extension<TraceId>,
    Extension(user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(form): Json<CommentForm>,
) -> ApiResult {
    let post = published_post(&state, &trace_id, &slug).await?;
    let content = form
        .validate()
        .map_err(|errors| validation_response(&trace_id, errors))?;
    let comment = state
        .store
        .create_comment(&post.id, &user.0.id, &content)
        .await
        .map_err(|e| storage_failure(&trace_id, e, "Failed to create comment"))?;
    Ok(success_response(StatusCode::CREATED, &trace_id, comment))
}

#[derive(Serialize, ToSchema)]
struct ImageUploadResponse {
    success: bool,
    image: Option<PostImage>,
}

/// Attach an image to the caller's post (multipart `image`, optional `alt_text`).
#[utoipa::path(
    post,
    path = "/v1/posts/{slug}/images",
    tag = "Blog",
    security(("bearer_auth" = [])),
    params(("slug" = String, Path, description = "Post slug")),
    responses(
        (status = 201, description = "Stored", body = ImageUploadResponse),
        (status = 400, description = "Missing or invalid image", body = ApiError),
        (status = 404, description = "Not the caller's post", body = ApiError)
    )
)]
async fn upload_image(
    Extension(trace_id): Extension<TraceId>,
    Extension(user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(slug): Path<String>,
    multipart: Multipart,
) -> ApiResult {
    let post = own_post(&state, &trace_id, &slug, &user).await?;
    let form = read_form(&trace_id, multipart).await?;
    let Some(upload) = form.files.get("image") else {
        return Err(error_response_with_data(
            StatusCode::BAD_REQUEST,
            &trace_id,
            "bad_request",
            "image file is required",
            Some(ImageUploadResponse {
                success: false,
                image: None,
            }),
        ));
    };

    let mut errors = FieldErrors::new();
    let alt_text = form.field("alt_text").unwrap_or_default().trim().to_string();
    folio_common::validation::check_len(&mut errors, "alt_text", &alt_text, 200);
    let ext = media::check_upload(&mut errors, "image", upload, IMAGE_EXTENSIONS, state.config.media.max_image_bytes);
    let Some(ext) = ext.filter(|_| errors.is_empty()) else {
        return Err(validation_response(&trace_id, errors));
    };

    let path = media::save_upload(&state.media_root, media::POST_CONTENT_DIR, upload, &ext)
        .await
        .map_err(|e| storage_failure(&trace_id, e.into(), "Failed to store image"))?;
    let image = state
        .store
        .create_post_image(&post.id, &path, &alt_text)
        .await
        .map_err(|e| storage_failure(&trace_id, e, "Failed to record image"))?;
    Ok(success_response(
        StatusCode::CREATED,
        &trace_id,
        ImageUploadResponse {
            success: true,
            image: Some(image),
        },
    ))
}

/// Replace the featured image of the caller's post (multipart `image`).
#[utoipa::path(
    put,
    path = "/v1/posts/{slug}/featured-image",
    tag = "Blog",
    security(("bearer_auth" = [])),
    params(("slug" = String, Path, description = "Post slug")),
    responses(
        (status = 200, description = "Updated", body = Post),
        (status = 400, description = "Missing or invalid image", body = ApiError),
        (status = 404, description = "Not the caller's post", body = ApiError)
    )
)]
async fn set_featured_image(
    Extension(trace_id): Extension<TraceId>,
    Extension(user): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(slug): Path<String>,
    multipart: Multipart,
) -> ApiResult {
    let post = own_post(&state, &trace_id, &slug, &user).await?;
    let form = read_form(&trace_id, multipart).await?;
    let mut errors = FieldErrors::new();
    let Some(upload) = form.files.get("image") else {
        errors.add("image", "This field is required.");
        return Err(validation_response(&trace_id, errors));
    };
    let ext = media::check_upload(&mut errors, "image", upload, IMAGE_EXTENSIONS, state.config.media.max_image_bytes);
    let Some(ext) = ext.filter(|_| errors.is_empty()) else {
        return Err(validation_response(&trace_id, errors));
    };

    let path = media::save_upload(&state.media_root, media::POST_FEATURED_DIR, upload, &ext)
        .await
        .map_err(|e| storage_failure(&trace_id, e.into(), "Failed to store image"))?;
    let updated = state
        .store
        .set_featured_image(&post.id, &path)
        .await
        .map_err(|e| storage_failure(&trace_id, e, "Failed to update post"))?
        .ok_or_else(|| not_found(&trace_id, "Post"))?;
    Ok(success_response(StatusCode::OK, &trace_id, updated))
}

pub(crate) async fn read_form(trace_id: &str, multipart: Multipart) -> Result<MultipartForm, Response> {
    MultipartForm::read(multipart).await.map_err(|e| {
        tracing::warn!(trace_id = %trace_id, error = %e, "Malformed multipart body");
        crate::api::error_response(StatusCode::BAD_REQUEST, trace_id, "bad_request", "malformed multipart body")
    })
}

pub fn public_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(home))
        .routes(routes!(list_posts))
        .routes(routes!(our_work))
        .routes(routes!(post_detail))
}

pub fn protected_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(create_post))
        .routes(routes!(edit_post))
        .routes(routes!(update_post, delete_post))
        .routes(routes!(create_comment))
        .routes(routes!(upload_image))
        .routes(routes!(set_featured_image))
}
