use crate::api::pagination::{non_empty, PageQuery};
use crate::api::posts::read_form;
use crate::api::{
    forbidden, not_found, storage_failure, success_response, validation_response, ApiError, ApiResult,
};
use crate::auth::CurrentUser;
use crate::logging::TraceId;
use crate::media;
use crate::state::AppState;
use axum::extract::{Extension, Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use folio_common::forms::{AIModelForm, ModelDraft, ModelStatusRequest, TeamRequest};
use folio_common::paging::{self, Page, PageWindow};
use folio_common::types::{AIModel, AIModelCategory, InferenceRequest, ModelType, ModelUsageLog, User};
use folio_common::validation::{
    FieldErrors, CONFIG_FILE_EXTENSIONS, CONFIG_FILE_MAX_BYTES, MODEL_FILE_EXTENSIONS, MODEL_FILE_MAX_BYTES,
};
use folio_storage::ModelFilter;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::{router::OpenApiRouter, routes};

const RECENT_INFERENCES: u64 = 10;

/// Any model by slug, regardless of visibility.
pub(crate) async fn model_by_slug(state: &AppState, trace_id: &str, slug: &str) -> Result<AIModel, Response> {
    state
        .store
        .get_model_by_slug(slug)
        .await
        .map_err(|e| storage_failure(trace_id, e, "Failed to load model"))?
        .ok_or_else(|| not_found(trace_id, "Model"))
}

/// A model the caller may edit; 403 for anyone outside creator, team and staff.
pub(crate) async fn editable_model(
    state: &AppState,
    trace_id: &str,
    slug: &str,
    user: &User,
) -> Result<AIModel, Response> {
    let model = model_by_slug(state, trace_id, slug).await?;
    if !model.can_edit(user) {
        return Err(forbidden(trace_id, "you do not have permission to edit this model"));
    }
    Ok(model)
}

async fn model_page(
    state: &AppState,
    trace_id: &str,
    filter: &ModelFilter,
    page: &PageQuery,
    page_size: u64,
) -> Result<Page<AIModel>, Response> {
    let total = state
        .store
        .count_models(filter)
        .await
        .map_err(|e| storage_failure(trace_id, e, "Failed to count models"))?;
    let window = page.window(total, page_size);
    let items = state
        .store
        .list_models(filter, window.limit(), window.offset())
        .await
        .map_err(|e| storage_failure(trace_id, e, "Failed to list models"))?;
    Ok(window.into_page(items))
}

async fn model_draft(state: &AppState, trace_id: &str, form: &AIModelForm) -> Result<ModelDraft, Response> {
    let (draft, mut errors) = match form.validate() {
        Ok(draft) => (Some(draft), FieldErrors::new()),
        Err(errors) => (None, errors),
    };
    if let Some(category_id) = non_empty(&form.category) {
        let known = state
            .store
            .get_category_by_id(&category_id)
            .await
            .map_err(|e| storage_failure(trace_id, e, "Failed to load category"))?;
        if known.is_none() {
            errors.add(
                "category",
                format!("Select a valid choice. {category_id} is not one of the available choices."),
            );
        }
    }
    match draft {
        Some(draft) if errors.is_empty() => Ok(draft),
        _ => Err(validation_response(trace_id, errors)),
    }
}

#[derive(Serialize, ToSchema)]
struct ModelTypeOption {
    value: ModelType,
    label: String,
}

fn model_type_options() -> Vec<ModelTypeOption> {
    ModelType::ALL
        .iter()
        .map(|t| ModelTypeOption {
            value: *t,
            label: t.label().to_string(),
        })
        .collect()
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
struct ModelListQuery {
    /// Category slug
    #[param(required = false)]
    category: Option<String>,
    /// Model type value, e.g. `summarization`
    #[param(required = false)]
    #[serde(rename = "type")]
    model_type: Option<String>,
    /// Case-insensitive match on name or description
    #[param(required = false)]
    search: Option<String>,
    #[param(required = false)]
    page: Option<String>,
}

#[derive(Serialize, ToSchema)]
struct ModelListResponse {
    models: Page<AIModel>,
    categories: Vec<AIModelCategory>,
    model_types: Vec<ModelTypeOption>,
    current_category: Option<String>,
    current_type: Option<String>,
    search: Option<String>,
}

/// Public models in `ready` status.
#[utoipa::path(
    get,
    path = "/v1/ai-models",
    tag = "AI Models",
    params(ModelListQuery),
    responses(
        (status = 200, description = "Models", body = ModelListResponse)
    )
)]
async fn list_models(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(query): Query<ModelListQuery>,
) -> ApiResult {
    let current_category = non_empty(&query.category);
    let current_type = non_empty(&query.model_type);
    let search = non_empty(&query.search);
    let page = PageQuery { page: query.page };

    // An unknown type matches nothing rather than being ignored.
    let models = match current_type.as_deref().map(str::parse::<ModelType>) {
        Some(Err(_)) => PageWindow::resolve(page.page.as_deref(), 0, paging::MODEL_LIST_PAGE_SIZE)
            .into_page(Vec::new()),
        parsed => {
            let filter = ModelFilter {
                category_slug: current_category.clone(),
                model_type: parsed.and_then(Result::ok),
                search: search.clone(),
                ..ModelFilter::visible()
            };
            model_page(&state, &trace_id, &filter, &page, paging::MODEL_LIST_PAGE_SIZE).await?
        }
    };
    let categories = state
        .store
        .list_categories()
        .await
        .map_err(|e| storage_failure(&trace_id, e, "Failed to list categories"))?;
    Ok(success_response(
        StatusCode::OK,
        &trace_id,
        ModelListResponse {
            models,
            categories,
            model_types: model_type_options(),
            current_category,
            current_type,
            search,
        },
    ))
}

/// Every model type with its display label.
#[utoipa::path(
    get,
    path = "/v1/ai-models/types",
    tag = "AI Models",
    responses(
        (status = 200, description = "Model types", body = Vec<ModelTypeOption>)
    )
)]
async fn model_types(Extension(trace_id): Extension<TraceId>) -> ApiResult {
    Ok(success_response(StatusCode::OK, &trace_id, model_type_options()))
}

#[derive(Serialize, ToSchema)]
struct ModelDetailResponse {
    model: AIModel,
    /// Newest first
    recent_inferences: Vec<InferenceRequest>,
}

#[utoipa::path(
    get,
    path = "/v1/ai-models/{slug}",
    tag = "AI Models",
    params(("slug" = String, Path, description = "Model slug")),
    responses(
        (status = 200, description = "Model", body = ModelDetailResponse),
        (status = 404, description = "No public model with this slug", body = ApiError)
    )
)]
async fn model_detail(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult {
    let model = model_by_slug(&state, &trace_id, &slug).await?;
    if !model.is_public {
        return Err(not_found(&trace_id, "Model"));
    }
    let recent_inferences = state
        .store
        .list_recent_inferences(&model.id, RECENT_INFERENCES)
        .await
        .map_err(|e| storage_failure(&trace_id, e, "Failed to list inferences"))?;
    Ok(success_response(
        StatusCode::OK,
        &trace_id,
        ModelDetailResponse {
            model,
            recent_inferences,
        },
    ))
}

/// Register a model in `training` status; the caller joins its team.
#[utoipa::path(
    post,
    path = "/v1/ai-models",
    tag = "AI Models",
    security(("bearer_auth" = [])),
    request_body = AIModelForm,
    responses(
        (status = 201, description = "Created", body = AIModel),
        (status = 400, description = "Validation failed", body = ApiError)
    )
)]
async fn create_model(
    Extension(trace_id): Extension<TraceId>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    State(state): State<AppState>,
    Json(form): Json<AIModelForm>,
) -> ApiResult {
    let draft = model_draft(&state, &trace_id, &form).await?;
    let model = state
        .store
        .create_model(&user.id, &draft)
        .await
        .map_err(|e| storage_failure(&trace_id, e, "Failed to create model"))?;
    Ok(success_response(StatusCode::CREATED, &trace_id, model))
}

#[utoipa::path(
    put,
    path = "/v1/ai-models/{slug}",
    tag = "AI Models",
    security(("bearer_auth" = [])),
    params(("slug" = String, Path, description = "Model slug")),
    request_body = AIModelForm,
    responses(
        (status = 200, description = "Updated", body = AIModel),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 403, description = "Caller may not edit this model", body = ApiError),
        (status = 404, description = "Unknown model", body = ApiError)
    )
)]
async fn update_model(
    Extension(trace_id): Extension<TraceId>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(form): Json<AIModelForm>,
) -> ApiResult {
    let model = editable_model(&state, &trace_id, &slug, &user).await?;
    let draft = model_draft(&state, &trace_id, &form).await?;
    let updated = state
        .store
        .update_model(&model.id, &draft)
        .await
        .map_err(|e| storage_failure(&trace_id, e, "Failed to update model"))?
        .ok_or_else(|| not_found(&trace_id, "Model"))?;
    Ok(success_response(StatusCode::OK, &trace_id, updated))
}

/// Move a model through its lifecycle. Staff only.
#[utoipa::path(
    put,
    path = "/v1/ai-models/{slug}/status",
    tag = "AI Models",
    security(("bearer_auth" = [])),
    params(("slug" = String, Path, description = "Model slug")),
    request_body = ModelStatusRequest,
    responses(
        (status = 200, description = "Updated", body = AIModel),
        (status = 403, description = "Caller is not staff", body = ApiError),
        (status = 404, description = "Unknown model", body = ApiError)
    )
)]
async fn set_status(
    Extension(trace_id): Extension<TraceId>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(req): Json<ModelStatusRequest>,
) -> ApiResult {
    if !user.is_staff {
        return Err(forbidden(&trace_id, "only staff can change model status"));
    }
    let model = model_by_slug(&state, &trace_id, &slug).await?;
    let updated = state
        .store
        .set_model_status(&model.id, req.status, req.last_trained)
        .await
        .map_err(|e| storage_failure(&trace_id, e, "Failed to update model status"))?
        .ok_or_else(|| not_found(&trace_id, "Model"))?;
    tracing::info!(slug = %updated.slug, from = %model.status, to = %updated.status, "Model status changed");
    Ok(success_response(StatusCode::OK, &trace_id, updated))
}

/// Replace the team. The creator always stays on it.
#[utoipa::path(
    put,
    path = "/v1/ai-models/{slug}/team",
    tag = "AI Models",
    security(("bearer_auth" = [])),
    params(("slug" = String, Path, description = "Model slug")),
    request_body = TeamRequest,
    responses(
        (status = 200, description = "Updated", body = AIModel),
        (status = 400, description = "Unknown usernames", body = ApiError),
        (status = 403, description = "Caller is neither creator nor staff", body = ApiError),
        (status = 404, description = "Unknown model", body = ApiError)
    )
)]
async fn set_team(
    Extension(trace_id): Extension<TraceId>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(req): Json<TeamRequest>,
) -> ApiResult {
    let model = model_by_slug(&state, &trace_id, &slug).await?;
    if model.created_by != user.id && !user.is_staff {
        return Err(forbidden(&trace_id, "only the creator can change the team"));
    }

    let mut usernames: Vec<String> = req
        .usernames
        .iter()
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .collect();
    usernames.sort();
    usernames.dedup();
    let members = state
        .store
        .get_users_by_usernames(&usernames)
        .await
        .map_err(|e| storage_failure(&trace_id, e, "Failed to load users"))?;

    let mut errors = FieldErrors::new();
    for name in usernames.iter().filter(|n| !members.iter().any(|m| &&m.username == n)) {
        errors.add("usernames", format!("Unknown user {name}."));
    }
    if !errors.is_empty() {
        return Err(validation_response(&trace_id, errors));
    }

    let mut ids = vec![model.created_by.clone()];
    for member in members {
        if !ids.contains(&member.id) {
            ids.push(member.id);
        }
    }
    let updated = state
        .store
        .set_model_team(&model.id, &ids)
        .await
        .map_err(|e| storage_failure(&trace_id, e, "Failed to update team"))?
        .ok_or_else(|| not_found(&trace_id, "Model"))?;
    Ok(success_response(StatusCode::OK, &trace_id, updated))
}

/// Upload the weights (`model_file`) and/or config (`config_file`).
#[utoipa::path(
    put,
    path = "/v1/ai-models/{slug}/files",
    tag = "AI Models",
    security(("bearer_auth" = [])),
    params(("slug" = String, Path, description = "Model slug")),
    responses(
        (status = 200, description = "Stored", body = AIModel),
        (status = 400, description = "Missing or invalid files", body = ApiError),
        (status = 403, description = "Caller may not edit this model", body = ApiError)
    )
)]
async fn upload_files(
    Extension(trace_id): Extension<TraceId>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(slug): Path<String>,
    multipart: Multipart,
) -> ApiResult {
    let model = editable_model(&state, &trace_id, &slug, &user).await?;
    let form = read_form(&trace_id, multipart).await?;
    let model_upload = form.files.get("model_file");
    let config_upload = form.files.get("config_file");

    let mut errors = FieldErrors::new();
    if model_upload.is_none() && config_upload.is_none() {
        errors.add("model_file", "Upload a model file, a config file or both.");
        return Err(validation_response(&trace_id, errors));
    }
    let model_ext = model_upload.and_then(|u| {
        media::check_upload(&mut errors, "model_file", u, MODEL_FILE_EXTENSIONS, MODEL_FILE_MAX_BYTES)
    });
    let config_ext = config_upload.and_then(|u| {
        media::check_upload(&mut errors, "config_file", u, CONFIG_FILE_EXTENSIONS, CONFIG_FILE_MAX_BYTES)
    });
    if !errors.is_empty() {
        return Err(validation_response(&trace_id, errors));
    }

    let mut model_path = None;
    if let (Some(upload), Some(ext)) = (model_upload, model_ext) {
        let path = media::save_upload(&state.media_root, media::MODEL_FILE_DIR, upload, &ext)
            .await
            .map_err(|e| storage_failure(&trace_id, e.into(), "Failed to store model file"))?;
        model_path = Some(path);
    }
    let mut config_path = None;
    if let (Some(upload), Some(ext)) = (config_upload, config_ext) {
        let path = media::save_upload(&state.media_root, media::MODEL_CONFIG_DIR, upload, &ext)
            .await
            .map_err(|e| storage_failure(&trace_id, e.into(), "Failed to store config file"))?;
        config_path = Some(path);
    }

    let updated = state
        .store
        .set_model_files(&model.id, model_path.as_deref(), config_path.as_deref())
        .await
        .map_err(|e| storage_failure(&trace_id, e, "Failed to update model"))?
        .ok_or_else(|| not_found(&trace_id, "Model"))?;
    Ok(success_response(StatusCode::OK, &trace_id, updated))
}

/// The caller's models in any status.
#[utoipa::path(
    get,
    path = "/v1/ai-models/mine",
    tag = "AI Models",
    security(("bearer_auth" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "Models", body = Page<AIModel>)
    )
)]
async fn my_models(
    Extension(trace_id): Extension<TraceId>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> ApiResult {
    let filter = ModelFilter {
        created_by: Some(user.id.clone()),
        ..Default::default()
    };
    let models = model_page(&state, &trace_id, &filter, &page, paging::MY_MODELS_PAGE_SIZE).await?;
    Ok(success_response(StatusCode::OK, &trace_id, models))
}

#[derive(Serialize, ToSchema)]
struct DashboardResponse {
    models: Page<AIModel>,
    total_models: u64,
    public_models: u64,
    ready_models: u64,
}

/// The caller's models with per-owner counters.
#[utoipa::path(
    get,
    path = "/v1/ai-models/dashboard",
    tag = "AI Models",
    security(("bearer_auth" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "Dashboard", body = DashboardResponse)
    )
)]
async fn dashboard(
    Extension(trace_id): Extension<TraceId>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> ApiResult {
    let filter = ModelFilter {
        created_by: Some(user.id.clone()),
        ..Default::default()
    };
    let models = model_page(&state, &trace_id, &filter, &page, paging::DASHBOARD_PAGE_SIZE).await?;
    let stats = state
        .store
        .model_stats(&user.id)
        .await
        .map_err(|e| storage_failure(&trace_id, e, "Failed to compute model stats"))?;
    Ok(success_response(
        StatusCode::OK,
        &trace_id,
        DashboardResponse {
            models,
            total_models: stats.total_models,
            public_models: stats.public_models,
            ready_models: stats.ready_models,
        },
    ))
}

/// Inference calls recorded against a model, newest first.
#[utoipa::path(
    get,
    path = "/v1/ai-models/{slug}/usage",
    tag = "AI Models",
    security(("bearer_auth" = [])),
    params(("slug" = String, Path, description = "Model slug"), PageQuery),
    responses(
        (status = 200, description = "Usage logs", body = Page<ModelUsageLog>),
        (status = 403, description = "Caller may not edit this model", body = ApiError)
    )
)]
async fn usage_logs(
    Extension(trace_id): Extension<TraceId>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(page): Query<PageQuery>,
) -> ApiResult {
    let model = editable_model(&state, &trace_id, &slug, &user).await?;
    let total = state
        .store
        .count_usage_logs(&model.id)
        .await
        .map_err(|e| storage_failure(&trace_id, e, "Failed to count usage logs"))?;
    let window = page.window(total, paging::USAGE_LOG_PAGE_SIZE);
    let logs = state
        .store
        .list_usage_logs(&model.id, window.limit(), window.offset())
        .await
        .map_err(|e| storage_failure(&trace_id, e, "Failed to list usage logs"))?;
    Ok(success_response(StatusCode::OK, &trace_id, window.into_page(logs)))
}

pub fn public_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(list_models))
        .routes(routes!(model_types))
        .routes(routes!(model_detail))
}

pub fn protected_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(create_model))
        .routes(routes!(update_model))
        .routes(routes!(set_status))
        .routes(routes!(set_team))
        .routes(routes!(upload_files))
        .routes(routes!(my_models))
        .routes(routes!(dashboard))
        .routes(routes!(usage_logs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_options_cover_every_model_type() {
        let options = model_type_options();
        assert_eq!(options.len(), ModelType::ALL.len());
        let summarization = options
            .iter()
            .find(|o| o.value == ModelType::Summarization)
            .unwrap();
        assert_eq!(summarization.label, "Text Summarization");
    }
}
