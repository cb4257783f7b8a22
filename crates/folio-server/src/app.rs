use crate::api::{self, inference, public_models};
use crate::state::AppState;
use crate::{auth, logging, openapi};
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::middleware;
use axum::Router;
use folio_common::validation::{CONFIG_FILE_MAX_BYTES, MODEL_FILE_MAX_BYTES};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use utoipa::OpenApi;

/// Largest request body accepted: a model file plus a config file in one
/// multipart upload, with headroom for the form framing.
fn body_limit(max_image_bytes: usize) -> usize {
    (MODEL_FILE_MAX_BYTES + CONFIG_FILE_MAX_BYTES + 1024 * 1024).max(max_image_bytes + 1024 * 1024)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        return layer.allow_origin(Any);
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}

pub fn build_http_app(state: AppState) -> Router {
    let (public_router, public_spec) = api::public_routes().split_for_parts();
    let (login_router, login_spec) = api::auth_routes().split_for_parts();
    let (protected_router, protected_spec) = api::protected_routes().split_for_parts();
    let (models_router, models_spec) = public_models::routes().split_for_parts();

    let mut merged_spec = openapi::ApiDoc::openapi();
    merged_spec.merge(public_spec);
    merged_spec.merge(login_spec);
    merged_spec.merge(protected_spec);
    merged_spec.merge(models_spec);

    let mut protected_router = protected_router;
    if state.config.inference.enabled {
        let (run_router, run_spec) = inference::run_routes().split_for_parts();
        merged_spec.merge(run_spec);
        protected_router = protected_router.merge(run_router);
    } else {
        tracing::info!("Inference disabled; run endpoint not mounted");
    }

    let cors = cors_layer(&state.config.cors_allowed_origins);
    let limit = body_limit(state.config.media.max_image_bytes);
    let media = ServeDir::new(state.media_root.as_path());

    public_router
        .merge(login_router)
        .merge(models_router)
        .merge(protected_router.layer(middleware::from_fn_with_state(
            state.clone(),
            auth::jwt_auth_middleware,
        )))
        .with_state(state)
        .nest_service("/media", media)
        .merge(openapi::spec_routes(merged_spec))
        .layer(DefaultBodyLimit::max(limit))
        .layer(cors)
        .layer(middleware::from_fn(logging::request_logging))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_limit_fits_both_model_uploads() {
        assert!(body_limit(10 * 1024 * 1024) > MODEL_FILE_MAX_BYTES + CONFIG_FILE_MAX_BYTES);
        let huge = 500 * 1024 * 1024;
        assert!(body_limit(huge) > huge);
    }
}
