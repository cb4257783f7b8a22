//! OpenAPI document assembly and the routes that publish it.

use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "folio API",
        description = "Blog and AI model registry REST API",
    ),
    tags(
        (name = "Health", description = "Service health"),
        (name = "Auth", description = "Login and token management"),
        (name = "Blog", description = "Posts, tags, comments and images"),
        (name = "AI Models", description = "Model registry"),
        (name = "Deployments", description = "Model deployments"),
        (name = "Inference", description = "Mock inference runs and feedback"),
        (name = "Public API", description = "Read-only model listing without envelope")
    ),
    modifiers(&BearerAuth)
)]
pub struct ApiDoc;

struct BearerAuth;

impl utoipa::Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }
}

/// Swagger UI at `/docs`, the JSON document at `/v1/openapi.json` and its
/// YAML rendering at `/v1/openapi.yaml`.
pub fn spec_routes(spec: utoipa::openapi::OpenApi) -> Router {
    // Rendered once; the document never changes after startup.
    let yaml = spec.to_yaml().map(Arc::new).map_err(|e| Arc::new(e.to_string()));
    if let Err(e) = &yaml {
        tracing::error!(error = %e, "Failed to render OpenAPI YAML");
    }

    Router::new()
        .merge(SwaggerUi::new("/docs").url("/v1/openapi.json", spec))
        .route(
            "/v1/openapi.yaml",
            get(move || {
                let yaml = yaml.clone();
                async move {
                    match yaml {
                        Ok(body) => (
                            StatusCode::OK,
                            [(header::CONTENT_TYPE, "text/yaml")],
                            body.as_str().to_owned(),
                        )
                            .into_response(),
                        Err(e) => (
                            StatusCode::INTERNAL_SERVER_ERROR,
                            format!("Failed to serialize YAML: {e}"),
                        )
                            .into_response(),
                    }
                }
            }),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_document_declares_bearer_auth() {
        let doc = ApiDoc::openapi();
        let schemes = doc.components.expect("components").security_schemes;
        assert!(schemes.contains_key("bearer_auth"));
        assert_eq!(doc.info.title, "folio API");
    }
}
