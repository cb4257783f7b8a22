mod common;

use anyhow::{anyhow, Result};
use common::{build_test_context, request_no_body};
use std::collections::{BTreeSet, HashSet};

#[tokio::test]
async fn openapi_paths_should_be_covered_by_test_matrix() -> Result<()> {
    let ctx = build_test_context().await?;
    let (status, body, _) = request_no_body(&ctx.app, "GET", "/v1/openapi.json", None).await;
    assert_eq!(status, axum::http::StatusCode::OK);

    let Some(paths) = body["paths"].as_object() else {
        return Err(anyhow!("openapi paths should be object"));
    };

    let mut exposed: BTreeSet<String> = BTreeSet::new();
    for (path, methods) in paths {
        let Some(methods) = methods.as_object() else {
            return Err(anyhow!("path methods should be object for {path}"));
        };
        for method in methods.keys() {
            if method == "parameters" {
                continue;
            }
            let method = method.to_ascii_uppercase();
            exposed.insert(format!("{method} {path}"));
        }
    }

    let covered: HashSet<String> = [
        "GET /v1/health",
        "POST /v1/auth/login",
        "POST /v1/auth/logout",
        "GET /v1/auth/me",
        // blog
        "GET /v1/home",
        "GET /v1/posts",
        "POST /v1/posts",
        "GET /v1/posts/our-work",
        "GET /v1/posts/{slug}",
        "PUT /v1/posts/{slug}",
        "DELETE /v1/posts/{slug}",
        "GET /v1/posts/{slug}/edit",
        "POST /v1/posts/{slug}/comments",
        "POST /v1/posts/{slug}/images",
        "PUT /v1/posts/{slug}/featured-image",
        "PUT /v1/comments/{id}/approval",
        "GET /v1/tags",
        "POST /v1/tags",
        "GET /v1/tags/{slug}/posts",
        "GET /v1/users/{username}/posts",
        // model registry
        "GET /v1/ai-models",
        "POST /v1/ai-models",
        "GET /v1/ai-models/types",
        "GET /v1/ai-models/categories",
        "POST /v1/ai-models/categories",
        "GET /v1/ai-models/mine",
        "GET /v1/ai-models/dashboard",
        "GET /v1/ai-models/{slug}",
        "PUT /v1/ai-models/{slug}",
        "PUT /v1/ai-models/{slug}/status",
        "PUT /v1/ai-models/{slug}/team",
        "PUT /v1/ai-models/{slug}/files",
        "GET /v1/ai-models/{slug}/usage",
        "GET /v1/ai-models/{slug}/deployments",
        "POST /v1/ai-models/{slug}/deployments",
        "POST /v1/deployments/{id}/health",
        // inference
        "POST /api/models/{model}/inference",
        "GET /v1/inference/{id}",
        "POST /v1/inference/{id}/cancel",
        "POST /v1/inference/{id}/feedback",
        // public read-only API
        "GET /api/models",
        "GET /api/models/{model}",
    ]
    .into_iter()
    .map(ToString::to_string)
    .collect();

    let missing: Vec<String> = exposed
        .iter()
        .filter(|endpoint| !covered.contains(*endpoint))
        .cloned()
        .collect();

    assert!(
        missing.is_empty(),
        "new OpenAPI endpoints are not covered by the test matrix: {missing:?}"
    );

    let stale: Vec<&String> = covered.iter().filter(|endpoint| !exposed.contains(*endpoint)).collect();
    assert!(stale.is_empty(), "covered endpoints no longer exposed: {stale:?}");
    Ok(())
}

#[tokio::test]
async fn openapi_documents_bearer_auth_and_yaml() -> Result<()> {
    let ctx = build_test_context().await?;

    let (status, body, _) = request_no_body(&ctx.app, "GET", "/v1/openapi.json", None).await;
    assert_eq!(status, axum::http::StatusCode::OK);
    assert!(body["components"]["securitySchemes"]["bearer_auth"].is_object());
    assert_eq!(body["info"]["title"], "folio API");

    let (status, yaml, _) = request_no_body(&ctx.app, "GET", "/v1/openapi.yaml", None).await;
    assert_eq!(status, axum::http::StatusCode::OK);
    let yaml = yaml.as_str().unwrap_or_default();
    assert!(yaml.contains("openapi:"), "{yaml}");
    assert!(yaml.contains("/v1/ai-models/{slug}"));
    Ok(())
}
