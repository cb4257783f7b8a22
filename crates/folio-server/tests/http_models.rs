mod common;

use anyhow::Result;
use axum::http::StatusCode;
use common::{
    assert_err_envelope, build_test_context, create_member, create_model, login_and_get_token, request_json,
    request_multipart, request_no_body, set_model_status,
};
use serde_json::json;

fn sentiment_model() -> serde_json::Value {
    json!({
        "name": "Sentiment Analyzer",
        "description": "Scores text polarity",
        "model_type": "sentiment_analysis",
        "framework": "PyTorch",
        "accuracy": 0.9
    })
}

#[tokio::test]
async fn new_models_start_in_training_and_stay_hidden() -> Result<()> {
    let ctx = build_test_context().await?;
    let token = login_and_get_token(&ctx.app).await;
    let (_, slug) = create_model(&ctx.app, &token, sentiment_model()).await;
    assert_eq!(slug, "sentiment-analyzer-10");

    let (status, body, _) = request_no_body(&ctx.app, "GET", &format!("/v1/ai-models/{slug}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["model"]["status"], "training");
    assert_eq!(body["data"]["model"]["created_by_username"], "admin");
    assert_eq!(body["data"]["model"]["success_rate"], 0.0);

    let (_, body, _) = request_no_body(&ctx.app, "GET", "/v1/ai-models", None).await;
    assert_eq!(body["data"]["models"]["total"], 0);

    set_model_status(&ctx.app, &token, &slug, "ready").await;
    let (_, body, _) = request_no_body(&ctx.app, "GET", "/v1/ai-models", None).await;
    assert_eq!(body["data"]["models"]["total"], 1);
    assert_eq!(body["data"]["model_types"].as_array().map(|t| t.is_empty()), Some(false));
    Ok(())
}

#[tokio::test]
async fn model_list_filters_by_type_and_search() -> Result<()> {
    let ctx = build_test_context().await?;
    let token = login_and_get_token(&ctx.app).await;
    let (_, a) = create_model(&ctx.app, &token, sentiment_model()).await;
    let (_, b) = create_model(
        &ctx.app,
        &token,
        json!({"name": "Caption Bot", "description": "Describes photos", "model_type": "image_classification"}),
    )
    .await;
    set_model_status(&ctx.app, &token, &a, "ready").await;
    set_model_status(&ctx.app, &token, &b, "deployed").await;

    let (_, body, _) = request_no_body(&ctx.app, "GET", "/v1/ai-models?type=image_classification", None).await;
    // Deployed models are not listed publicly.
    assert_eq!(body["data"]["models"]["total"], 0);
    assert_eq!(body["data"]["current_type"], "image_classification");

    let (_, body, _) = request_no_body(&ctx.app, "GET", "/v1/ai-models?type=sentiment_analysis", None).await;
    assert_eq!(body["data"]["models"]["total"], 1);

    let (_, body, _) = request_no_body(&ctx.app, "GET", "/v1/ai-models?type=nonsense", None).await;
    assert_eq!(body["data"]["models"]["total"], 0);

    let (_, body, _) = request_no_body(&ctx.app, "GET", "/v1/ai-models?search=POLARITY", None).await;
    assert_eq!(body["data"]["models"]["total"], 1);
    Ok(())
}

#[tokio::test]
async fn model_form_is_validated() -> Result<()> {
    let ctx = build_test_context().await?;
    let token = login_and_get_token(&ctx.app).await;
    let (status, body, _) = request_json(
        &ctx.app,
        "POST",
        "/v1/ai-models",
        Some(&token),
        Some(json!({
            "name": "Broken",
            "description": "x",
            "model_type": "telepathy",
            "accuracy": 1.5,
            "category": "12345"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["err_code"], 1010);
    assert!(body["data"]["model_type"].is_array());
    assert!(body["data"]["accuracy"].is_array());
    Ok(())
}

#[tokio::test]
async fn categories_group_models() -> Result<()> {
    let ctx = build_test_context().await?;
    let token = login_and_get_token(&ctx.app).await;

    let (status, body, _) = request_json(
        &ctx.app,
        "POST",
        "/v1/ai-models/categories",
        Some(&token),
        Some(json!({"name": "Natural Language Processing", "color": "#007bff"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let category_id = body["data"]["id"].as_str().unwrap_or_default().to_string();
    assert_eq!(body["data"]["slug"], "natural-language-processing");

    let mut payload = sentiment_model();
    payload["category"] = json!(category_id);
    let (_, slug) = create_model(&ctx.app, &token, payload).await;
    set_model_status(&ctx.app, &token, &slug, "ready").await;

    let (_, body, _) = request_no_body(
        &ctx.app,
        "GET",
        "/v1/ai-models?category=natural-language-processing",
        None,
    )
    .await;
    assert_eq!(body["data"]["models"]["total"], 1);
    assert_eq!(body["data"]["models"]["items"][0]["category"]["name"], "Natural Language Processing");

    let (_, body, _) = request_no_body(&ctx.app, "GET", "/v1/ai-models/categories", None).await;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));
    Ok(())
}

#[tokio::test]
async fn editing_requires_creator_team_or_staff() -> Result<()> {
    let ctx = build_test_context().await?;
    let admin = login_and_get_token(&ctx.app).await;
    let bob = create_member(&ctx, "bob").await;
    let (_, slug) = create_model(&ctx.app, &admin, sentiment_model()).await;
    let uri = format!("/v1/ai-models/{slug}");

    let mut update = sentiment_model();
    update["description"] = json!("Updated by the team");

    let (status, body, _) = request_json(&ctx.app, "PUT", &uri, Some(&bob), Some(update.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_err_envelope(&body, 1006);

    let (status, body, _) = request_json(
        &ctx.app,
        "PUT",
        &format!("{uri}/status"),
        Some(&bob),
        Some(json!({"status": "ready"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_err_envelope(&body, 1006);

    let (status, body, _) = request_json(
        &ctx.app,
        "PUT",
        &format!("{uri}/team"),
        Some(&admin),
        Some(json!({"usernames": ["ghost"]})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["data"]["usernames"].is_array());

    let (status, body, _) = request_json(
        &ctx.app,
        "PUT",
        &format!("{uri}/team"),
        Some(&admin),
        Some(json!({"usernames": [" bob ", "bob"]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let team = body["data"]["team_members"].as_array().cloned().unwrap_or_default();
    assert_eq!(team.len(), 2);
    assert!(team.iter().any(|m| m == "bob"));

    let (status, body, _) = request_json(&ctx.app, "PUT", &uri, Some(&bob), Some(update)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["description"], "Updated by the team");

    // Team members still cannot change the team.
    let (status, _, _) = request_json(
        &ctx.app,
        "PUT",
        &format!("{uri}/team"),
        Some(&bob),
        Some(json!({"usernames": []})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn model_files_are_checked_and_stored() -> Result<()> {
    let ctx = build_test_context().await?;
    let token = login_and_get_token(&ctx.app).await;
    let (_, slug) = create_model(&ctx.app, &token, sentiment_model()).await;
    let uri = format!("/v1/ai-models/{slug}/files");

    let (status, body, _) =
        request_multipart(&ctx.app, "PUT", &uri, Some(&token), &[("note", None, "nothing")]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["data"]["model_file"].is_array());

    let (status, body, _) = request_multipart(
        &ctx.app,
        "PUT",
        &uri,
        Some(&token),
        &[("model_file", Some("weights.exe"), "MZ")],
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["data"]["model_file"].is_array());

    let (status, body, _) = request_multipart(
        &ctx.app,
        "PUT",
        &uri,
        Some(&token),
        &[
            ("model_file", Some("weights.onnx"), "onnx bytes"),
            ("config_file", Some("config.json"), "{}"),
        ],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let model_file = body["data"]["model_file"].as_str().unwrap_or_default().to_string();
    let config_file = body["data"]["config_file"].as_str().unwrap_or_default().to_string();
    assert!(model_file.starts_with("ai_models/"), "{model_file}");
    assert!(config_file.starts_with("ai_models/config/"), "{config_file}");
    assert!(ctx.state.media_root.join(&model_file).is_file());
    Ok(())
}

#[tokio::test]
async fn dashboard_counts_the_callers_models() -> Result<()> {
    let ctx = build_test_context().await?;
    let admin = login_and_get_token(&ctx.app).await;
    let bob = create_member(&ctx, "bob").await;
    let (_, first) = create_model(&ctx.app, &admin, sentiment_model()).await;
    let mut private = sentiment_model();
    private["name"] = json!("Private Analyzer");
    private["is_public"] = json!(false);
    create_model(&ctx.app, &admin, private).await;
    set_model_status(&ctx.app, &admin, &first, "ready").await;

    let (status, body, _) = request_no_body(&ctx.app, "GET", "/v1/ai-models/dashboard", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_models"], 2);
    assert_eq!(body["data"]["public_models"], 1);
    assert_eq!(body["data"]["ready_models"], 1);

    let (_, body, _) = request_no_body(&ctx.app, "GET", "/v1/ai-models/mine", Some(&admin)).await;
    assert_eq!(body["data"]["total"], 2);
    let (_, body, _) = request_no_body(&ctx.app, "GET", "/v1/ai-models/mine", Some(&bob)).await;
    assert_eq!(body["data"]["total"], 0);
    Ok(())
}

#[tokio::test]
async fn deployments_record_health_checks() -> Result<()> {
    let ctx = build_test_context().await?;
    let admin = login_and_get_token(&ctx.app).await;
    let bob = create_member(&ctx, "bob").await;
    let (_, slug) = create_model(&ctx.app, &admin, sentiment_model()).await;
    let uri = format!("/v1/ai-models/{slug}/deployments");

    let (status, body, _) = request_json(
        &ctx.app,
        "POST",
        &uri,
        Some(&admin),
        Some(json!({"deployment_type": "cloud", "endpoint_url": "https://models.example.com/v1"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["replicas"], 1);
    let deployment_id = body["data"]["id"].as_str().unwrap_or_default().to_string();

    let (status, body, _) = request_json(
        &ctx.app,
        "POST",
        &uri,
        Some(&admin),
        Some(json!({"deployment_type": "cloud", "endpoint_url": "not a url"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["data"]["endpoint_url"].is_array());

    let (_, body, _) = request_no_body(&ctx.app, "GET", &uri, Some(&admin)).await;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));

    let health = format!("/v1/deployments/{deployment_id}/health");
    let (status, _, _) = request_no_body(&ctx.app, "POST", &health, Some(&bob)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body, _) = request_no_body(&ctx.app, "POST", &health, Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_healthy"], true);
    assert!(body["data"]["last_health_check"].is_string());
    Ok(())
}

#[tokio::test]
async fn public_api_lists_bare_models() -> Result<()> {
    let ctx = build_test_context().await?;
    let token = login_and_get_token(&ctx.app).await;
    let (_, ready) = create_model(&ctx.app, &token, sentiment_model()).await;
    let mut other = sentiment_model();
    other["name"] = json!("Still Training");
    let (_, training) = create_model(&ctx.app, &token, other).await;
    set_model_status(&ctx.app, &token, &ready, "ready").await;

    let (status, body, _) = request_no_body(&ctx.app, "GET", "/api/models", None).await;
    assert_eq!(status, StatusCode::OK);
    let models = body.as_array().cloned().unwrap_or_default();
    assert_eq!(models.len(), 1);
    assert_eq!(models[0]["slug"], ready);
    assert_eq!(models[0]["created_by"], "admin");
    assert!(models[0].get("err_code").is_none());

    let (status, body, _) = request_no_body(&ctx.app, "GET", &format!("/api/models/{ready}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Sentiment Analyzer");

    let (status, body, _) = request_no_body(&ctx.app, "GET", &format!("/api/models/{training}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"detail": "Not found."}));
    Ok(())
}

#[tokio::test]
async fn my_models_page_by_twelve_and_clamp() -> Result<()> {
    let ctx = build_test_context().await?;
    let token = login_and_get_token(&ctx.app).await;
    for n in 1..=13 {
        create_model(
            &ctx.app,
            &token,
            json!({"name": format!("Model {n}"), "description": "batch", "model_type": "custom"}),
        )
        .await;
    }

    let (status, body, _) = request_no_body(&ctx.app, "GET", "/v1/ai-models/mine", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 13);
    assert_eq!(body["data"]["total_pages"], 2);
    assert_eq!(body["data"]["items"].as_array().map(Vec::len), Some(12));

    let (_, body, _) = request_no_body(&ctx.app, "GET", "/v1/ai-models/mine?page=40", Some(&token)).await;
    assert_eq!(body["data"]["page"], 2);
    assert_eq!(body["data"]["items"].as_array().map(Vec::len), Some(1));

    let (_, body, _) = request_no_body(&ctx.app, "GET", "/v1/ai-models/mine?page=-3", Some(&token)).await;
    assert_eq!(body["data"]["page"], 1);

    let (status, body, _) = request_no_body(&ctx.app, "GET", "/v1/ai-models?search=zzz&page=5", None).await;
    assert_eq!(status, StatusCode::OK);
    let page = &body["data"]["models"];
    assert_eq!(page["page"], 1);
    assert_eq!(page["total_pages"], 1);
    assert_eq!(page["items"], json!([]));
    Ok(())
}
