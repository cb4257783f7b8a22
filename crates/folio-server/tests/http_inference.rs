mod common;

use anyhow::Result;
use axum::http::StatusCode;
use common::{
    assert_err_envelope, assert_ok_envelope, build_test_context, build_test_context_with, create_member,
    create_model, login_and_get_token, request_json, request_no_body, set_model_status, TestContext,
};
use serde_json::{json, Value};

/// A ready sentiment model owned by admin: `(admin token, model id, slug)`.
async fn ready_model(ctx: &TestContext, max_input_length: i64) -> (String, String, String) {
    let token = login_and_get_token(&ctx.app).await;
    let (id, slug) = create_model(
        &ctx.app,
        &token,
        json!({
            "name": "Mood Reader",
            "description": "Sentiment of short texts",
            "model_type": "sentiment_analysis",
            "max_input_length": max_input_length
        }),
    )
    .await;
    set_model_status(&ctx.app, &token, &slug, "ready").await;
    (token, id, slug)
}

async fn run(ctx: &TestContext, token: &str, model_id: &str, body: Value) -> (StatusCode, Value) {
    let (status, body, _) = request_json(
        &ctx.app,
        "POST",
        &format!("/api/models/{model_id}/inference"),
        Some(token),
        Some(body),
    )
    .await;
    (status, body)
}

#[tokio::test]
async fn inference_completes_and_is_recorded() -> Result<()> {
    let ctx = build_test_context().await?;
    let (token, id, slug) = ready_model(&ctx, 512).await;

    let (status, body) = run(&ctx, &token, &id, json!({"input_data": "I love this product"})).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_ok_envelope(&body);
    assert_eq!(body["data"]["status"], "completed");
    let sentiment = body["data"]["result"]["sentiment"].as_str().unwrap_or_default();
    assert!(["positive", "negative", "neutral"].contains(&sentiment), "{sentiment}");
    assert!(body["data"]["result"]["scores"].is_object());
    assert!(body["data"]["processing_time"].as_f64().is_some());
    let inference_id = body["data"]["inference_id"].as_str().unwrap_or_default().to_string();

    let (status, body, _) =
        request_no_body(&ctx.app, "GET", &format!("/v1/inference/{inference_id}"), Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "completed");
    assert_eq!(body["data"]["input_data"], "I love this product");
    assert_eq!(body["data"]["parameters"], json!({}));
    assert!(body["data"]["completed_at"].is_string());

    let (_, body, _) = request_no_body(&ctx.app, "GET", &format!("/v1/ai-models/{slug}"), None).await;
    assert_eq!(body["data"]["model"]["total_inferences"], 1);
    assert_eq!(body["data"]["model"]["successful_inferences"], 1);
    assert_eq!(body["data"]["model"]["success_rate"], 100.0);
    assert_eq!(body["data"]["recent_inferences"].as_array().map(Vec::len), Some(1));

    let (status, body, _) =
        request_no_body(&ctx.app, "GET", &format!("/v1/ai-models/{slug}/usage"), Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["items"][0]["inference_request_id"], inference_id);
    assert_eq!(body["data"]["items"][0]["api_endpoint"], format!("/api/models/{id}/inference"));
    Ok(())
}

#[tokio::test]
async fn engine_failures_mark_the_request_failed() -> Result<()> {
    let ctx = build_test_context().await?;
    let (token, id, slug) = ready_model(&ctx, 5).await;

    let (status, body) = run(&ctx, &token, &id, json!({"input_data": "far too long for this model"})).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["err_code"], 1202);
    let inference_id = body["data"]["inference_id"].as_str().unwrap_or_default().to_string();
    assert!(!inference_id.is_empty());

    let (_, body, _) =
        request_no_body(&ctx.app, "GET", &format!("/v1/inference/{inference_id}"), Some(&token)).await;
    assert_eq!(body["data"]["status"], "failed");
    assert!(!body["data"]["error_message"].as_str().unwrap_or_default().is_empty());

    let (status, body) = run(&ctx, &token, &id, json!({"input_data": 42})).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["err_code"], 1202);

    let (_, body, _) = request_no_body(&ctx.app, "GET", &format!("/v1/ai-models/{slug}"), None).await;
    assert_eq!(body["data"]["model"]["total_inferences"], 2);
    assert_eq!(body["data"]["model"]["successful_inferences"], 0);
    assert_eq!(body["data"]["model"]["success_rate"], 0.0);
    Ok(())
}

#[tokio::test]
async fn inference_input_is_required() -> Result<()> {
    let ctx = build_test_context().await?;
    let (token, id, _) = ready_model(&ctx, 512).await;

    let (status, body) = run(&ctx, &token, &id, json!({"parameters": {"top_k": 3}})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_err_envelope(&body, 1001);

    let (status, body) = run(&ctx, &token, &id, json!({"input_data": null})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_err_envelope(&body, 1001);
    Ok(())
}

#[tokio::test]
async fn only_usable_models_run() -> Result<()> {
    let ctx = build_test_context().await?;
    let token = login_and_get_token(&ctx.app).await;
    let (training_id, _) = create_model(
        &ctx.app,
        &token,
        json!({"name": "Unfinished", "description": "still training", "model_type": "sentiment_analysis"}),
    )
    .await;

    let (status, body) = run(&ctx, &token, &training_id, json!({"input_data": "hi"})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_err_envelope(&body, 1004);

    let (status, _) = run(&ctx, &token, "not-an-id", json!({"input_data": "hi"})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, private_slug) = create_model(
        &ctx.app,
        &token,
        json!({
            "name": "Internal",
            "description": "team only",
            "model_type": "sentiment_analysis",
            "is_public": false
        }),
    )
    .await;
    set_model_status(&ctx.app, &token, &private_slug, "deployed").await;
    let (_, body, _) =
        request_no_body(&ctx.app, "GET", "/v1/ai-models/mine", Some(&token)).await;
    let private_id = body["data"]["items"]
        .as_array()
        .and_then(|items| items.iter().find(|m| m["slug"] == private_slug.as_str()))
        .and_then(|m| m["id"].as_str())
        .unwrap_or_default()
        .to_string();

    let bob = create_member(&ctx, "bob").await;
    let (status, _) = run(&ctx, &bob, &private_id, json!({"input_data": "hi"})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, body) = run(&ctx, &token, &private_id, json!({"input_data": "hi"})).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    Ok(())
}

#[tokio::test]
async fn requests_belong_to_their_caller() -> Result<()> {
    let ctx = build_test_context().await?;
    let (token, id, slug) = ready_model(&ctx, 512).await;
    let (_, body) = run(&ctx, &token, &id, json!({"input_data": {"text": "fine"}})).await;
    let inference_id = body["data"]["inference_id"].as_str().unwrap_or_default().to_string();

    let bob = create_member(&ctx, "bob").await;
    let (status, _, _) =
        request_no_body(&ctx.app, "GET", &format!("/v1/inference/{inference_id}"), Some(&bob)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body, _) =
        request_no_body(&ctx.app, "GET", &format!("/v1/ai-models/{slug}/usage"), Some(&bob)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_err_envelope(&body, 1006);
    Ok(())
}

#[tokio::test]
async fn finished_requests_cannot_be_cancelled() -> Result<()> {
    let ctx = build_test_context().await?;
    let (token, id, _) = ready_model(&ctx, 512).await;
    let (_, body) = run(&ctx, &token, &id, json!({"input_data": "done already"})).await;
    let inference_id = body["data"]["inference_id"].as_str().unwrap_or_default().to_string();

    let (status, body, _) =
        request_no_body(&ctx.app, "POST", &format!("/v1/inference/{inference_id}/cancel"), Some(&token)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_err_envelope(&body, 1005);
    Ok(())
}

#[tokio::test]
async fn feedback_is_accepted_once() -> Result<()> {
    let ctx = build_test_context().await?;
    let (token, id, _) = ready_model(&ctx, 512).await;
    let (_, body) = run(&ctx, &token, &id, json!({"input_data": "rate me"})).await;
    let inference_id = body["data"]["inference_id"].as_str().unwrap_or_default().to_string();
    let uri = format!("/v1/inference/{inference_id}/feedback");

    let (status, body, _) = request_json(
        &ctx.app,
        "POST",
        &uri,
        Some(&token),
        Some(json!({"feedback_type": "correct", "rating": 9})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["data"]["rating"].is_array());

    let feedback = json!({"feedback_type": "correct", "rating": 5, "comment": "spot on"});
    let (status, body, _) = request_json(&ctx.app, "POST", &uri, Some(&token), Some(feedback.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["feedback_type"], "correct");
    assert_eq!(body["data"]["rating"], 5);

    let (status, body, _) = request_json(&ctx.app, "POST", &uri, Some(&token), Some(feedback)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_err_envelope(&body, 1005);
    Ok(())
}

#[tokio::test]
async fn disabled_inference_is_not_mounted() -> Result<()> {
    let ctx = build_test_context_with(|config| config.inference.enabled = false).await?;
    let (token, id, _) = ready_model(&ctx, 512).await;

    let (status, _) = run(&ctx, &token, &id, json!({"input_data": "hello"})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, spec, _) = request_no_body(&ctx.app, "GET", "/v1/openapi.json", None).await;
    assert!(spec["paths"].get("/api/models/{model}/inference").is_none());

    let (_, health, _) = request_no_body(&ctx.app, "GET", "/v1/health", None).await;
    assert_eq!(health["data"]["inference_status"], "disabled");
    Ok(())
}
