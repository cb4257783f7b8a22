mod common;

use anyhow::Result;
use axum::http::StatusCode;
use common::{
    assert_err_envelope, assert_ok_envelope, build_test_context, create_member, login_and_get_token,
    request_json, request_no_body,
};
use serde_json::json;

#[tokio::test]
async fn health_reports_storage_and_trace_header() -> Result<()> {
    let ctx = build_test_context().await?;
    let (status, body, trace_id) = request_no_body(&ctx.app, "GET", "/v1/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_ok_envelope(&body);
    assert_eq!(body["data"]["storage_status"], "ok");
    assert_eq!(body["data"]["inference_status"], "ok");
    let trace_id = trace_id.expect("trace header should be set");
    assert_eq!(trace_id.len(), 16);
    assert_eq!(body["trace_id"], trace_id);
    Ok(())
}

#[tokio::test]
async fn login_rejects_bad_credentials() -> Result<()> {
    let ctx = build_test_context().await?;

    let (status, body, _) = request_json(
        &ctx.app,
        "POST",
        "/v1/auth/login",
        None,
        Some(json!({"username": "admin", "password": "wrong"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_err_envelope(&body, 1002);

    let (status, body, _) = request_json(
        &ctx.app,
        "POST",
        "/v1/auth/login",
        None,
        Some(json!({"username": "  ", "password": ""})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_err_envelope(&body, 1001);
    Ok(())
}

#[tokio::test]
async fn login_issues_a_bearer_token() -> Result<()> {
    let ctx = build_test_context().await?;
    let (status, body, _) = request_json(
        &ctx.app,
        "POST",
        "/v1/auth/login",
        None,
        Some(json!({"username": "admin", "password": "changeme"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_ok_envelope(&body);
    assert_eq!(body["data"]["token_type"], "Bearer");
    assert_eq!(body["data"]["expires_in"], 3600);
    assert_eq!(body["data"]["is_staff"], true);

    let token = body["data"]["access_token"].as_str().unwrap_or_default();
    let (status, me, _) = request_no_body(&ctx.app, "GET", "/v1/auth/me", Some(token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["data"]["username"], "admin");
    assert!(me["data"].get("password_hash").is_none());
    Ok(())
}

#[tokio::test]
async fn protected_routes_need_a_valid_token() -> Result<()> {
    let ctx = build_test_context().await?;

    let (status, body, _) = request_no_body(&ctx.app, "GET", "/v1/auth/me", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_err_envelope(&body, 1002);

    let (status, body, _) = request_no_body(&ctx.app, "GET", "/v1/auth/me", Some("not-a-jwt")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_err_envelope(&body, 1002);
    Ok(())
}

#[tokio::test]
async fn logout_revokes_issued_tokens() -> Result<()> {
    let ctx = build_test_context().await?;
    let token = login_and_get_token(&ctx.app).await;

    let (status, body, _) = request_no_body(&ctx.app, "POST", "/v1/auth/logout", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_ok_envelope(&body);

    let (status, body, _) = request_no_body(&ctx.app, "GET", "/v1/auth/me", Some(&token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_err_envelope(&body, 1002);

    // A fresh login works again.
    let token = login_and_get_token(&ctx.app).await;
    let (status, _, _) = request_no_body(&ctx.app, "GET", "/v1/auth/me", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn members_are_not_staff() -> Result<()> {
    let ctx = build_test_context().await?;
    let token = create_member(&ctx, "bob").await;
    let (status, me, _) = request_no_body(&ctx.app, "GET", "/v1/auth/me", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["data"]["username"], "bob");
    assert_eq!(me["data"]["is_staff"], false);
    Ok(())
}
