#![allow(dead_code)]

use anyhow::Result;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use chrono::Utc;
use folio_common::forms::LoginRequest;
use folio_inference::MockEngine;
use folio_server::app;
use folio_server::config::ServerConfig;
use folio_server::state::AppState;
use folio_storage::auth::hash_password;
use folio_storage::Store;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt;

pub struct TestContext {
    pub temp_dir: TempDir,
    pub state: AppState,
    pub app: axum::Router,
}

pub async fn build_test_context() -> Result<TestContext> {
    build_test_context_with(|_| {}).await
}

/// Like [`build_test_context`], with a hook to adjust the config first.
pub async fn build_test_context_with(adjust: impl FnOnce(&mut ServerConfig)) -> Result<TestContext> {
    folio_common::id::init(1, 1);

    let temp_dir = tempfile::tempdir()?;
    let db_url = folio_storage::sqlite_url(temp_dir.path(), "test.db");
    let store = Arc::new(Store::new(&db_url, temp_dir.path()).await?);

    let password_hash = hash_password("changeme")?;
    store.create_user("admin", &password_hash, true).await?;

    let mut config = ServerConfig::default();
    config.database.data_dir = temp_dir.path().to_string_lossy().to_string();
    adjust(&mut config);
    let media_root = config.media_root();
    std::fs::create_dir_all(&media_root)?;

    let state = AppState {
        store,
        engine: Arc::new(MockEngine::new(0, 0)),
        start_time: Utc::now(),
        jwt_secret: Arc::new("test-secret".to_string()),
        token_expire_secs: 3600,
        media_root: Arc::new(media_root),
        config: Arc::new(config),
    };

    let app = app::build_http_app(state.clone());

    Ok(TestContext {
        temp_dir,
        state,
        app,
    })
}

async fn send(app: &axum::Router, req: Request<Body>) -> (StatusCode, Value, Option<String>) {
    let resp = app
        .clone()
        .oneshot(req)
        .await
        .expect("request should be handled");

    let status = resp.status();
    let trace_id = resp
        .headers()
        .get("x-trace-id")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string());
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("body should read");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice::<Value>(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).to_string()))
    };

    (status, json, trace_id)
}

pub async fn request_json(
    app: &axum::Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value, Option<String>) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    builder = builder.header("Content-Type", "application/json");

    let req_body = body.unwrap_or(Value::Null).to_string();
    let req = builder
        .body(Body::from(req_body))
        .expect("request should build");
    send(app, req).await
}

pub async fn request_no_body(
    app: &axum::Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
) -> (StatusCode, Value, Option<String>) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    let req = builder.body(Body::empty()).expect("request should build");
    send(app, req).await
}

/// One part of a multipart body: `(field, Some(file_name), content)` for a
/// file, `(field, None, text)` for a plain field.
pub type Part<'a> = (&'a str, Option<&'a str>, &'a str);

const BOUNDARY: &str = "folio-test-boundary";

fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, file_name, content) in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match file_name {
            Some(file_name) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                );
            }
            None => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
            }
        }
        body.extend_from_slice(content.as_bytes());
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub async fn request_multipart(
    app: &axum::Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    parts: &[Part<'_>],
) -> (StatusCode, Value, Option<String>) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", format!("multipart/form-data; boundary={BOUNDARY}"));
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    let req = builder
        .body(Body::from(multipart_body(parts)))
        .expect("request should build");
    send(app, req).await
}

pub async fn login(app: &axum::Router, username: &str, password: &str) -> String {
    let (status, body, _) = request_json(
        app,
        "POST",
        "/v1/auth/login",
        None,
        Some(
            serde_json::to_value(LoginRequest {
                username: username.to_string(),
                password: password.to_string(),
            })
            .expect("login request should serialize"),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "login failed for {username}: {body}");
    assert_eq!(body["err_code"], 0);
    body["data"]["access_token"]
        .as_str()
        .expect("token should exist")
        .to_string()
}

/// Token for the staff account every context starts with.
pub async fn login_and_get_token(app: &axum::Router) -> String {
    login(app, "admin", "changeme").await
}

/// Create a non-staff account and return its token.
pub async fn create_member(ctx: &TestContext, username: &str) -> String {
    let hash = hash_password("secret-pass").expect("hash should succeed");
    ctx.state
        .store
        .create_user(username, &hash, false)
        .await
        .expect("user should be created");
    login(&ctx.app, username, "secret-pass").await
}

/// Create a tag through the API and return its id.
pub async fn create_tag(app: &axum::Router, token: &str, name: &str) -> String {
    let (status, body, _) = request_json(
        app,
        "POST",
        "/v1/tags",
        Some(token),
        Some(json!({ "name": name })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "tag create failed: {body}");
    body["data"]["id"].as_str().expect("tag id").to_string()
}

/// Create a post through the API and return its slug.
pub async fn create_post(app: &axum::Router, token: &str, payload: Value) -> String {
    let (status, body, _) = request_json(app, "POST", "/v1/posts", Some(token), Some(payload)).await;
    assert_eq!(status, StatusCode::CREATED, "post create failed: {body}");
    body["data"]["slug"].as_str().expect("post slug").to_string()
}

/// Create a model through the API and return `(id, slug)`.
pub async fn create_model(app: &axum::Router, token: &str, payload: Value) -> (String, String) {
    let (status, body, _) = request_json(app, "POST", "/v1/ai-models", Some(token), Some(payload)).await;
    assert_eq!(status, StatusCode::CREATED, "model create failed: {body}");
    (
        body["data"]["id"].as_str().expect("model id").to_string(),
        body["data"]["slug"].as_str().expect("model slug").to_string(),
    )
}

/// Move a model to `status` using the staff account.
pub async fn set_model_status(app: &axum::Router, staff_token: &str, slug: &str, status: &str) {
    let (code, body, _) = request_json(
        app,
        "PUT",
        &format!("/v1/ai-models/{slug}/status"),
        Some(staff_token),
        Some(json!({ "status": status })),
    )
    .await;
    assert_eq!(code, StatusCode::OK, "status change failed: {body}");
}

pub fn assert_ok_envelope(json: &Value) {
    assert_eq!(json["err_code"], 0);
    assert!(json["err_msg"].is_string());
    assert!(json.get("trace_id").is_some());
}

pub fn assert_err_envelope(json: &Value, err_code: i32) {
    assert_eq!(json["err_code"], err_code);
    assert!(json["err_msg"].is_string());
    assert!(json.get("trace_id").is_some());
    assert!(json.get("data").is_some());
    assert!(json["data"].is_null());
}

pub fn decode_data<T: DeserializeOwned>(json: &Value) -> T {
    serde_json::from_value(json["data"].clone()).expect("data should decode")
}
