use axum::body::Body;
use axum::extract::{Extension, State};
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use folio_common::forms::{LoginRequest, LoginResponse};
use folio_common::types::User;
use folio_storage::auth::verify_password;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::api::{error_response, success_empty_response, success_response, ApiError};
use crate::logging::TraceId;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub username: String,
    /// `token_version` of the user when the token was issued
    pub ver: i64,
    pub iat: u64,
    pub exp: u64,
}

/// The authenticated caller, inserted by [`jwt_auth_middleware`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

pub fn create_token(secret: &str, user: &User, expire_secs: u64) -> anyhow::Result<String> {
    let now = chrono::Utc::now().timestamp() as u64;
    let claims = Claims {
        sub: user.id.clone(),
        username: user.username.clone(),
        ver: user.token_version,
        iat: now,
        exp: now + expire_secs,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok(token)
}

pub fn validate_token(secret: &str, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

fn trace_of(req: &Request<Body>) -> String {
    req.extensions()
        .get::<TraceId>()
        .map(|t| t.0.clone())
        .unwrap_or_default()
}

fn auth_error(trace_id: &str, code: &str, msg: &str) -> Response {
    error_response(StatusCode::UNAUTHORIZED, trace_id, code, msg)
}

/// Bearer-token guard for protected routes.
///
/// Rejects missing, malformed and expired tokens, and tokens issued before
/// the user's last logout (`ver` behind `token_version`).
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let trace_id = trace_of(&req);
    let auth_header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let token = match auth_header.and_then(|h| h.strip_prefix("Bearer ")) {
        Some(token) if !token.is_empty() => token,
        Some(_) => return auth_error(&trace_id, "unauthorized", "invalid authorization header"),
        None if auth_header.is_some() => {
            return auth_error(&trace_id, "unauthorized", "invalid authorization header")
        }
        None => return auth_error(&trace_id, "unauthorized", "missing authorization header"),
    };

    let claims = match validate_token(&state.jwt_secret, token) {
        Ok(claims) => claims,
        Err(e) if matches!(e.kind(), jsonwebtoken::errors::ErrorKind::ExpiredSignature) => {
            return auth_error(&trace_id, "token_expired", "token expired");
        }
        Err(_) => return auth_error(&trace_id, "unauthorized", "invalid token"),
    };

    let user = match state.store.get_user_by_id(&claims.sub).await {
        Ok(Some(user)) => user,
        Ok(None) => return auth_error(&trace_id, "unauthorized", "invalid token"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load token user");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "internal_error",
                "internal error",
            );
        }
    };
    if user.token_version != claims.ver {
        return auth_error(&trace_id, "unauthorized", "token revoked");
    }

    req.extensions_mut().insert(claims);
    req.extensions_mut().insert(CurrentUser(user));
    next.run(req).await
}

/// Exchange username and password for a bearer token.
#[utoipa::path(
    post,
    path = "/v1/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 400, description = "Missing username or password", body = ApiError),
        (status = 401, description = "Bad credentials", body = ApiError)
    )
)]
pub async fn login(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> impl IntoResponse {
    if req.username.trim().is_empty() || req.password.is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            &trace_id,
            "bad_request",
            "username and password are required",
        );
    }

    let user = match state.store.get_user_by_username(req.username.trim()).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            return error_response(
                StatusCode::UNAUTHORIZED,
                &trace_id,
                "unauthorized",
                "invalid credentials",
            );
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to query user");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "internal_error",
                "internal error",
            );
        }
    };

    match verify_password(&req.password, &user.password_hash) {
        Ok(true) => {}
        _ => {
            tracing::warn!(username = %user.username, "Login rejected");
            return error_response(
                StatusCode::UNAUTHORIZED,
                &trace_id,
                "unauthorized",
                "invalid credentials",
            );
        }
    }

    match create_token(&state.jwt_secret, &user, state.token_expire_secs) {
        Ok(token) => success_response(
            StatusCode::OK,
            &trace_id,
            LoginResponse {
                access_token: token,
                token_type: "Bearer".to_string(),
                expires_in: state.token_expire_secs,
                username: user.username,
                is_staff: user.is_staff,
            },
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to create token");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "internal_error",
                "internal error",
            )
        }
    }
}

/// Revoke every token issued to the caller.
#[utoipa::path(
    post,
    path = "/v1/auth/logout",
    tag = "Auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Logged out"),
        (status = 401, description = "Unauthenticated", body = ApiError)
    )
)]
pub async fn logout(
    Extension(trace_id): Extension<TraceId>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    match state.store.bump_token_version(&user.id).await {
        Ok(()) => {
            tracing::info!(username = %user.username, "Logged out");
            success_empty_response(StatusCode::OK, &trace_id, "logged out")
        }
        Err(e) => crate::api::storage_failure(&trace_id, e, "Failed to revoke tokens"),
    }
}

/// The authenticated user.
#[utoipa::path(
    get,
    path = "/v1/auth/me",
    tag = "Auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user", body = User),
        (status = 401, description = "Unauthenticated", body = ApiError)
    )
)]
pub async fn me(
    Extension(trace_id): Extension<TraceId>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> impl IntoResponse {
    success_response(StatusCode::OK, &trace_id, user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(version: i64) -> User {
        User {
            id: "42".into(),
            username: "alice".into(),
            password_hash: String::new(),
            is_staff: false,
            token_version: version,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn token_round_trip_carries_version() {
        let token = create_token("secret", &user(3), 60).unwrap();
        let claims = validate_token("secret", &token).unwrap();
        assert_eq!(claims.sub, "42");
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.ver, 3);
        assert_eq!(claims.exp - claims.iat, 60);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = create_token("secret", &user(0), 60).unwrap();
        assert!(validate_token("other", &token).is_err());
    }
}
