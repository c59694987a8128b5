//! Admin session API — login, logout, session probe.

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

use super::middleware_auth::{self, extract_admin, SESSION_COOKIE, SESSION_TTL_SECS};
use super::AppState;
use crate::db::admins::verify_password;

#[derive(Deserialize)]
pub(super) struct LoginPayload {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

/// POST /api/auth/login — verify credentials and set the session cookie.
pub(super) async fn handler_login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginPayload>,
) -> impl IntoResponse {
    if payload.username.is_empty() || payload.password.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": "username and password are required"})),
        )
            .into_response();
    }

    let admin = match state.db.get_admin_by_username(&payload.username).await {
        Ok(Some(a)) => a,
        Ok(None) => {
            return (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({"error": "invalid credentials"})),
            )
                .into_response();
        }
        Err(e) => {
            warn!(error = %e, "admin lookup failed");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": "login unavailable"})),
            )
                .into_response();
        }
    };

    if !verify_password(&payload.password, &admin.password_hash) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({"error": "invalid credentials"})),
        )
            .into_response();
    }

    let token = match middleware_auth::issue_token(&admin.username, &state.session_secret) {
        Ok(t) => t,
        Err(e) => {
            warn!(error = %e, "token signing failed");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": "login unavailable"})),
            )
                .into_response();
        }
    };

    info!(username = %admin.username, "admin logged in");
    let cookie = format!(
        "{}={}; HttpOnly; Path=/; Max-Age={}; SameSite=Lax",
        SESSION_COOKIE, token, SESSION_TTL_SECS
    );
    (
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(serde_json::json!({"message": "login successful"})),
    )
        .into_response()
}

/// POST /api/auth/logout — clear the session cookie.
pub(super) async fn handler_logout() -> impl IntoResponse {
    let cookie = format!("{}=; HttpOnly; Path=/; Max-Age=0; SameSite=Lax", SESSION_COOKIE);
    (
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(serde_json::json!({"message": "logged out"})),
    )
}

/// GET /api/auth/session — 200 when the session cookie is valid, 401
/// otherwise. Polled by the admin frontend to guard the dashboard route.
pub(super) async fn handler_session(
    State(state): State<Arc<AppState>>,
    request: axum::extract::Request,
) -> impl IntoResponse {
    let (parts, _) = request.into_parts();
    match extract_admin(&state, &parts) {
        Some(admin) => (
            StatusCode::OK,
            Json(serde_json::json!({"logged_in": true, "username": admin.username})),
        ),
        None => (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({"logged_in": false})),
        ),
    }
}
