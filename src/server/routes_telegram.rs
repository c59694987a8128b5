//! Advisory Telegram handle check, proxied for the submission form.
//!
//! Policy: verification never gates admission. The frontend calls this to
//! show a hint next to the handle field; an unavailable upstream yields 503
//! and the form submits anyway.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use tracing::debug;

use crate::telegram::{self, VerifyOutcome};

#[derive(Deserialize)]
pub(super) struct CheckPayload {
    #[serde(default)]
    handle: String,
}

/// POST /api/check-telegram
pub(super) async fn handler_check_telegram(
    Json(payload): Json<CheckPayload>,
) -> impl IntoResponse {
    if payload.handle.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": "handle is required"})),
        );
    }

    match telegram::verify_handle(&payload.handle).await {
        VerifyOutcome::Confirmed { username } => (
            StatusCode::OK,
            Json(serde_json::json!({"valid": true, "username": username})),
        ),
        VerifyOutcome::NotFound => (
            StatusCode::OK,
            Json(serde_json::json!({"valid": false})),
        ),
        VerifyOutcome::Unavailable { reason } => {
            debug!(reason = %reason, "telegram verification degraded");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({"valid": null, "error": reason})),
            )
        }
    }
}
