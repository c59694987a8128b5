//! Public entry API — submission, number availability, winner list.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

use super::AppState;
use crate::submission::{self, SubmitError};

#[derive(Deserialize)]
pub(super) struct SubmitPayload {
    #[serde(default)]
    handle: String,
    #[serde(default)]
    wallet: String,
    number: i32,
}

/// POST /api/entries — run the admission sequence for one submission.
///
/// 201 with the new entry id on success. Rejections: 422 for bad shape,
/// 409 for limit/number conflicts, 500 for storage failures. Every outcome
/// is counted on the submissions metric.
pub(super) async fn handler_submit(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SubmitPayload>,
) -> impl IntoResponse {
    let result = submission::submit(
        &state.db,
        state.number_range,
        &payload.handle,
        &payload.wallet,
        payload.number,
    )
    .await;

    match result {
        Ok(id) => {
            state.prom_metrics.record_submission("admitted");
            info!(id, number = payload.number, "entry admitted");
            (StatusCode::CREATED, Json(serde_json::json!({"id": id})))
        }
        Err(SubmitError::Validation(msg)) => {
            state.prom_metrics.record_submission("validation");
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(serde_json::json!({"error": msg})),
            )
        }
        Err(e @ SubmitError::LimitExceeded { .. }) => {
            state.prom_metrics.record_submission("limit_exceeded");
            (
                StatusCode::CONFLICT,
                Json(serde_json::json!({"error": e.to_string()})),
            )
        }
        Err(SubmitError::NumberTaken) => {
            state.prom_metrics.record_submission("number_taken");
            (
                StatusCode::CONFLICT,
                Json(serde_json::json!({"error": "number already taken"})),
            )
        }
        Err(SubmitError::Storage(e)) => {
            state.prom_metrics.record_submission("storage");
            warn!(error = %e, "submission failed on storage");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": "could not save entry, please try again"})),
            )
        }
    }
}

/// GET /api/numbers — the configured range plus every claimed number,
/// for the availability grid.
pub(super) async fn handler_numbers(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.db.taken_numbers().await {
        Ok(taken) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "min": state.number_range.min,
                "max": state.number_range.max,
                "taken": taken,
            })),
        ),
        Err(e) => {
            warn!(error = %e, "failed to load taken numbers");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": "failed to load numbers"})),
            )
        }
    }
}

/// GET /api/winners — announced winners ordered by rank.
pub(super) async fn handler_winners(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.db.get_winners().await {
        Ok(winners) => (
            StatusCode::OK,
            Json(serde_json::json!({"winners": winners})),
        ),
        Err(e) => {
            warn!(error = %e, "failed to load winners");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": "failed to load winners"})),
            )
        }
    }
}
