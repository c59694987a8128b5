//! Admin API — entry listing/search, bulk delete, winner marking, the
//! submission cap, and CSV export. Every handler is gated by `RequireAdmin`.

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

use super::middleware_auth::RequireAdmin;
use super::AppState;
use crate::db::{EntryFilter, MarkDecision};
use crate::export;

const DEFAULT_PAGE_SIZE: i64 = 100;
const MAX_PAGE_SIZE: i64 = 500;

#[derive(Deserialize)]
pub(super) struct EntryListQuery {
    handle: Option<String>,
    number: Option<i32>,
    winners_only: Option<bool>,
    sort_by: Option<String>,
    sort_dir: Option<String>,
    limit: Option<i64>,
    offset: Option<i64>,
}

impl EntryListQuery {
    fn filter(&self) -> EntryFilter {
        EntryFilter {
            handle: self.handle.clone(),
            number: self.number,
            winners_only: self.winners_only,
            sort_by: self.sort_by.clone(),
            sort_dir: self.sort_dir.clone(),
        }
    }
}

/// GET /api/admin/entries — filtered, sorted, paginated listing with a
/// total count for pagination metadata.
pub(super) async fn handler_entries_list(
    State(state): State<Arc<AppState>>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<EntryListQuery>,
) -> impl IntoResponse {
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let offset = query.offset.unwrap_or(0).max(0);
    let filter = query.filter();

    let entries = match state.db.get_entries_filtered(limit, offset, &filter).await {
        Ok(rows) => rows,
        Err(e) => {
            warn!(error = %e, "entry listing failed");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": "failed to load entries"})),
            );
        }
    };
    let total = match state.db.count_entries_filtered(&filter).await {
        Ok(n) => n,
        Err(e) => {
            warn!(error = %e, "entry count failed");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": "failed to load entries"})),
            );
        }
    };

    (
        StatusCode::OK,
        Json(serde_json::json!({"entries": entries, "total": total})),
    )
}

#[derive(Deserialize)]
pub(super) struct IdsPayload {
    ids: Vec<i64>,
}

/// DELETE /api/admin/entries — bulk delete by id set.
pub(super) async fn handler_entries_delete(
    State(state): State<Arc<AppState>>,
    RequireAdmin(admin): RequireAdmin,
    Json(payload): Json<IdsPayload>,
) -> impl IntoResponse {
    if payload.ids.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": "ids must not be empty"})),
        );
    }
    match state.db.delete_entries(&payload.ids).await {
        Ok(deleted) => {
            info!(admin = %admin.username, deleted, "entries deleted");
            (StatusCode::OK, Json(serde_json::json!({"deleted": deleted})))
        }
        Err(e) => {
            warn!(error = %e, "bulk delete failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": "failed to delete entries"})),
            )
        }
    }
}

#[derive(Deserialize)]
pub(super) struct MarkPayload {
    ids: Vec<i64>,
    rank: i32,
    #[serde(default)]
    prize: Option<f64>,
}

/// POST /api/admin/winners — mark the id set as winners with one rank and
/// prize. 409 when another winner already holds the rank.
pub(super) async fn handler_winners_mark(
    State(state): State<Arc<AppState>>,
    RequireAdmin(admin): RequireAdmin,
    Json(payload): Json<MarkPayload>,
) -> impl IntoResponse {
    if payload.ids.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": "ids must not be empty"})),
        );
    }
    if payload.rank < 1 {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(serde_json::json!({"error": "rank must be a positive integer"})),
        );
    }
    if payload.prize.is_some_and(|p| p < 0.0 || !p.is_finite()) {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(serde_json::json!({"error": "prize must be non-negative"})),
        );
    }

    match state
        .db
        .mark_winners(&payload.ids, payload.rank, payload.prize)
        .await
    {
        Ok(MarkDecision::Marked { updated }) => {
            info!(admin = %admin.username, updated, rank = payload.rank, "winners marked");
            (StatusCode::OK, Json(serde_json::json!({"updated": updated})))
        }
        Ok(MarkDecision::RankConflict { rank }) => (
            StatusCode::CONFLICT,
            Json(serde_json::json!({
                "error": format!("rank {} is already held by another winner", rank)
            })),
        ),
        Err(e) => {
            warn!(error = %e, "winner marking failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": "failed to mark winners"})),
            )
        }
    }
}

/// DELETE /api/admin/winners — clear winner, rank, and prize on the id set.
pub(super) async fn handler_winners_unmark(
    State(state): State<Arc<AppState>>,
    RequireAdmin(admin): RequireAdmin,
    Json(payload): Json<IdsPayload>,
) -> impl IntoResponse {
    if payload.ids.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": "ids must not be empty"})),
        );
    }
    match state.db.unmark_winners(&payload.ids).await {
        Ok(updated) => {
            info!(admin = %admin.username, updated, "winners unmarked");
            (StatusCode::OK, Json(serde_json::json!({"updated": updated})))
        }
        Err(e) => {
            warn!(error = %e, "winner unmarking failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": "failed to unmark winners"})),
            )
        }
    }
}

/// GET /api/admin/limit — current per-handle submission cap.
pub(super) async fn handler_limit_get(
    State(state): State<Arc<AppState>>,
    RequireAdmin(_admin): RequireAdmin,
) -> impl IntoResponse {
    match state.db.get_max_entries().await {
        Ok(max) => (
            StatusCode::OK,
            Json(serde_json::json!({"max_entries": max})),
        ),
        Err(e) => {
            warn!(error = %e, "limit read failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": "failed to read limit"})),
            )
        }
    }
}

#[derive(Deserialize)]
pub(super) struct LimitPayload {
    max_entries: i32,
}

/// PUT /api/admin/limit — update the per-handle submission cap.
pub(super) async fn handler_limit_put(
    State(state): State<Arc<AppState>>,
    RequireAdmin(admin): RequireAdmin,
    Json(payload): Json<LimitPayload>,
) -> impl IntoResponse {
    if payload.max_entries < 0 {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(serde_json::json!({"error": "max_entries must be >= 0"})),
        );
    }
    match state.db.set_max_entries(payload.max_entries).await {
        Ok(()) => {
            info!(admin = %admin.username, max_entries = payload.max_entries, "limit updated");
            (
                StatusCode::OK,
                Json(serde_json::json!({"max_entries": payload.max_entries})),
            )
        }
        Err(e) => {
            warn!(error = %e, "limit update failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": "failed to update limit"})),
            )
        }
    }
}

/// GET /api/admin/export — all entries as a CSV attachment.
pub(super) async fn handler_export(
    State(state): State<Arc<AppState>>,
    RequireAdmin(_admin): RequireAdmin,
) -> impl IntoResponse {
    match state.db.get_all_entries().await {
        Ok(entries) => {
            let csv = export::entries_to_csv(&entries);
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        "attachment; filename=\"entries.csv\"".to_string(),
                    ),
                ],
                csv,
            )
                .into_response()
        }
        Err(e) => {
            warn!(error = %e, "export failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": "failed to export entries"})),
            )
                .into_response()
        }
    }
}
