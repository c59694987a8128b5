//! # Server — Axum HTTP Application
//!
//! Runs the Axum server that backs the lottery frontend: the public
//! submission API, the advisory Telegram check, and the cookie-protected
//! admin API for listing, searching, exporting, deleting, and winner
//! marking.

pub(crate) mod middleware_auth;
mod routes_admin;
mod routes_auth;
mod routes_entries;
mod routes_health;
mod routes_telegram;

use crate::{db, prom_metrics, submission};
use anyhow::Result;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::routing::{get, post};
use axum::Router;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn, Instrument};

pub struct AppState {
    pub db: db::Database,
    pub number_range: submission::NumberRange,
    /// HS256 key for the admin session cookie.
    pub session_secret: String,
    pub prom_metrics: prom_metrics::Metrics,
}

impl AppState {
    pub fn with_db(
        db: db::Database,
        number_range: submission::NumberRange,
        session_secret: String,
    ) -> Arc<Self> {
        Arc::new(AppState {
            db,
            number_range,
            session_secret,
            prom_metrics: prom_metrics::Metrics::new(),
        })
    }
}

/// Middleware that records HTTP request duration into the Prometheus
/// histogram, generates (or propagates) a request ID for correlation, and
/// wraps the request in a tracing span using `.instrument()` for proper
/// async propagation.
async fn metrics_middleware(
    axum::extract::State(state): axum::extract::State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> axum::response::Response {
    let request_id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let method = req.method().to_string();
    let raw_path = req.uri().path().to_string();
    let norm_path = normalize_path(&raw_path);
    let start = std::time::Instant::now();

    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        path = %raw_path,
    );
    let response = next.run(req).instrument(span).await;

    let duration = start.elapsed().as_secs_f64();
    state
        .prom_metrics
        .http_request_duration
        .get_or_create(&prom_metrics::HttpLabel {
            method,
            path: norm_path,
        })
        .observe(duration);

    let mut response = response;
    if let Ok(value) = request_id.parse() {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}

/// Normalize URL path to collapse high-cardinality segments (numeric IDs)
/// into placeholders, preventing histogram label explosion.
fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|seg| {
            if !seg.is_empty() && seg.chars().all(|c| c.is_ascii_digit()) {
                ":id".to_string()
            } else {
                seg.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

pub fn build_router(state: Arc<AppState>, static_dir: Option<&Path>) -> Router {
    let mut app = Router::new()
        // Public API
        .route("/api/entries", post(routes_entries::handler_submit))
        .route("/api/numbers", get(routes_entries::handler_numbers))
        .route("/api/winners", get(routes_entries::handler_winners))
        .route(
            "/api/check-telegram",
            post(routes_telegram::handler_check_telegram),
        )
        // Admin session
        .route("/api/auth/login", post(routes_auth::handler_login))
        .route("/api/auth/logout", post(routes_auth::handler_logout))
        .route("/api/auth/session", get(routes_auth::handler_session))
        // Admin API (cookie-gated via RequireAdmin)
        .route(
            "/api/admin/entries",
            get(routes_admin::handler_entries_list)
                .delete(routes_admin::handler_entries_delete),
        )
        .route(
            "/api/admin/winners",
            post(routes_admin::handler_winners_mark)
                .delete(routes_admin::handler_winners_unmark),
        )
        .route(
            "/api/admin/limit",
            get(routes_admin::handler_limit_get).put(routes_admin::handler_limit_put),
        )
        .route("/api/admin/export", get(routes_admin::handler_export))
        // Probes
        .route("/healthz", get(routes_health::handler_healthz))
        .route("/readyz", get(routes_health::handler_readyz))
        .route("/metrics", get(routes_health::handler_metrics));

    if let Some(dir) = static_dir {
        app = app.fallback_service(ServeDir::new(dir).append_index_html_on_directories(true));
    }

    app.layer(
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    )
    .layer(CatchPanicLayer::new())
    .layer(axum::middleware::from_fn_with_state(
        state.clone(),
        metrics_middleware,
    ))
    .layer(TraceLayer::new_for_http())
    .layer(RequestBodyLimitLayer::new(64 * 1024))
    .layer(TimeoutLayer::with_status_code(
        StatusCode::REQUEST_TIMEOUT,
        Duration::from_secs(30),
    ))
    .with_state(state)
}

pub async fn run(
    port: u16,
    database_url: &str,
    static_dir: Option<&Path>,
    number_range: submission::NumberRange,
    session_secret: String,
) -> Result<()> {
    let database = db::Database::connect(database_url).await?;
    let state = AppState::with_db(database, number_range, session_secret);
    let app = build_router(state.clone(), static_dir);

    // Background task: refresh gauges from the database every 60 seconds.
    let gauge_state = Arc::clone(&state);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;

            match gauge_state
                .db
                .count_entries_filtered(&db::EntryFilter::default())
                .await
            {
                Ok(total) => gauge_state.prom_metrics.entries_total.set(total),
                Err(e) => {
                    warn!(error = %e, "failed to count entries for metrics");
                    continue;
                }
            };

            let pool_size = gauge_state.db.pool().size();
            let pool_idle = gauge_state.db.pool().num_idle();
            gauge_state
                .prom_metrics
                .db_pool_active
                .set((pool_size as i64) - (pool_idle as i64));
            gauge_state.prom_metrics.db_pool_idle.set(pool_idle as i64);
        }
    });

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    info!(port, "undian server running");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler");
        tokio::select! { _ = ctrl_c => info!("received SIGINT, shutting down"), _ = sigterm.recv() => info!("received SIGTERM, shutting down") }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("received SIGINT, shutting down");
    }
}
