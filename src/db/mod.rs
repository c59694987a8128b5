//! # Database — PostgreSQL Storage Layer
//!
//! Async database operations for lottery entries, the singleton settings
//! record, and admin accounts via `sqlx::PgPool` connecting to Supabase
//! PostgreSQL.
//!
//! ## Schema
//!
//! - `entries`: handle, wallet, number (UNIQUE), winner, rank, prize
//! - `settings`: singleton row holding the per-handle submission cap
//! - `admins`: dashboard accounts (username, salted password hash)
//!
//! ## Module Structure
//!
//! - [`entries`] — admission transaction, listing, winner marking, deletion
//! - [`settings`] — submission-cap read/update
//! - [`admins`] — account lookup and password hashing

pub mod admins;
mod entries;
mod settings;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};

// ── Entry types ─────────────────────────────────────────────────

#[derive(Clone, Serialize, sqlx::FromRow)]
pub struct EntryRow {
    pub id: i64,
    pub handle: String,
    pub wallet: String,
    pub number: i32,
    pub winner: bool,
    pub rank: Option<i32>,
    pub prize: Option<f64>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Public winner view, ordered by rank. Excludes the row id and timestamp.
#[derive(Serialize, sqlx::FromRow)]
pub struct WinnerRow {
    pub handle: String,
    pub wallet: String,
    pub number: i32,
    pub rank: i32,
    pub prize: Option<f64>,
}

#[derive(Deserialize, Default, Clone)]
pub struct EntryFilter {
    /// Substring match on the normalized handle (ILIKE).
    pub handle: Option<String>,
    /// Exact match on the chosen number.
    pub number: Option<i32>,
    /// Restrict to winners only.
    pub winners_only: Option<bool>,
    pub sort_by: Option<String>,
    pub sort_dir: Option<String>,
}

impl EntryFilter {
    /// Whitelist sort column to prevent SQL injection.
    /// Unknown values default to "id".
    pub(crate) fn safe_sort_column(&self) -> &str {
        match self.sort_by.as_deref() {
            Some("handle") => "handle",
            Some("number") => "number",
            Some("rank") => "rank",
            Some("created_at") => "created_at",
            _ => "id",
        }
    }

    /// Whitelist sort direction to prevent SQL injection.
    /// Only "asc"/"ASC" are accepted; everything else defaults to "DESC".
    pub(crate) fn safe_sort_dir(&self) -> &str {
        match self.sort_dir.as_deref() {
            Some("asc") | Some("ASC") => "ASC",
            _ => "DESC",
        }
    }
}

/// Outcome of the admission transaction in [`Database::admit_entry`].
///
/// Rejections are data, not errors: only genuine datastore failures surface
/// as `Err`. The submission layer maps these onto its typed rejection kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum AdmitDecision {
    Admitted { id: i64 },
    LimitExceeded { max: i32 },
    NumberTaken,
}

/// Outcome of the winner-marking transaction.
#[derive(Debug, Clone, PartialEq)]
pub enum MarkDecision {
    Marked { updated: u64 },
    /// A winner outside the requested id set already holds the rank.
    RankConflict { rank: i32 },
}

// ── Database struct and connection ──────────────────────────────

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connect to PostgreSQL using the provided database URL.
    ///
    /// Manually parses the URL to preserve the full username — sqlx's built-in
    /// parser strips the ".project-ref" suffix that Supabase pooler requires.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let url = url::Url::parse(database_url)?;
        let username = urlencoding::decode(url.username())?.into_owned();
        let password = url
            .password()
            .map(|p| urlencoding::decode(p).map(|s| s.into_owned()))
            .transpose()?;
        let mut opts = PgConnectOptions::new()
            .host(url.host_str().unwrap_or("localhost"))
            .port(url.port().unwrap_or(5432))
            .database(url.path().trim_start_matches('/'))
            .username(&username)
            .statement_cache_capacity(0);
        if let Some(ref pw) = password {
            opts = opts.password(pw);
        }
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect_with(opts)
            .await?;
        Ok(Database { pool })
    }

    /// Get a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Health check: execute `SELECT 1` to verify database connectivity.
    ///
    /// Used by the `/readyz` readiness probe. Returns `Ok(())` if the
    /// database responds, or an error if the connection is broken.
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(())
    }
}

// ── Tests ───────────────────────────────────────────────────────
