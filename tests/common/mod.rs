//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::sync::Once;

/// Returns the test database URL from the `TEST_DATABASE_URL` environment variable.
/// Panics if the variable is not set.
pub fn test_db_url() -> String {
    std::env::var("TEST_DATABASE_URL")
        .expect("TEST_DATABASE_URL must be set for integration tests")
}

/// Returns true if the test database URL is configured.
pub fn has_test_db() -> bool {
    std::env::var("TEST_DATABASE_URL").is_ok()
}

/// Secret used to sign session cookies in tests.
pub const TEST_SESSION_SECRET: &str = "test-session-secret";

/// Default admin account seeded into every clean test database.
pub const TEST_ADMIN_USER: &str = "admin";
pub const TEST_ADMIN_PASSWORD: &str = "hunter2";

/// One-time schema initialization.
static SCHEMA_INIT: Once = Once::new();

/// Ensure the test database schema is set up (runs migrations once per test suite).
pub fn ensure_schema() {
    SCHEMA_INIT.call_once(|| {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let pool = sqlx::PgPool::connect(&test_db_url()).await.unwrap();
            run_migrations(&pool).await;
        });
    });
}

/// Connect to the test database (also ensures schema is set up).
pub async fn setup_test_db() -> undian::db::Database {
    ensure_schema();
    let db = undian::db::Database::connect(&test_db_url())
        .await
        .expect("Failed to connect to test database");
    truncate_all_tables(db.pool()).await;
    db
}

/// Build an Axum test app router connected to the test database.
///
/// Uses the default 1-100 number range and the shared test session secret.
pub async fn build_test_app() -> axum::Router {
    let db = setup_test_db().await;
    let state = undian::server::AppState::with_db(
        db,
        undian::submission::NumberRange::default(),
        TEST_SESSION_SECRET.to_string(),
    );
    undian::server::build_router(state, None)
}

/// Truncate all tables and re-seed the submission cap and admin account.
///
/// The cap defaults to 3 so limit tests can saturate it quickly; individual
/// tests override it via `set_max_entries`.
pub async fn truncate_all_tables(pool: &sqlx::PgPool) {
    sqlx::raw_sql("TRUNCATE TABLE entries, admins CASCADE")
        .execute(pool)
        .await
        .unwrap();

    sqlx::query(
        "INSERT INTO settings (id, max_entries) VALUES (1, 3)
         ON CONFLICT (id) DO UPDATE SET max_entries = 3",
    )
    .execute(pool)
    .await
    .unwrap();

    let hash = undian::db::admins::hash_password(TEST_ADMIN_PASSWORD);
    sqlx::query("INSERT INTO admins (username, password_hash) VALUES ($1, $2)")
        .bind(TEST_ADMIN_USER)
        .bind(&hash)
        .execute(pool)
        .await
        .unwrap();
}

/// Run all migrations against the test database, skipping Supabase-specific commands.
async fn run_migrations(pool: &sqlx::PgPool) {
    let migration_files = [
        "supabase/migrations/001_create_entries.sql",
        "supabase/migrations/002_create_settings.sql",
        "supabase/migrations/003_create_admins.sql",
    ];

    for file in &migration_files {
        let path = std::path::Path::new(file);
        if !path.exists() {
            panic!("Migration file not found: {}", file);
        }
        let sql = std::fs::read_to_string(path).unwrap();
        let cleaned = clean_migration_sql(&sql);
        if !cleaned.trim().is_empty() {
            sqlx::raw_sql(&cleaned).execute(pool).await.unwrap_or_else(|e| {
                panic!("Migration {} failed: {}", file, e);
            });
        }
    }
}

/// Remove Supabase-specific SQL (ALTER PUBLICATION, RLS, policies).
fn clean_migration_sql(sql: &str) -> String {
    sql.lines()
        .filter(|line| {
            let t = line.trim();
            !t.starts_with("ALTER PUBLICATION")
                && !t.contains("ENABLE ROW LEVEL SECURITY")
                && !t.starts_with("CREATE POLICY")
        })
        .collect::<Vec<_>>()
        .join("\n")
}
