//! Singleton settings record — the per-handle submission cap.
//!
//! The cap is global mutable configuration read on every admission. A missing
//! row is an explicit "deny everything" policy (limit 0), not an error; the
//! admission transaction in `entries.rs` reads it the same way so the two
//! paths cannot disagree.

use super::Database;
use anyhow::Result;

impl Database {
    /// Read the per-handle submission cap. Missing row means 0: all
    /// submissions denied until an administrator sets a cap.
    pub async fn get_max_entries(&self) -> Result<i32> {
        let max = sqlx::query_scalar::<_, i32>("SELECT max_entries FROM settings WHERE id = 1")
            .fetch_optional(&self.pool)
            .await?;
        Ok(max.unwrap_or(0))
    }

    /// Set the per-handle submission cap. Upserts so the singleton row is
    /// created if it was never seeded.
    pub async fn set_max_entries(&self, max: i32) -> Result<()> {
        sqlx::query(
            "INSERT INTO settings (id, max_entries) VALUES (1, $1)
             ON CONFLICT (id) DO UPDATE SET max_entries = $1, updated_at = NOW()",
        )
        .bind(max)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
