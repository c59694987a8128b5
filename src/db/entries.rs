//! Entry operations — admission transaction, filtered listing, winner
//! marking, and bulk deletion.
//!
//! The admission path (`admit_entry`) is the one place in the service with a
//! real correctness concern: the per-handle limit check and the
//! number-uniqueness check must not race with concurrent submissions. Both
//! check-then-act sequences are closed here at the storage layer:
//!
//! - a `pg_advisory_xact_lock` keyed on the handle serializes concurrent
//!   submissions for the same identity, so count-then-insert cannot admit
//!   more than `max_entries` rows per handle;
//! - the insert uses `ON CONFLICT (number) DO NOTHING RETURNING id`, so the
//!   UNIQUE constraint — not a prior existence query — decides whether the
//!   number is free. Two racing claims of the same number get exactly one
//!   inserted row.

use super::{AdmitDecision, Database, EntryFilter, EntryRow, MarkDecision, WinnerRow};
use anyhow::Result;

impl Database {
    /// Run the full admission transaction for a normalized handle.
    ///
    /// Sequence: lock the handle, read the cap (missing settings row counts
    /// as 0), count the handle's entries, insert with conflict handling.
    /// Rejections roll the transaction back; nothing is written unless the
    /// entry is admitted.
    pub async fn admit_entry(
        &self,
        handle: &str,
        wallet: &str,
        number: i32,
    ) -> Result<AdmitDecision> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(handle)
            .execute(&mut *tx)
            .await?;

        let max: i32 = sqlx::query_scalar("SELECT max_entries FROM settings WHERE id = 1")
            .fetch_optional(&mut *tx)
            .await?
            .unwrap_or(0);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM entries WHERE handle = $1")
            .bind(handle)
            .fetch_one(&mut *tx)
            .await?;

        if count >= max as i64 {
            tx.rollback().await?;
            return Ok(AdmitDecision::LimitExceeded { max });
        }

        let id: Option<i64> = sqlx::query_scalar(
            "INSERT INTO entries (handle, wallet, number)
             VALUES ($1, $2, $3)
             ON CONFLICT (number) DO NOTHING
             RETURNING id",
        )
        .bind(handle)
        .bind(wallet)
        .bind(number)
        .fetch_optional(&mut *tx)
        .await?;

        match id {
            Some(id) => {
                tx.commit().await?;
                Ok(AdmitDecision::Admitted { id })
            }
            None => {
                tx.rollback().await?;
                Ok(AdmitDecision::NumberTaken)
            }
        }
    }

    /// Count entries for a single normalized handle.
    pub async fn count_entries_for_handle(&self, handle: &str) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM entries WHERE handle = $1")
            .bind(handle)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Check whether a number is already claimed.
    ///
    /// Advisory only — the admission transaction relies on the UNIQUE
    /// constraint, not this query. Backs the availability endpoint.
    pub async fn is_number_taken(&self, number: i32) -> Result<bool> {
        let taken =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM entries WHERE number = $1)")
                .bind(number)
                .fetch_one(&self.pool)
                .await?;
        Ok(taken)
    }

    /// All claimed numbers, ascending. Rendered as the availability grid.
    pub async fn taken_numbers(&self) -> Result<Vec<i32>> {
        let numbers =
            sqlx::query_scalar::<_, i32>("SELECT number FROM entries ORDER BY number")
                .fetch_all(&self.pool)
                .await?;
        Ok(numbers)
    }

    /// Query entries with dynamic filtering, sorting, and pagination.
    ///
    /// Builds a parameterized SQL query at runtime based on which filter
    /// fields are set. Sort column and direction are whitelist-validated by
    /// `EntryFilter` methods to prevent SQL injection.
    pub async fn get_entries_filtered(
        &self,
        limit: i64,
        offset: i64,
        filter: &EntryFilter,
    ) -> Result<Vec<EntryRow>> {
        let (where_clause, param_idx) = filter_conditions(filter);

        let sql = format!(
            "SELECT id, handle, wallet, number, winner, rank, prize, created_at
             FROM entries{} ORDER BY {} {} LIMIT ${} OFFSET ${}",
            where_clause,
            filter.safe_sort_column(),
            filter.safe_sort_dir(),
            param_idx,
            param_idx + 1,
        );

        let mut query = sqlx::query_as::<_, EntryRow>(&sql);
        query = bind_filter(query, filter);
        query = query.bind(limit);
        query = query.bind(offset);

        let rows = query.fetch_all(&self.pool).await?;
        Ok(rows)
    }

    /// Count entries matching the given filter (for pagination metadata).
    pub async fn count_entries_filtered(&self, filter: &EntryFilter) -> Result<i64> {
        let (where_clause, _) = filter_conditions(filter);
        let sql = format!("SELECT COUNT(*) FROM entries{}", where_clause);

        let mut query = sqlx::query_scalar::<_, i64>(&sql);
        if let Some(ref handle) = filter.handle {
            query = query.bind(format!("%{}%", handle));
        }
        if let Some(number) = filter.number {
            query = query.bind(number);
        }

        let count = query.fetch_one(&self.pool).await?;
        Ok(count)
    }

    /// All entries ordered by id, for CSV export.
    pub async fn get_all_entries(&self) -> Result<Vec<EntryRow>> {
        let rows = sqlx::query_as::<_, EntryRow>(
            "SELECT id, handle, wallet, number, winner, rank, prize, created_at
             FROM entries ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Delete entries by id set. Returns the number of rows removed.
    pub async fn delete_entries(&self, ids: &[i64]) -> Result<u64> {
        let result = sqlx::query("DELETE FROM entries WHERE id = ANY($1)")
            .bind(ids)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    // ── Winner marking ────────────────────────────────────────────

    /// Winners ordered by rank, then number.
    pub async fn get_winners(&self) -> Result<Vec<WinnerRow>> {
        let rows = sqlx::query_as::<_, WinnerRow>(
            "SELECT handle, wallet, number, rank, prize
             FROM entries WHERE winner ORDER BY rank, number",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Mark every entry in `ids` as a winner with the given rank and prize,
    /// in one bulk update.
    ///
    /// Rejects with `RankConflict` when a winner outside the id set already
    /// holds the rank. A single call may still assign one rank to several
    /// entries in its own set (shared ranks for a prize tier).
    pub async fn mark_winners(
        &self,
        ids: &[i64],
        rank: i32,
        prize: Option<f64>,
    ) -> Result<MarkDecision> {
        let mut tx = self.pool.begin().await?;

        let conflicts: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM entries
             WHERE winner AND rank = $1 AND NOT (id = ANY($2))",
        )
        .bind(rank)
        .bind(ids)
        .fetch_one(&mut *tx)
        .await?;

        if conflicts > 0 {
            tx.rollback().await?;
            return Ok(MarkDecision::RankConflict { rank });
        }

        let result = sqlx::query(
            "UPDATE entries SET winner = true, rank = $1, prize = $2 WHERE id = ANY($3)",
        )
        .bind(rank)
        .bind(prize)
        .bind(ids)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(MarkDecision::Marked {
            updated: result.rows_affected(),
        })
    }

    /// Clear winner, rank, and prize on every entry in `ids`.
    pub async fn unmark_winners(&self, ids: &[i64]) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE entries SET winner = false, rank = NULL, prize = NULL WHERE id = ANY($1)",
        )
        .bind(ids)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

/// Shared WHERE-clause builder for the filtered list and count queries.
/// Returns the clause and the next free bind-parameter index.
fn filter_conditions(filter: &EntryFilter) -> (String, u32) {
    let mut conditions = Vec::new();
    let mut param_idx = 1u32;

    if filter.handle.is_some() {
        conditions.push(format!("handle ILIKE ${}", param_idx));
        param_idx += 1;
    }
    if filter.number.is_some() {
        conditions.push(format!("number = ${}", param_idx));
        param_idx += 1;
    }
    if filter.winners_only == Some(true) {
        conditions.push("winner".to_string());
    }

    let clause = if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    };
    (clause, param_idx)
}

fn bind_filter<'q>(
    mut query: sqlx::query::QueryAs<'q, sqlx::Postgres, EntryRow, sqlx::postgres::PgArguments>,
    filter: &'q EntryFilter,
) -> sqlx::query::QueryAs<'q, sqlx::Postgres, EntryRow, sqlx::postgres::PgArguments> {
    if let Some(ref handle) = filter.handle {
        query = query.bind(format!("%{}%", handle));
    }
    if let Some(number) = filter.number {
        query = query.bind(number);
    }
    query
}
