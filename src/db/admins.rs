//! Admin account lookup and password hashing.
//!
//! Passwords are stored as `salt$sha256hex` where the hash covers
//! `salt$password`. Seed accounts with `undian hash-password` and an INSERT,
//! or `create_admin` from an operational script.

use super::Database;
use anyhow::Result;
use serde::Serialize;
use sha2::{Digest, Sha256};

#[derive(Serialize, sqlx::FromRow)]
pub struct AdminRow {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Database {
    /// Look up an admin account by username.
    pub async fn get_admin_by_username(&self, username: &str) -> Result<Option<AdminRow>> {
        let row = sqlx::query_as::<_, AdminRow>(
            "SELECT id, username, password_hash, created_at FROM admins WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Create an admin account with an already-hashed password.
    pub async fn create_admin(&self, username: &str, password_hash: &str) -> Result<()> {
        sqlx::query("INSERT INTO admins (username, password_hash) VALUES ($1, $2)")
            .bind(username)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// Hash a password with a fresh random salt. Output format: `salt$sha256hex`.
pub fn hash_password(password: &str) -> String {
    let salt = uuid::Uuid::new_v4().simple().to_string();
    format!("{}${}", salt, digest(&salt, password))
}

/// Constant-shape verification against a stored `salt$sha256hex` value.
/// Malformed stored hashes never verify.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt, expected)) = stored.split_once('$') else {
        return false;
    };
    digest(salt, password) == expected
}

fn digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b"$");
    hasher.update(password.as_bytes());
    let out = hasher.finalize();
    out.iter().map(|b| format!("{:02x}", b)).collect()
}
