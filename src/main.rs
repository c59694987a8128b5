//! # Main — CLI Entry Point
//!
//! Routes CLI subcommands to the server and operational helpers.
//!
//! ## Subcommands
//!
//! - `serve` — run the HTTP server.
//! - `export` — dump all entries as CSV to stdout or a file.
//! - `set-limit` — update the per-handle submission cap from the shell.
//! - `hash-password` — emit a salted hash for seeding the `admins` table.
//!
//! ## Global Options
//!
//! - `--database-url` / `DATABASE_URL`: PostgreSQL connection string.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::warn;
use undian::{db, server, submission};

#[derive(Parser)]
#[command(name = "undian", about = "Lottery-entry service")]
struct Cli {
    /// PostgreSQL connection URL (or set DATABASE_URL env var)
    #[arg(long, env = "DATABASE_URL", global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server
    Serve {
        /// Port to listen on
        #[arg(long, default_value_t = 7010)]
        port: u16,
        /// Directory of static frontend assets to serve (optional)
        #[arg(long)]
        static_dir: Option<PathBuf>,
        /// Smallest choosable number
        #[arg(long, default_value_t = 1)]
        min_number: i32,
        /// Largest choosable number
        #[arg(long, default_value_t = 100)]
        max_number: i32,
        /// HS256 key for the admin session cookie. A random per-process
        /// key is generated when unset (sessions won't survive restarts).
        #[arg(long, env = "SESSION_SECRET")]
        session_secret: Option<String>,
    },
    /// Export all entries as CSV
    Export {
        /// Output file (stdout when omitted)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Set the per-handle submission cap
    SetLimit {
        /// New cap (0 denies all submissions)
        max: i32,
    },
    /// Hash a password for seeding the admins table
    HashPassword {
        password: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            port,
            static_dir,
            min_number,
            max_number,
            session_secret,
        } => {
            if min_number < 1 || max_number < min_number {
                bail!(
                    "invalid number range {}-{}: min must be >= 1 and <= max",
                    min_number,
                    max_number
                );
            }
            let range = submission::NumberRange {
                min: min_number,
                max: max_number,
            };
            let secret = session_secret.unwrap_or_else(|| {
                warn!("SESSION_SECRET not set, using a random per-process key");
                uuid::Uuid::new_v4().simple().to_string()
            });
            let database_url = require_database_url(&cli.database_url)?;
            server::run(port, &database_url, static_dir.as_deref(), range, secret).await
        }
        Commands::Export { out } => {
            let database_url = require_database_url(&cli.database_url)?;
            let database = db::Database::connect(&database_url).await?;
            let entries = database.get_all_entries().await?;
            let csv = undian::export::entries_to_csv(&entries);
            match out {
                Some(path) => std::fs::write(&path, csv)
                    .with_context(|| format!("failed to write {}", path.display()))?,
                None => print!("{}", csv),
            }
            Ok(())
        }
        Commands::SetLimit { max } => {
            if max < 0 {
                bail!("cap must be >= 0");
            }
            let database_url = require_database_url(&cli.database_url)?;
            let database = db::Database::connect(&database_url).await?;
            database.set_max_entries(max).await?;
            println!("max_entries set to {}", max);
            Ok(())
        }
        Commands::HashPassword { password } => {
            println!("{}", db::admins::hash_password(&password));
            Ok(())
        }
    }
}

fn require_database_url(url: &Option<String>) -> Result<String> {
    url.clone()
        .context("DATABASE_URL is required (flag --database-url or env var)")
}
