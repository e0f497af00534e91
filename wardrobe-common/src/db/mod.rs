//! Database layer shared by wardrobe crates
//!
//! SQLite through sqlx. The schema is created idempotently at startup.

pub mod init;
pub mod models;
pub mod retry;

pub use init::init_schema;
pub use models::{ClothingItemRow, UserRow};
pub use retry::retry_on_lock;

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;

/// Default for the `db_max_lock_wait_ms` setting
pub const DEFAULT_MAX_LOCK_WAIT_MS: u64 = 5000;

/// Open (or create) the database file and ensure the schema exists
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // mode=rwc: read, write, create
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new().connect_with(options).await?;

    init_schema(&pool).await?;

    Ok(pool)
}

/// Single-connection in-memory database with the schema applied
///
/// The connection is never recycled so the database lives as long as the pool.
pub async fn init_memory_pool() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    init_schema(&pool).await?;

    Ok(pool)
}

/// Read a raw value from the settings table
pub async fn get_setting(pool: &SqlitePool, key: &str) -> Result<Option<String>> {
    let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await?;
    Ok(value)
}

/// Insert or replace a settings value
pub async fn set_setting(pool: &SqlitePool, key: &str, value: &str) -> Result<()> {
    sqlx::query("INSERT OR REPLACE INTO settings (key, value) VALUES (?, ?)")
        .bind(key)
        .bind(value)
        .execute(pool)
        .await?;
    Ok(())
}

/// Maximum time writes keep retrying on a locked database
pub async fn max_lock_wait_ms(pool: &SqlitePool) -> Result<u64> {
    Ok(get_setting(pool, "db_max_lock_wait_ms")
        .await?
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(DEFAULT_MAX_LOCK_WAIT_MS))
}

/// Current UTC time in the fixed-width RFC 3339 form stored in the database
pub fn now_timestamp() -> String {
    timestamp(chrono::Utc::now())
}

pub fn timestamp(at: chrono::DateTime<chrono::Utc>) -> String {
    at.to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}
