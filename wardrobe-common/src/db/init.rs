//! Schema creation
//!
//! Every statement is `IF NOT EXISTS`, so running it against an existing
//! database is a no-op.

use crate::Result;
use sqlx::SqlitePool;

const SCHEMA: &[(&str, &str)] = &[
    (
        "settings",
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )
        "#,
    ),
    (
        "users",
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            name TEXT,
            email TEXT NOT NULL UNIQUE,
            image TEXT,
            credits INTEGER NOT NULL DEFAULT 0 CHECK (credits >= 0),
            created_at TEXT NOT NULL
        )
        "#,
    ),
    (
        "sessions",
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            token_hash TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            created_at TEXT NOT NULL,
            expires_at TEXT NOT NULL
        )
        "#,
    ),
    (
        "clothing_items",
        r#"
        CREATE TABLE IF NOT EXISTS clothing_items (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            category TEXT NOT NULL,
            image_url TEXT NOT NULL,
            tags TEXT NOT NULL DEFAULT '[]',
            favourite INTEGER NOT NULL DEFAULT 0,
            wears INTEGER NOT NULL DEFAULT 0,
            last_worn TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    ),
    (
        "idx_clothing_items_user",
        "CREATE INDEX IF NOT EXISTS idx_clothing_items_user ON clothing_items(user_id, created_at)",
    ),
];

/// Create all tables and indexes used by the service
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    for (name, statement) in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
        tracing::debug!("Schema object ready: {}", name);
    }

    tracing::info!("Database schema initialized ({} objects)", SCHEMA.len());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_init_schema_is_idempotent() {
        let pool = crate::db::init_memory_pool().await.unwrap();

        // Already applied once by init_memory_pool
        init_schema(&pool).await.unwrap();

        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();

        assert_eq!(tables, vec!["clothing_items", "sessions", "settings", "users"]);
    }
}
