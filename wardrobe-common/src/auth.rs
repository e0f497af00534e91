//! Session tokens
//!
//! Sign-in itself happens at the OAuth identity provider. Once a user is
//! identified, the service issues an opaque bearer token; only its SHA-256
//! digest is stored, so a leaked database does not leak live sessions.

use crate::db::{now_timestamp, timestamp, UserRow};
use crate::{Error, Result};
use rand::RngCore;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;

/// Random bytes per session token (hex-encoded to twice this length)
pub const TOKEN_BYTES: usize = 32;

/// Generate a fresh random session token
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Digest stored in the `sessions` table for a token
pub fn hash_token(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

/// Create the user for an identity-provider email, or refresh its name
pub async fn upsert_user(pool: &SqlitePool, email: &str, name: Option<&str>) -> Result<UserRow> {
    let email = email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(Error::InvalidInput(format!("Invalid email address: {:?}", email)));
    }

    sqlx::query(
        r#"
        INSERT INTO users (id, name, email, image, credits, created_at)
        VALUES (?, ?, ?, NULL, 0, ?)
        ON CONFLICT(email) DO UPDATE SET name = COALESCE(excluded.name, users.name)
        "#,
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(name)
    .bind(email)
    .bind(now_timestamp())
    .execute(pool)
    .await?;

    let user = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE email = ?")
        .bind(email)
        .fetch_one(pool)
        .await?;

    Ok(user)
}

/// Issue a session for `user_id`, returning the plaintext token
pub async fn create_session(
    pool: &SqlitePool,
    user_id: &str,
    max_age: chrono::Duration,
) -> Result<String> {
    let token = generate_token();
    let now = chrono::Utc::now();

    sqlx::query(
        "INSERT INTO sessions (token_hash, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)",
    )
    .bind(hash_token(&token))
    .bind(user_id)
    .bind(timestamp(now))
    .bind(timestamp(now + max_age))
    .execute(pool)
    .await?;

    tracing::info!(user_id = %user_id, "Session issued");

    Ok(token)
}

/// Look up the user owning an unexpired session token
pub async fn resolve_session(pool: &SqlitePool, token: &str) -> Result<Option<UserRow>> {
    let user = sqlx::query_as::<_, UserRow>(
        r#"
        SELECT users.*
        FROM sessions
        JOIN users ON users.id = sessions.user_id
        WHERE sessions.token_hash = ? AND sessions.expires_at > ?
        "#,
    )
    .bind(hash_token(token))
    .bind(now_timestamp())
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

/// Revoke a session; returns whether it existed
pub async fn revoke_session(pool: &SqlitePool, token: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM sessions WHERE token_hash = ?")
        .bind(hash_token(token))
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Delete expired sessions; returns how many were removed
pub async fn purge_expired_sessions(pool: &SqlitePool) -> Result<u64> {
    let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
        .bind(now_timestamp())
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory_pool;

    #[test]
    fn test_token_shape() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), TOKEN_BYTES * 2);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_hash_is_stable_and_not_the_token() {
        let token = "abc";
        assert_eq!(hash_token(token), hash_token(token));
        assert_ne!(hash_token(token), token);
        assert_eq!(
            hash_token(token),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let pool = init_memory_pool().await.unwrap();
        let user = upsert_user(&pool, "ada@example.com", Some("Ada")).await.unwrap();

        let token = create_session(&pool, &user.id, chrono::Duration::days(30))
            .await
            .unwrap();

        let resolved = resolve_session(&pool, &token).await.unwrap().unwrap();
        assert_eq!(resolved.id, user.id);
        assert!(resolve_session(&pool, "not-a-token").await.unwrap().is_none());

        assert!(revoke_session(&pool, &token).await.unwrap());
        assert!(resolve_session(&pool, &token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_session_rejected_and_purged() {
        let pool = init_memory_pool().await.unwrap();
        let user = upsert_user(&pool, "old@example.com", None).await.unwrap();

        let token = create_session(&pool, &user.id, chrono::Duration::seconds(-1))
            .await
            .unwrap();

        assert!(resolve_session(&pool, &token).await.unwrap().is_none());
        assert_eq!(purge_expired_sessions(&pool).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_upsert_keeps_identity_and_credits() {
        let pool = init_memory_pool().await.unwrap();
        let first = upsert_user(&pool, "sam@example.com", Some("Sam")).await.unwrap();

        sqlx::query("UPDATE users SET credits = 7 WHERE id = ?")
            .bind(&first.id)
            .execute(&pool)
            .await
            .unwrap();

        let second = upsert_user(&pool, "sam@example.com", None).await.unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.name.as_deref(), Some("Sam"));
        assert_eq!(second.credits, 7);

        assert!(matches!(
            upsert_user(&pool, "nope", None).await,
            Err(Error::InvalidInput(_))
        ));
    }
}
