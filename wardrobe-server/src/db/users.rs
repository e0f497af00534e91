//! User profile and credit balance queries

use sqlx::SqlitePool;
use wardrobe_common::db::{max_lock_wait_ms, retry_on_lock, UserRow};
use wardrobe_common::{Error, Result};

/// Load a user by id
pub async fn get_user(pool: &SqlitePool, user_id: &str) -> Result<Option<UserRow>> {
    let user = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

/// Load a user by email
pub async fn get_user_by_email(pool: &SqlitePool, email: &str) -> Result<Option<UserRow>> {
    let user = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE email = ?")
        .bind(email.trim())
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

/// Atomically take `amount` credits from the balance
///
/// Returns the new balance, or `None` if the balance was too low (nothing
/// is changed in that case).
pub async fn deduct_credits(pool: &SqlitePool, user_id: &str, amount: i64) -> Result<Option<i64>> {
    if amount <= 0 {
        return Err(Error::InvalidInput("Amount must be positive".to_string()));
    }

    let max_wait_ms = max_lock_wait_ms(pool).await?;
    retry_on_lock("deduct_credits", max_wait_ms, || async move {
        let balance: Option<i64> = sqlx::query_scalar(
            "UPDATE users SET credits = credits - ? WHERE id = ? AND credits >= ? RETURNING credits",
        )
        .bind(amount)
        .bind(user_id)
        .bind(amount)
        .fetch_optional(pool)
        .await?;
        Ok(balance)
    })
    .await
}

/// Add purchased credits, returning the new balance
pub async fn add_credits(pool: &SqlitePool, user_id: &str, amount: i64) -> Result<i64> {
    if amount <= 0 {
        return Err(Error::InvalidInput("Amount must be positive".to_string()));
    }

    let max_wait_ms = max_lock_wait_ms(pool).await?;
    let balance = retry_on_lock("add_credits", max_wait_ms, || async move {
        let balance: Option<i64> =
            sqlx::query_scalar("UPDATE users SET credits = credits + ? WHERE id = ? RETURNING credits")
                .bind(amount)
                .bind(user_id)
                .fetch_optional(pool)
                .await?;
        Ok(balance)
    })
    .await?;

    balance.ok_or_else(|| Error::NotFound(format!("User {}", user_id)))
}

/// Replace the user's full-body photo
pub async fn set_image(pool: &SqlitePool, user_id: &str, image_url: &str) -> Result<()> {
    let max_wait_ms = max_lock_wait_ms(pool).await?;
    let updated = retry_on_lock("set_user_image", max_wait_ms, || async move {
        let result = sqlx::query("UPDATE users SET image = ? WHERE id = ?")
            .bind(image_url)
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    })
    .await?;

    if updated == 0 {
        return Err(Error::NotFound(format!("User {}", user_id)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wardrobe_common::auth::upsert_user;
    use wardrobe_common::db::init_memory_pool;

    async fn user_with_credits(pool: &SqlitePool, credits: i64) -> UserRow {
        let user = upsert_user(pool, "ada@example.com", Some("Ada")).await.unwrap();
        if credits > 0 {
            add_credits(pool, &user.id, credits).await.unwrap();
        }
        get_user(pool, &user.id).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_deduct_within_balance() {
        let pool = init_memory_pool().await.unwrap();
        let user = user_with_credits(&pool, 10).await;

        assert_eq!(deduct_credits(&pool, &user.id, 3).await.unwrap(), Some(7));
        assert_eq!(deduct_credits(&pool, &user.id, 7).await.unwrap(), Some(0));
    }

    #[tokio::test]
    async fn test_deduct_over_balance_changes_nothing() {
        let pool = init_memory_pool().await.unwrap();
        let user = user_with_credits(&pool, 2).await;

        assert_eq!(deduct_credits(&pool, &user.id, 5).await.unwrap(), None);
        assert_eq!(get_user(&pool, &user.id).await.unwrap().unwrap().credits, 2);
    }

    #[tokio::test]
    async fn test_non_positive_amounts_rejected() {
        let pool = init_memory_pool().await.unwrap();
        let user = user_with_credits(&pool, 2).await;

        assert!(matches!(
            deduct_credits(&pool, &user.id, 0).await,
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            add_credits(&pool, &user.id, -4).await,
            Err(Error::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_set_image_and_lookup_by_email() {
        let pool = init_memory_pool().await.unwrap();
        let user = user_with_credits(&pool, 0).await;

        set_image(&pool, &user.id, "https://img/me.jpg").await.unwrap();
        let found = get_user_by_email(&pool, " ada@example.com").await.unwrap().unwrap();
        assert_eq!(found.image.as_deref(), Some("https://img/me.jpg"));

        assert!(matches!(
            set_image(&pool, "missing", "https://img/x.jpg").await,
            Err(Error::NotFound(_))
        ));
    }
}
