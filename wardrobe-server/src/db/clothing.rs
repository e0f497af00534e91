//! Closet item queries

use crate::models::{ClothingItem, NewClothingItem};
use sqlx::SqlitePool;
use wardrobe_common::db::{max_lock_wait_ms, now_timestamp, retry_on_lock, ClothingItemRow};
use wardrobe_common::{Error, Result};

/// Insert a new item (never worn) and return it
pub async fn insert_item(pool: &SqlitePool, item: &NewClothingItem) -> Result<ClothingItem> {
    let row = ClothingItemRow {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: item.user_id.clone(),
        name: item.name.clone(),
        category: item.category.clone(),
        image_url: item.image_url.clone(),
        tags: serde_json::to_string(&item.tags)
            .map_err(|e| Error::Internal(format!("Failed to encode tags: {}", e)))?,
        favourite: item.favorite,
        wears: 0,
        last_worn: None,
        created_at: now_timestamp(),
    };

    let max_wait_ms = max_lock_wait_ms(pool).await?;
    let row_ref = &row;
    retry_on_lock("insert_clothing_item", max_wait_ms, || async move {
        sqlx::query(
            r#"
            INSERT INTO clothing_items
                (id, user_id, name, category, image_url, tags, favourite, wears, last_worn, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&row_ref.id)
        .bind(&row_ref.user_id)
        .bind(&row_ref.name)
        .bind(&row_ref.category)
        .bind(&row_ref.image_url)
        .bind(&row_ref.tags)
        .bind(row_ref.favourite)
        .bind(row_ref.wears)
        .bind(&row_ref.last_worn)
        .bind(&row_ref.created_at)
        .execute(pool)
        .await?;
        Ok(())
    })
    .await?;

    tracing::debug!(item_id = %row.id, user_id = %row.user_id, "Clothing item added");

    Ok(ClothingItem::from(row))
}

/// All items owned by `user_id`, newest first
pub async fn list_items(pool: &SqlitePool, user_id: &str) -> Result<Vec<ClothingItem>> {
    let rows = sqlx::query_as::<_, ClothingItemRow>(
        "SELECT * FROM clothing_items WHERE user_id = ? ORDER BY created_at DESC, rowid DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(ClothingItem::from).collect())
}

/// Delete an item if `user_id` owns it
///
/// Returns `false` when no such item belongs to the user.
pub async fn delete_item(pool: &SqlitePool, user_id: &str, item_id: &str) -> Result<bool> {
    let max_wait_ms = max_lock_wait_ms(pool).await?;
    let deleted = retry_on_lock("delete_clothing_item", max_wait_ms, || async move {
        let result = sqlx::query("DELETE FROM clothing_items WHERE id = ? AND user_id = ?")
            .bind(item_id)
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    })
    .await?;

    Ok(deleted > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wardrobe_common::auth::upsert_user;
    use wardrobe_common::db::init_memory_pool;

    fn new_item(user_id: &str, name: &str) -> NewClothingItem {
        NewClothingItem {
            user_id: user_id.to_string(),
            name: name.to_string(),
            category: "Tops".to_string(),
            tags: vec!["summer".to_string(), "casual".to_string()],
            image_url: format!("https://img/{}.jpg", name),
            favorite: true,
        }
    }

    #[tokio::test]
    async fn test_insert_and_list_newest_first() {
        let pool = init_memory_pool().await.unwrap();
        let user = upsert_user(&pool, "ada@example.com", None).await.unwrap();

        let first = insert_item(&pool, &new_item(&user.id, "tee")).await.unwrap();
        let second = insert_item(&pool, &new_item(&user.id, "shirt")).await.unwrap();

        let items = list_items(&pool, &user.id).await.unwrap();
        let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec![second.id.as_str(), first.id.as_str()]);
        assert_eq!(items[0].tags, vec!["summer", "casual"]);
        assert!(items[0].favorite);
    }

    #[tokio::test]
    async fn test_list_is_scoped_to_owner() {
        let pool = init_memory_pool().await.unwrap();
        let ada = upsert_user(&pool, "ada@example.com", None).await.unwrap();
        let bob = upsert_user(&pool, "bob@example.com", None).await.unwrap();

        insert_item(&pool, &new_item(&ada.id, "tee")).await.unwrap();

        assert_eq!(list_items(&pool, &ada.id).await.unwrap().len(), 1);
        assert!(list_items(&pool, &bob.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_requires_ownership() {
        let pool = init_memory_pool().await.unwrap();
        let ada = upsert_user(&pool, "ada@example.com", None).await.unwrap();
        let bob = upsert_user(&pool, "bob@example.com", None).await.unwrap();
        let item = insert_item(&pool, &new_item(&ada.id, "tee")).await.unwrap();

        assert!(!delete_item(&pool, &bob.id, &item.id).await.unwrap());
        assert!(delete_item(&pool, &ada.id, &item.id).await.unwrap());
        assert!(!delete_item(&pool, &ada.id, &item.id).await.unwrap());
    }
}
