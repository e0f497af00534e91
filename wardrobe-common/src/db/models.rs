//! Row models for the persisted tables

use serde::Serialize;
use sqlx::FromRow;

/// `users` table row
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UserRow {
    pub id: String,
    pub name: Option<String>,
    pub email: String,
    pub image: Option<String>,
    pub credits: i64,
    pub created_at: String,
}

/// `clothing_items` table row
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ClothingItemRow {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub category: String,
    pub image_url: String,
    /// JSON array of tag strings
    pub tags: String,
    pub favourite: bool,
    pub wears: i64,
    pub last_worn: Option<String>,
    pub created_at: String,
}

impl ClothingItemRow {
    /// Decode the stored tag list; a corrupt value reads as no tags
    pub fn tag_list(&self) -> Vec<String> {
        serde_json::from_str(&self.tags).unwrap_or_default()
    }
}
