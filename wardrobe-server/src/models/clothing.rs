//! Closet item models

use serde::Serialize;
use wardrobe_common::db::ClothingItemRow;

/// Clothing item as returned to the web client
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClothingItem {
    pub id: String,
    pub name: String,
    pub category: String,
    pub tags: Vec<String>,
    pub image_url: String,
    pub favorite: bool,
}

impl From<ClothingItemRow> for ClothingItem {
    fn from(row: ClothingItemRow) -> Self {
        let tags = row.tag_list();
        Self {
            id: row.id,
            name: row.name,
            category: row.category,
            tags,
            image_url: row.image_url,
            favorite: row.favourite,
        }
    }
}

/// Fields for a new closet entry, after the photo has been hosted
#[derive(Debug, Clone)]
pub struct NewClothingItem {
    pub user_id: String,
    pub name: String,
    pub category: String,
    pub tags: Vec<String>,
    pub image_url: String,
    pub favorite: bool,
}
