//! User profile model

use serde::Serialize;
use wardrobe_common::db::UserRow;

/// `GET /api/user/profile` response
///
/// `full_body_image` mirrors `image`: the full-body upload replaces the
/// profile picture.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub name: Option<String>,
    pub email: String,
    pub image: Option<String>,
    pub full_body_image: Option<String>,
}

impl From<UserRow> for Profile {
    fn from(row: UserRow) -> Self {
        Self {
            full_body_image: row.image.clone(),
            id: row.id,
            name: row.name,
            email: row.email,
            image: row.image,
        }
    }
}
