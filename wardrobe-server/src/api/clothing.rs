//! Closet endpoints

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    routing::{delete, get},
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;

use super::auth::AuthUser;
use super::upload::{UploadForm, MAX_UPLOAD_BYTES};
use crate::db::clothing;
use crate::error::{ApiError, ApiResult};
use crate::models::{ClothingItem, NewClothingItem};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub data: T,
}

/// GET /api/clothing
pub async fn list_clothing(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<DataResponse<Vec<ClothingItem>>>> {
    let items = clothing::list_items(&state.db, auth.id()).await?;
    Ok(Json(DataResponse { data: items }))
}

/// POST /api/clothing
///
/// Multipart form: `file`, `name`, `category`, repeated `tags`, `favorite`.
pub async fn add_clothing(
    State(state): State<AppState>,
    auth: AuthUser,
    multipart: Multipart,
) -> ApiResult<Json<DataResponse<ClothingItem>>> {
    let mut form = UploadForm::read(multipart).await?;

    let (name, category) = match (form.text("name"), form.text("category")) {
        (Some(name), Some(category)) => (name.to_string(), category.to_string()),
        _ => {
            return Err(ApiError::BadRequest(
                "File, name and category are required".to_string(),
            ))
        }
    };
    let tags = form.all("tags");
    let favorite = form.text("favorite") == Some("true");
    let file = form.file.take().ok_or_else(|| {
        ApiError::BadRequest("File, name and category are required".to_string())
    })?;

    let image_url = state.image_host.upload_image(file).await?;

    let item = clothing::insert_item(
        &state.db,
        &NewClothingItem {
            user_id: auth.id().to_string(),
            name,
            category,
            tags,
            image_url,
            favorite,
        },
    )
    .await?;

    info!(user_id = %auth.id(), item_id = %item.id, category = %item.category, "Clothing item added");

    Ok(Json(DataResponse { data: item }))
}

/// DELETE /api/clothing/:id
pub async fn delete_clothing(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(item_id): Path<String>,
) -> ApiResult<Json<Value>> {
    if !clothing::delete_item(&state.db, auth.id(), &item_id).await? {
        return Err(ApiError::NotFound("Item not found".to_string()));
    }

    info!(user_id = %auth.id(), item_id = %item_id, "Clothing item deleted");

    Ok(Json(json!({ "success": true })))
}

/// Build closet routes
pub fn clothing_routes() -> Router<AppState> {
    Router::new()
        .route("/api/clothing", get(list_clothing).post(add_clothing))
        .route("/api/clothing/:id", delete(delete_clothing))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}
