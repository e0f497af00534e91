//! Multipart image upload helpers and the profile photo endpoint

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    routing::post,
    Json, Router,
};
use serde::Serialize;
use tracing::info;

use super::auth::AuthUser;
use crate::db::users;
use crate::error::{ApiError, ApiResult};
use crate::services::ImageUpload;
use crate::AppState;

/// Largest accepted upload request
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Upload `type` that replaces the user's full-body photo
pub const FULL_BODY_TYPE: &str = "fullBody";

/// Text fields and the single `file` part of a multipart form
#[derive(Debug, Default)]
pub struct UploadForm {
    pub file: Option<ImageUpload>,
    pub fields: Vec<(String, String)>,
}

impl UploadForm {
    /// Read every part of the form
    pub async fn read(mut multipart: Multipart) -> ApiResult<Self> {
        let mut form = UploadForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {}", e)))?
        {
            let name = field.name().unwrap_or_default().to_string();
            if name == "file" {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read file: {}", e)))?;
                if !bytes.is_empty() {
                    form.file = Some(ImageUpload {
                        file_name,
                        content_type,
                        bytes,
                    });
                }
            } else {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Invalid field {}: {}", name, e)))?;
                form.fields.push((name, value));
            }
        }

        Ok(form)
    }

    /// First non-blank value of a text field
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .filter(|(key, _)| key == name)
            .map(|(_, value)| value.trim())
            .find(|value| !value.is_empty())
    }

    /// Every non-blank value of a repeated text field
    pub fn all(&self, name: &str) -> Vec<String> {
        self.fields
            .iter()
            .filter(|(key, _)| key == name)
            .map(|(_, value)| value.trim())
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub image_url: String,
    pub message: String,
}

/// POST /api/user/upload-image
///
/// Hosts the photo; a `fullBody` upload also becomes the profile image.
pub async fn upload_image(
    State(state): State<AppState>,
    auth: AuthUser,
    multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    let mut form = UploadForm::read(multipart).await?;
    let upload_type = form
        .text("type")
        .map(str::to_string)
        .ok_or_else(|| ApiError::BadRequest("File and type are required".to_string()))?;
    let file = form
        .file
        .take()
        .ok_or_else(|| ApiError::BadRequest("File and type are required".to_string()))?;

    let image_url = state.image_host.upload_image(file).await?;

    if upload_type == FULL_BODY_TYPE {
        users::set_image(&state.db, auth.id(), &image_url).await?;
        info!(user_id = %auth.id(), "Full-body image updated");
    }

    Ok(Json(UploadResponse {
        image_url,
        message: "Image uploaded successfully".to_string(),
    }))
}

/// Build upload routes
pub fn upload_routes() -> Router<AppState> {
    Router::new()
        .route("/api/user/upload-image", post(upload_image))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}
