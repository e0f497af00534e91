//! HTTP API handlers for wardrobe-server
//!
//! Everything under `/api` requires a session (see [`auth::AuthUser`]);
//! `/health` does not.

pub mod auth;
pub mod checkout;
pub mod clothing;
pub mod health;
pub mod upload;
pub mod user;
pub mod virtual_tryon;

pub use auth::{auth_routes, AuthUser};
pub use checkout::checkout_routes;
pub use clothing::clothing_routes;
pub use health::health_routes;
pub use upload::upload_routes;
pub use user::user_routes;
pub use virtual_tryon::tryon_routes;

use axum::{extract::rejection::JsonRejection, Json};

use crate::error::{ApiError, ApiResult};

/// Unwrap a JSON body, turning axum's rejection into a JSON 400
pub(crate) fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    body.map(|Json(value)| value)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}
