//! wardrobe-server library interface
//!
//! Exposes the router and application state for the binary and for
//! integration tests.

pub mod api;
pub mod db;
pub mod error;
pub mod logging;
pub mod models;
pub mod services;
pub mod workflow;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::services::{CheckoutProvider, ImageHost, TryOnModel};
use crate::workflow::PipelineSettings;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Model used by the try-on pipeline
    pub tryon_model: Arc<dyn TryOnModel>,
    /// Host for uploaded photos
    pub image_host: Arc<dyn ImageHost>,
    /// Payment page provider for credit purchases
    pub checkout: Arc<dyn CheckoutProvider>,
    pub pipeline_settings: PipelineSettings,
    /// Public URL of the web client, used for checkout redirects
    pub public_base_url: String,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        tryon_model: Arc<dyn TryOnModel>,
        image_host: Arc<dyn ImageHost>,
        checkout: Arc<dyn CheckoutProvider>,
    ) -> Self {
        Self {
            db,
            tryon_model,
            image_host,
            checkout,
            pipeline_settings: PipelineSettings::default(),
            public_base_url: wardrobe_common::config::CheckoutConfig::default().public_base_url,
            startup_time: Utc::now(),
        }
    }

    pub fn with_pipeline_settings(mut self, settings: PipelineSettings) -> Self {
        self.pipeline_settings = settings;
        self
    }

    pub fn with_public_base_url(mut self, url: impl Into<String>) -> Self {
        self.public_base_url = url.into();
        self
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::auth_routes())
        .merge(api::user_routes())
        .merge(api::upload_routes())
        .merge(api::clothing_routes())
        .merge(api::checkout_routes())
        .merge(api::tryon_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
