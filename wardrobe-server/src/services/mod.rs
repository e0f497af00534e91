//! Clients for the external services the wardrobe delegates to
//!
//! Each collaborator sits behind a trait so handlers and the try-on pipeline
//! can run against stubs in tests.

pub mod checkout;
pub mod fal_client;
pub mod media_host;

pub use checkout::{CheckoutError, CheckoutSession, CreditOrder, StripeClient};
pub use fal_client::{FalClient, InferenceError};
pub use media_host::{CloudinaryClient, ImageUpload, MediaHostError};

use async_trait::async_trait;
use tokio::sync::mpsc;

/// Channel on which a model reports batches of new log lines
pub type ModelLogSender = mpsc::UnboundedSender<Vec<String>>;

/// Image-synthesis model that dresses a person in one garment
#[async_trait]
pub trait TryOnModel: Send + Sync {
    /// Composite `garment_image_url` onto `human_image_url`
    ///
    /// Returns `Ok(None)` when the model finished without producing an image.
    /// Any log lines observed while waiting are sent on `logs`; a closed
    /// receiver is ignored.
    async fn apply_garment(
        &self,
        human_image_url: &str,
        garment_image_url: &str,
        logs: ModelLogSender,
    ) -> Result<Option<String>, InferenceError>;

    /// Whether credentials are present
    fn is_configured(&self) -> bool {
        true
    }
}

/// Cloud media host for user photos
#[async_trait]
pub trait ImageHost: Send + Sync {
    /// Upload an image and return its public HTTPS URL
    async fn upload_image(&self, upload: ImageUpload) -> Result<String, MediaHostError>;

    fn is_configured(&self) -> bool {
        true
    }
}

/// Hosted payment page for credit purchases
#[async_trait]
pub trait CheckoutProvider: Send + Sync {
    async fn create_session(&self, order: &CreditOrder) -> Result<CheckoutSession, CheckoutError>;

    fn is_configured(&self) -> bool {
        true
    }
}
