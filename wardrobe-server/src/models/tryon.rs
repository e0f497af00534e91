//! Virtual try-on request and progress event types
//!
//! Nothing here is persisted: a request lives for one HTTP call and each
//! event is serialized onto the response stream as soon as it is built.

use serde::{Deserialize, Serialize};
use wardrobe_common::Error;

/// One garment to composite onto the current image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GarmentRef {
    /// Display label, e.g. "Tops"
    pub category: String,
    /// Garment photo; absent or blank means "not selected"
    #[serde(default, rename = "imageUrl", alias = "imageRef")]
    pub image_url: Option<String>,
}

impl GarmentRef {
    pub fn new(category: impl Into<String>, image_url: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            image_url: Some(image_url.into()),
        }
    }

    /// Garment with no image, skipped by the pipeline
    pub fn unselected(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            image_url: None,
        }
    }

    /// Image URL if the garment was actually selected
    pub fn selected_image(&self) -> Option<&str> {
        self.image_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}

/// `POST /api/virtual-tryon` body as sent by the web client
#[derive(Debug, Clone, Deserialize)]
pub struct TryOnBody {
    #[serde(default, rename = "humanImage", alias = "baseImage")]
    pub human_image: Option<String>,
    #[serde(default, rename = "clothingItems", alias = "garments")]
    pub clothing_items: Option<Vec<GarmentRef>>,
}

impl TryOnBody {
    /// Validate into a runnable request
    pub fn into_request(self) -> Result<TryOnRequest, Error> {
        let base_image = self.human_image.unwrap_or_default();
        let garments = self.clothing_items.unwrap_or_default();
        TryOnRequest::new(base_image, garments)
    }
}

/// Validated try-on request: a base image and a non-empty garment list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TryOnRequest {
    pub base_image: String,
    pub garments: Vec<GarmentRef>,
}

impl TryOnRequest {
    pub fn new(base_image: impl Into<String>, garments: Vec<GarmentRef>) -> Result<Self, Error> {
        let base_image = base_image.into().trim().to_string();
        if base_image.is_empty() {
            return Err(Error::InvalidInput("Base image is required".to_string()));
        }
        if garments.is_empty() {
            return Err(Error::InvalidInput(
                "At least one clothing item is required".to_string(),
            ));
        }
        Ok(Self {
            base_image,
            garments,
        })
    }

    pub fn total_steps(&self) -> usize {
        self.garments.len()
    }
}

/// One line of the try-on progress stream
///
/// Serialized as a flat JSON object with a `"type"` discriminant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ProgressEvent {
    /// A garment step is starting
    #[serde(rename_all = "camelCase")]
    Progress {
        message: String,
        step_index: usize,
        total_steps: usize,
        current_category: String,
    },
    /// Log lines reported by the model while it works
    ModelProgress { message: String },
    /// A garment was applied; `intermediate_image` is the new current image
    #[serde(rename_all = "camelCase")]
    ItemComplete {
        message: String,
        step_index: usize,
        total_steps: usize,
        current_category: String,
        intermediate_image: String,
    },
    /// Terminal success event
    #[serde(rename_all = "camelCase")]
    Complete {
        message: String,
        result_image: String,
    },
    /// A step failure, or the terminal fatal failure
    Error { message: String },
}

impl ProgressEvent {
    pub fn progress(step_index: usize, total_steps: usize, category: &str) -> Self {
        ProgressEvent::Progress {
            message: format!("Processing {}...", category),
            step_index,
            total_steps,
            current_category: category.to_string(),
        }
    }

    pub fn model_progress(message: impl Into<String>) -> Self {
        ProgressEvent::ModelProgress {
            message: message.into(),
        }
    }

    pub fn item_complete(
        step_index: usize,
        total_steps: usize,
        category: &str,
        intermediate_image: &str,
    ) -> Self {
        ProgressEvent::ItemComplete {
            message: format!("{} applied successfully!", category),
            step_index,
            total_steps,
            current_category: category.to_string(),
            intermediate_image: intermediate_image.to_string(),
        }
    }

    pub fn complete(result_image: &str) -> Self {
        ProgressEvent::Complete {
            message: "Virtual try-on complete!".to_string(),
            result_image: result_image.to_string(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ProgressEvent::Error {
            message: message.into(),
        }
    }

    /// Wire discriminant
    pub fn event_type(&self) -> &'static str {
        match self {
            ProgressEvent::Progress { .. } => "progress",
            ProgressEvent::ModelProgress { .. } => "modelProgress",
            ProgressEvent::ItemComplete { .. } => "itemComplete",
            ProgressEvent::Complete { .. } => "complete",
            ProgressEvent::Error { .. } => "error",
        }
    }
}

/// How a pipeline run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// `complete` was written with this image
    Completed { result_image: String },
    /// A fatal `error` was written; no `complete` follows
    Failed { message: String },
    /// The client went away; nothing more could be written
    Disconnected,
}
