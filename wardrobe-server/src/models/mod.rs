//! API data models

pub mod clothing;
pub mod tryon;
pub mod user;

pub use clothing::{ClothingItem, NewClothingItem};
pub use tryon::{GarmentRef, PipelineOutcome, ProgressEvent, TryOnBody, TryOnRequest};
pub use user::Profile;
