//! # Wardrobe Common Library
//!
//! Shared code for the wardrobe service crates:
//! - Error type and result alias
//! - TOML configuration loading with environment overrides
//! - SQLite schema, row models and lock-retry helper
//! - Session token issuance and lookup

pub mod auth;
pub mod config;
pub mod db;
pub mod error;

pub use config::{FailurePolicy, WardrobeConfig};
pub use error::{Error, Result};
