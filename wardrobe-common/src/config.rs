//! Configuration loading and resolution
//!
//! Configuration file location follows this priority order:
//! 1. Command-line argument (highest priority)
//! 2. `WARDROBE_CONFIG` environment variable
//! 3. User config file (`~/.config/wardrobe/config.toml`)
//! 4. System config file (`/etc/wardrobe/config.toml`)
//!
//! A missing config file is not an error: compiled defaults are used and a
//! warning is logged. Secrets and deployment specifics may then be supplied
//! through environment variables, which always win over the file.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "WARDROBE_CONFIG";

/// Default try-on model on the fal queue
pub const DEFAULT_FAL_MODEL: &str = "fal-ai/kling/v1-5/kolors-virtual-try-on";

/// What the try-on pipeline does when a single garment step yields no image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Report the failed step and keep going with the last good image
    #[default]
    BestEffort,
    /// Report the failed step and end the run without a result
    FailFast,
}

/// Top-level configuration file contents
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WardrobeConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub tryon: TryOnConfig,
    pub fal: FalConfig,
    pub media: MediaConfig,
    pub checkout: CheckoutConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5780,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file; `None` selects the platform data directory
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TryOnConfig {
    pub failure_policy: FailurePolicy,
    /// Upper bound for one garment step, including queue wait
    pub step_timeout_secs: u64,
}

impl Default for TryOnConfig {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::BestEffort,
            step_timeout_secs: 300,
        }
    }
}

impl TryOnConfig {
    pub fn step_timeout(&self) -> Duration {
        Duration::from_secs(self.step_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FalConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub queue_url: String,
    pub poll_interval_ms: u64,
}

impl Default for FalConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_FAL_MODEL.to_string(),
            queue_url: "https://queue.fal.run".to_string(),
            poll_interval_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    pub cloud_name: Option<String>,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub folder: String,
    pub api_url: String,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            cloud_name: None,
            api_key: None,
            api_secret: None,
            folder: "wardrobe".to_string(),
            api_url: "https://api.cloudinary.com/v1_1".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckoutConfig {
    pub secret_key: Option<String>,
    pub api_url: String,
    /// Public origin of the web front end, used for checkout redirects
    pub public_base_url: String,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            secret_key: None,
            api_url: "https://api.stripe.com".to_string(),
            public_base_url: "http://localhost:3000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub max_age_days: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { max_age_days: 30 }
    }
}

impl WardrobeConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Read and parse a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Apply process environment overrides (secrets, deployment values)
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup
    ///
    /// Empty or whitespace-only values are ignored.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("FAL_KEY") {
            self.fal.api_key = Some(v);
        }
        if let Some(v) = get("STRIPE_SECRET_KEY") {
            self.checkout.secret_key = Some(v);
        }
        if let Some(v) = get("CLOUDINARY_CLOUD_NAME") {
            self.media.cloud_name = Some(v);
        }
        if let Some(v) = get("CLOUDINARY_API_KEY") {
            self.media.api_key = Some(v);
        }
        if let Some(v) = get("CLOUDINARY_API_SECRET") {
            self.media.api_secret = Some(v);
        }
        if let Some(v) = get("WARDROBE_PUBLIC_URL") {
            self.checkout.public_base_url = v;
        }
        if let Some(v) = get("WARDROBE_DATABASE") {
            self.database.path = Some(PathBuf::from(v));
        }
        if let Some(v) = get("WARDROBE_PORT") {
            match v.parse::<u16>() {
                Ok(port) => self.server.port = port,
                Err(_) => warn!("Ignoring invalid WARDROBE_PORT value: {}", v),
            }
        }
    }

    /// Reject values the service cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.tryon.step_timeout_secs == 0 {
            return Err(Error::Config(
                "tryon.step_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.fal.poll_interval_ms == 0 {
            return Err(Error::Config(
                "fal.poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.session.max_age_days <= 0 {
            return Err(Error::Config(
                "session.max_age_days must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Database file path, falling back to the platform data directory
    pub fn database_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(default_database_path)
    }
}

/// Locates and loads the configuration file
#[derive(Debug, Clone, Default)]
pub struct ConfigResolver {
    cli_path: Option<PathBuf>,
}

impl ConfigResolver {
    pub fn new(cli_path: Option<PathBuf>) -> Self {
        Self { cli_path }
    }

    /// Find the config file to use, if any
    ///
    /// Explicit paths (CLI or environment) are returned even when the file
    /// does not exist so that `load` can report the mistake.
    pub fn locate(&self) -> Option<PathBuf> {
        // Priority 1: Command-line argument
        if let Some(path) = &self.cli_path {
            return Some(path.clone());
        }

        // Priority 2: Environment variable
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if !path.trim().is_empty() {
                return Some(PathBuf::from(path));
            }
        }

        // Priority 3/4: user then system config file
        let user_config = dirs::config_dir().map(|d| d.join("wardrobe").join("config.toml"));
        if let Some(path) = user_config {
            if path.exists() {
                return Some(path);
            }
        }

        let system_config = PathBuf::from("/etc/wardrobe/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load the configuration, apply environment overrides and validate
    pub fn load(&self) -> Result<WardrobeConfig> {
        let mut config = match self.locate() {
            Some(path) => {
                let config = WardrobeConfig::from_file(&path)?;
                info!("Loaded configuration from {}", path.display());
                config
            }
            None => {
                warn!("No configuration file found, using compiled defaults");
                WardrobeConfig::default()
            }
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }
}

/// OS-dependent default database location
fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("wardrobe"))
        .unwrap_or_else(|| PathBuf::from("./wardrobe_data"))
        .join("wardrobe.db")
}
