//! Cloudinary signed upload client

use super::ImageHost;
use async_trait::async_trait;
use axum::body::Bytes;
use serde::Deserialize;
use sha1::{Digest, Sha1};
use std::time::Duration;
use thiserror::Error;
use wardrobe_common::config::MediaConfig;

const USER_AGENT: &str = concat!("wardrobe-server/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum MediaHostError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Upload rejected ({0}): {1}")]
    Rejected(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Media host credentials not configured")]
    NotConfigured,
}

/// Image bytes received from the client
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
    error: Option<UploadErrorBody>,
}

#[derive(Debug, Deserialize)]
struct UploadErrorBody {
    message: String,
}

#[derive(Debug, Clone)]
struct Credentials {
    cloud_name: String,
    api_key: String,
    api_secret: String,
}

/// Cloudinary upload API client
#[derive(Debug, Clone)]
pub struct CloudinaryClient {
    http: reqwest::Client,
    credentials: Option<Credentials>,
    folder: String,
    api_url: String,
}

impl CloudinaryClient {
    pub fn from_config(config: &MediaConfig) -> Result<Self, MediaHostError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| MediaHostError::NetworkError(e.to_string()))?;

        let credentials = match (&config.cloud_name, &config.api_key, &config.api_secret) {
            (Some(cloud_name), Some(api_key), Some(api_secret)) => Some(Credentials {
                cloud_name: cloud_name.clone(),
                api_key: api_key.clone(),
                api_secret: api_secret.clone(),
            }),
            _ => None,
        };

        Ok(Self {
            http,
            credentials,
            folder: config.folder.clone(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }
}

/// Upload signature: SHA-1 hex of the sorted, `&`-joined params plus the secret
pub fn sign_params(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut sorted: Vec<_> = params.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let joined = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");
    format!("{:x}", Sha1::digest(format!("{}{}", joined, api_secret).as_bytes()))
}

#[async_trait]
impl ImageHost for CloudinaryClient {
    async fn upload_image(&self, upload: ImageUpload) -> Result<String, MediaHostError> {
        let credentials = self
            .credentials
            .as_ref()
            .ok_or(MediaHostError::NotConfigured)?;

        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = sign_params(
            &[("folder", self.folder.as_str()), ("timestamp", timestamp.as_str())],
            &credentials.api_secret,
        );

        let mut part = reqwest::multipart::Part::bytes(upload.bytes.to_vec())
            .file_name(upload.file_name.clone());
        if let Some(content_type) = &upload.content_type {
            part = part
                .mime_str(content_type)
                .map_err(|e| MediaHostError::ParseError(e.to_string()))?;
        }

        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("api_key", credentials.api_key.clone())
            .text("timestamp", timestamp)
            .text("folder", self.folder.clone())
            .text("signature", signature);

        let url = format!("{}/{}/image/upload", self.api_url, credentials.cloud_name);
        let response = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| MediaHostError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(MediaHostError::Rejected(
                status.as_u16(),
                rejection_message(&text),
            ));
        }

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| MediaHostError::ParseError(e.to_string()))?;

        let secure_url = body
            .secure_url
            .ok_or_else(|| MediaHostError::ParseError("missing secure_url".to_string()))?;

        tracing::info!(file_name = %upload.file_name, url = %secure_url, "Image uploaded");

        Ok(secure_url)
    }

    fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }
}

/// Error message from a rejected upload; falls back to the raw body
fn rejection_message(text: &str) -> String {
    serde_json::from_str::<UploadResponse>(text)
        .ok()
        .and_then(|body| body.error)
        .map(|e| e.message)
        .unwrap_or_else(|| {
            let text = text.trim();
            if text.is_empty() {
                "unknown error".to_string()
            } else {
                text.to_string()
            }
        })
}
