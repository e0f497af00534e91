//! fal.ai queue client for the virtual try-on model
//!
//! A request is submitted to the queue, its status polled (with logs) until
//! it completes, then the result document is fetched. Only the composite
//! image URL is taken from the result.

use super::{ModelLogSender, TryOnModel};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use wardrobe_common::config::FalConfig;

const USER_AGENT: &str = concat!("wardrobe-server/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Inference client errors
///
/// All of these are transport-level failures; a job that completes without
/// an image is `Ok(None)`, not an error.
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Inference job failed: {0}")]
    Job(String),

    #[error("Inference API key not configured")]
    NotConfigured,
}

#[derive(Debug, Serialize)]
struct TryOnInput<'a> {
    human_image_url: &'a str,
    garment_image_url: &'a str,
}

#[derive(Debug, Deserialize)]
struct QueueSubmission {
    request_id: String,
    status_url: Option<String>,
    response_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueueStatus {
    status: String,
    #[serde(default)]
    logs: Option<Vec<QueueLog>>,
    queue_position: Option<u64>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueueLog {
    message: String,
}

/// fal.ai queue API client
#[derive(Debug, Clone)]
pub struct FalClient {
    http: reqwest::Client,
    api_key: Option<String>,
    model: String,
    queue_url: String,
    poll_interval: Duration,
}

impl FalClient {
    pub fn new(
        api_key: Option<String>,
        model: impl Into<String>,
        queue_url: impl Into<String>,
        poll_interval: Duration,
    ) -> Result<Self, InferenceError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| InferenceError::Network(e.to_string()))?;

        Ok(Self {
            http,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model: model.into().trim_matches('/').to_string(),
            queue_url: queue_url.into().trim_end_matches('/').to_string(),
            poll_interval,
        })
    }

    pub fn from_config(config: &FalConfig) -> Result<Self, InferenceError> {
        Self::new(
            config.api_key.clone(),
            config.model.clone(),
            config.queue_url.clone(),
            Duration::from_millis(config.poll_interval_ms),
        )
    }

    fn api_key(&self) -> Result<&str, InferenceError> {
        self.api_key.as_deref().ok_or(InferenceError::NotConfigured)
    }

    async fn submit(
        &self,
        human_image_url: &str,
        garment_image_url: &str,
    ) -> Result<QueueSubmission, InferenceError> {
        let url = format!("{}/{}", self.queue_url, self.model);

        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Key {}", self.api_key()?))
            .json(&TryOnInput {
                human_image_url,
                garment_image_url,
            })
            .send()
            .await
            .map_err(|e| InferenceError::Network(e.to_string()))?;

        let submission: QueueSubmission = checked(response)
            .await?
            .json()
            .await
            .map_err(|e| InferenceError::Parse(e.to_string()))?;

        tracing::debug!(request_id = %submission.request_id, "Try-on request queued");

        Ok(submission)
    }

    /// Poll until the job completes, forwarding log lines not yet seen
    async fn wait_for_completion(
        &self,
        status_url: &str,
        logs: &ModelLogSender,
    ) -> Result<(), InferenceError> {
        let mut seen_logs = 0usize;

        loop {
            let response = self
                .http
                .get(status_url)
                .query(&[("logs", "1")])
                .header("Authorization", format!("Key {}", self.api_key()?))
                .send()
                .await
                .map_err(|e| InferenceError::Network(e.to_string()))?;

            let status: QueueStatus = checked(response)
                .await?
                .json()
                .await
                .map_err(|e| InferenceError::Parse(e.to_string()))?;

            let lines = status.logs.unwrap_or_default();
            if lines.len() > seen_logs {
                let fresh: Vec<String> = lines[seen_logs..]
                    .iter()
                    .map(|log| log.message.clone())
                    .collect();
                seen_logs = lines.len();
                // Receiver may be gone if the caller stopped listening
                let _ = logs.send(fresh);
            }

            match status.status.as_str() {
                "COMPLETED" => {
                    if let Some(error) = status.error {
                        return Err(InferenceError::Job(error));
                    }
                    return Ok(());
                }
                "IN_QUEUE" => {
                    tracing::trace!(position = ?status.queue_position, "Try-on request waiting in queue");
                }
                "IN_PROGRESS" => {}
                other => {
                    return Err(InferenceError::Job(format!("Unexpected queue status: {}", other)));
                }
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn fetch_result(&self, response_url: &str) -> Result<Option<String>, InferenceError> {
        let response = self
            .http
            .get(response_url)
            .header("Authorization", format!("Key {}", self.api_key()?))
            .send()
            .await
            .map_err(|e| InferenceError::Network(e.to_string()))?;

        let document: Value = checked(response)
            .await?
            .json()
            .await
            .map_err(|e| InferenceError::Parse(e.to_string()))?;

        Ok(extract_image_url(&document))
    }
}

#[async_trait]
impl TryOnModel for FalClient {
    async fn apply_garment(
        &self,
        human_image_url: &str,
        garment_image_url: &str,
        logs: ModelLogSender,
    ) -> Result<Option<String>, InferenceError> {
        let submission = self.submit(human_image_url, garment_image_url).await?;

        let request_base = format!(
            "{}/{}/requests/{}",
            self.queue_url, self.model, submission.request_id
        );
        let status_url = submission
            .status_url
            .unwrap_or_else(|| format!("{}/status", request_base));
        let response_url = submission.response_url.unwrap_or(request_base);

        self.wait_for_completion(&status_url, &logs).await?;
        let image = self.fetch_result(&response_url).await?;

        tracing::info!(
            request_id = %submission.request_id,
            has_image = image.is_some(),
            "Try-on request finished"
        );

        Ok(image)
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

/// Turn a non-success HTTP status into `InferenceError::Api`
async fn checked(response: reqwest::Response) -> Result<reqwest::Response, InferenceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(InferenceError::Api(status.as_u16(), body))
}

/// Composite URL from a result document (`image.url`, else `images[0].url`)
fn extract_image_url(document: &Value) -> Option<String> {
    document
        .pointer("/image/url")
        .or_else(|| document.pointer("/images/0/url"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(str::to_string)
}
