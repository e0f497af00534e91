//! Sequential garment pipeline
//!
//! Garments are applied one at a time in request order. Each step feeds the
//! previous composite into the model, so step i+1 never starts before step i
//! has written all of its events.
//!
//! Failure classes:
//! - empty model result or per-step timeout: a step `error` event, then the
//!   run continues from the last good image (`best_effort`) or ends
//!   (`fail_fast`)
//! - model call failure: one fatal `error` event, no `complete`
//! - sink write failure: the run stops silently

use super::stream::{EventSink, SinkError};
use crate::models::{PipelineOutcome, ProgressEvent, TryOnRequest};
use crate::services::{InferenceError, TryOnModel};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use wardrobe_common::config::TryOnConfig;
use wardrobe_common::FailurePolicy;

/// Message of the terminal event when a model call fails outright
pub const FATAL_ERROR_MESSAGE: &str = "Failed to generate try-on image";

/// Tunables for one pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    pub failure_policy: FailurePolicy,
    /// Upper bound on a single model call
    pub step_timeout: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from(&TryOnConfig::default())
    }
}

impl From<&TryOnConfig> for PipelineSettings {
    fn from(config: &TryOnConfig) -> Self {
        Self {
            failure_policy: config.failure_policy,
            step_timeout: config.step_timeout(),
        }
    }
}

/// Result of applying one garment
#[derive(Debug)]
enum StepResult {
    /// New composite image
    Applied(String),
    /// Model finished without an image
    NoImage,
    TimedOut,
    Fatal(InferenceError),
}

/// Drives one try-on request against a model
#[derive(Clone)]
pub struct TryOnPipeline {
    model: Arc<dyn TryOnModel>,
    settings: PipelineSettings,
}

impl TryOnPipeline {
    pub fn new(model: Arc<dyn TryOnModel>, settings: PipelineSettings) -> Self {
        Self { model, settings }
    }

    /// Run every selected garment, writing events to `sink`
    ///
    /// Exactly one terminal event (`complete` or fatal `error`) is written
    /// unless the sink fails first, in which case the outcome is
    /// `Disconnected` and no further model calls are made.
    pub async fn run<S: EventSink>(&self, request: &TryOnRequest, sink: &mut S) -> PipelineOutcome {
        info!(
            total_steps = request.total_steps(),
            policy = ?self.settings.failure_policy,
            "Starting virtual try-on"
        );

        match self.drive(request, sink).await {
            Ok(outcome) => {
                match &outcome {
                    PipelineOutcome::Completed { .. } => info!("Virtual try-on complete"),
                    PipelineOutcome::Failed { message } => warn!(%message, "Virtual try-on failed"),
                    PipelineOutcome::Disconnected => {}
                }
                outcome
            }
            Err(e) => {
                debug!(error = %e, "Event sink closed, stopping try-on");
                PipelineOutcome::Disconnected
            }
        }
    }

    async fn drive<S: EventSink>(
        &self,
        request: &TryOnRequest,
        sink: &mut S,
    ) -> Result<PipelineOutcome, SinkError> {
        let total_steps = request.total_steps();
        let mut current_image = request.base_image.clone();

        for (index, garment) in request.garments.iter().enumerate() {
            let category = garment.category.as_str();
            let Some(garment_image) = garment.selected_image() else {
                debug!(step = index, category, "No image selected, skipping");
                continue;
            };

            sink.emit(ProgressEvent::progress(index, total_steps, category))
                .await?;

            let step_error = match self.apply_step(&current_image, garment_image, sink).await? {
                StepResult::Applied(image) => {
                    current_image = image;
                    sink.emit(ProgressEvent::item_complete(
                        index + 1,
                        total_steps,
                        category,
                        &current_image,
                    ))
                    .await?;
                    continue;
                }
                StepResult::NoImage => {
                    warn!(step = index, category, "Model returned no image");
                    format!("Failed to apply {}", category)
                }
                StepResult::TimedOut => {
                    warn!(
                        step = index,
                        category,
                        timeout_secs = self.settings.step_timeout.as_secs(),
                        "Model call timed out"
                    );
                    format!("Timed out applying {}", category)
                }
                StepResult::Fatal(err) => {
                    warn!(step = index, category, error = %err, "Model call failed");
                    sink.emit(ProgressEvent::error(FATAL_ERROR_MESSAGE)).await?;
                    return Ok(PipelineOutcome::Failed {
                        message: FATAL_ERROR_MESSAGE.to_string(),
                    });
                }
            };

            sink.emit(ProgressEvent::error(step_error.clone())).await?;
            if self.settings.failure_policy == FailurePolicy::FailFast {
                return Ok(PipelineOutcome::Failed {
                    message: step_error,
                });
            }
        }

        sink.emit(ProgressEvent::complete(&current_image)).await?;
        Ok(PipelineOutcome::Completed {
            result_image: current_image,
        })
    }

    /// Call the model once, relaying its log lines until it returns
    async fn apply_step<S: EventSink>(
        &self,
        human_image: &str,
        garment_image: &str,
        sink: &mut S,
    ) -> Result<StepResult, SinkError> {
        let (log_tx, mut log_rx) = mpsc::unbounded_channel::<Vec<String>>();
        let call = tokio::time::timeout(
            self.settings.step_timeout,
            self.model.apply_garment(human_image, garment_image, log_tx),
        );
        tokio::pin!(call);

        let mut logs_open = true;
        loop {
            tokio::select! {
                biased;
                batch = log_rx.recv(), if logs_open => match batch {
                    Some(lines) => relay_logs(&lines, sink).await?,
                    None => logs_open = false,
                },
                result = &mut call => {
                    while let Ok(lines) = log_rx.try_recv() {
                        relay_logs(&lines, sink).await?;
                    }
                    return Ok(classify(result));
                }
            }
        }
    }
}

async fn relay_logs<S: EventSink>(lines: &[String], sink: &mut S) -> Result<(), SinkError> {
    match join_log_lines(lines) {
        Some(message) => sink.emit(ProgressEvent::model_progress(message)).await,
        None => Ok(()),
    }
}

/// Non-blank lines joined with ", ", or `None` if nothing to report
fn join_log_lines(lines: &[String]) -> Option<String> {
    let kept: Vec<&str> = lines
        .iter()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .collect();
    if kept.is_empty() {
        None
    } else {
        Some(kept.join(", "))
    }
}

fn classify(
    result: Result<Result<Option<String>, InferenceError>, tokio::time::error::Elapsed>,
) -> StepResult {
    match result {
        Ok(Ok(Some(image))) if !image.trim().is_empty() => {
            StepResult::Applied(image.trim().to_string())
        }
        Ok(Ok(_)) => StepResult::NoImage,
        Ok(Err(err)) => StepResult::Fatal(err),
        Err(_) => StepResult::TimedOut,
    }
}
