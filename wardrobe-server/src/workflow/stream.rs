//! Newline-delimited JSON event stream
//!
//! Each `ProgressEvent` becomes one JSON object followed by `\n`, pushed onto
//! a bounded channel that feeds the HTTP response body. A full channel makes
//! the writer wait; a dropped body makes every later write fail with
//! `SinkError::Closed`.

use crate::models::ProgressEvent;
use async_trait::async_trait;
use axum::body::{Body, Bytes};
use std::convert::Infallible;
use thiserror::Error;
use tokio::sync::mpsc;

/// Media type of the try-on progress stream
pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

#[derive(Debug, Error)]
pub enum SinkError {
    /// The reader went away (client disconnected)
    #[error("Event stream closed")]
    Closed,

    #[error("Failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Destination for pipeline events, written one at a time in order
#[async_trait]
pub trait EventSink: Send {
    async fn emit(&mut self, event: ProgressEvent) -> Result<(), SinkError>;
}

/// Serialize one event as a single NDJSON line
pub fn encode_event(event: &ProgressEvent) -> Result<Bytes, SinkError> {
    let mut line = serde_json::to_vec(event)?;
    line.push(b'\n');
    Ok(Bytes::from(line))
}

/// Sink writing encoded lines into a response body channel
#[derive(Debug)]
pub struct NdjsonSink {
    tx: mpsc::Sender<Bytes>,
}

#[async_trait]
impl EventSink for NdjsonSink {
    async fn emit(&mut self, event: ProgressEvent) -> Result<(), SinkError> {
        let line = encode_event(&event)?;
        self.tx.send(line).await.map_err(|_| SinkError::Closed)
    }
}

/// Create a sink and the response body it feeds
///
/// The body ends once the sink is dropped and buffered lines are drained.
pub fn ndjson_channel(capacity: usize) -> (NdjsonSink, Body) {
    let (tx, mut rx) = mpsc::channel::<Bytes>(capacity.max(1));

    let stream = async_stream::stream! {
        while let Some(line) = rx.recv().await {
            yield Ok::<_, Infallible>(line);
        }
    };

    (NdjsonSink { tx }, Body::from_stream(stream))
}

/// In-memory sink, mainly for exercising the pipeline without HTTP
#[async_trait]
impl EventSink for Vec<ProgressEvent> {
    async fn emit(&mut self, event: ProgressEvent) -> Result<(), SinkError> {
        self.push(event);
        Ok(())
    }
}
