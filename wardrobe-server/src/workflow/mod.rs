//! Virtual try-on workflow
//!
//! The pipeline applies garments one by one and narrates its progress into
//! an `EventSink`; the HTTP handler backs that sink with an NDJSON response
//! body.

pub mod pipeline;
pub mod stream;

pub use pipeline::{PipelineSettings, TryOnPipeline, FATAL_ERROR_MESSAGE};
pub use stream::{encode_event, ndjson_channel, EventSink, NdjsonSink, SinkError, NDJSON_CONTENT_TYPE};
