//! Structured logging for Bendline.
//!
//! Console plus rolling NDJSON output, typed pipeline events, and secret
//! redaction applied before anything reaches a log line.

pub mod event_logger;
pub mod logger;
pub mod redact;

pub use event_logger::{PipelineEvent, PipelineEventLogger, PipelineLogEntry};
pub use logger::init_logger;
pub use redact::redact_sensitive_data;
