//! Telemetry and structured logging for the Wird reminder engine.
//!
//! Console plus daily-rolling NDJSON output, bot-token redaction, and
//! per-delivery event records.

pub mod event_logger;
pub mod logger;
pub mod redact;

pub use event_logger::{DeliveryEvent, DeliveryLogEntry, EventLogger};
pub use logger::init_logger;
pub use redact::redact_sensitive_data;
