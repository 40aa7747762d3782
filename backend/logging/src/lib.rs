//! Structured logging for keygate.
//!
//! Handles subscriber setup (console + rolling NDJSON file), redaction of key and
//! signature material, and the per-request access event log.

pub mod event_logger;
pub mod logger;
pub mod redact;

pub use event_logger::{ACCESS_TARGET, AccessEvent, AccessLogEntry, AccessLogger};
pub use logger::init_logger;
pub use redact::redact_sensitive_data;
