//! Access Event Logger
//!
//! One structured event per dispatched request, emitted on the `keygate_access` target.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::redact::redact_sensitive_data;

pub const ACCESS_TARGET: &str = "keygate_access";

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AccessEvent {
    /// The application handler ran.
    Dispatched { status: u16 },
    /// The pipeline stopped before (or instead of) the handler.
    Rejected { status: u16, reason: String },
}

impl AccessEvent {
    pub fn status(&self) -> u16 {
        match self {
            AccessEvent::Dispatched { status } | AccessEvent::Rejected { status, .. } => *status,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AccessLogEntry {
    pub request_id: String,
    pub node: String,
    pub route: String,
    pub method: String,
    pub sender: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub event: AccessEvent,
}

pub struct AccessLogger;

impl AccessLogger {
    /// Redact free-text fields and write the entry through `tracing`.
    pub fn log_event(mut entry: AccessLogEntry) -> AccessLogEntry {
        if let AccessEvent::Rejected { reason, .. } = &mut entry.event {
            *reason = redact_sensitive_data(reason);
        }

        let json = serde_json::to_string(&entry).unwrap_or_default();
        match &entry.event {
            AccessEvent::Dispatched { .. } => {
                info!(target: ACCESS_TARGET, request_id = %entry.request_id, entry = %json, "Request dispatched")
            }
            AccessEvent::Rejected { .. } => {
                warn!(target: ACCESS_TARGET, request_id = %entry.request_id, entry = %json, "Request rejected")
            }
        }
        entry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(event: AccessEvent) -> AccessLogEntry {
        AccessLogEntry {
            request_id: "req-1".into(),
            node: "node".into(),
            route: "/".into(),
            method: "GET".into(),
            sender: Some("127.0.0.1".into()),
            timestamp: Utc::now(),
            event,
        }
    }

    #[test]
    fn rejection_reason_is_redacted() {
        let reason = r#"body {"signature":"MEUCIQ=="}"#.to_string();
        let logged = AccessLogger::log_event(entry(AccessEvent::Rejected { status: 400, reason }));
        match logged.event {
            AccessEvent::Rejected { reason, .. } => assert!(!reason.contains("MEUCIQ")),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn serializes_with_type_tag() {
        let logged = AccessLogger::log_event(entry(AccessEvent::Dispatched { status: 200 }));
        let json = serde_json::to_value(&logged).unwrap();
        assert_eq!(json["event"]["type"], "dispatched");
        assert_eq!(json["event"]["status"], 200);
        assert_eq!(logged.event.status(), 200);
    }
}
