//! Delivery Event Logger
//!
//! One structured record per trigger firing and per subscriber outcome, emitted
//! through `tracing` under the `delivery_events` target so the JSON file layer
//! captures them as NDJSON.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::redact::redact_sensitive_data;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeliveryEvent {
    TriggerFired {
        manual: bool,
    },
    Delivered {
        subscriber_id: i64,
    },
    Skipped {
        subscriber_id: i64,
        reason: String,
    },
    Failed {
        subscriber_id: i64,
        error_kind: String,
        error_msg: String,
    },
    FallbackUsed {
        source: String,
        error_msg: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct DeliveryLogEntry {
    pub trigger: String,
    pub timestamp: DateTime<Utc>,
    pub event: DeliveryEvent,
}

pub struct EventLogger;

impl EventLogger {
    /// Record an event for `trigger`. Error text is redacted before it is logged.
    pub fn log_event(trigger: &str, mut event: DeliveryEvent) -> DeliveryLogEntry {
        let failure = match &mut event {
            DeliveryEvent::Failed { error_msg, .. } | DeliveryEvent::FallbackUsed { error_msg, .. } => {
                *error_msg = redact_sensitive_data(error_msg);
                true
            }
            _ => false,
        };

        let entry = DeliveryLogEntry {
            trigger: trigger.to_string(),
            timestamp: Utc::now(),
            event,
        };

        let json = serde_json::to_string(&entry).unwrap_or_default();
        if failure {
            warn!(target: "delivery_events", trigger = %entry.trigger, event = %json, "Delivery event");
        } else {
            info!(target: "delivery_events", trigger = %entry.trigger, event = %json, "Delivery event");
        }
        entry
    }
}
