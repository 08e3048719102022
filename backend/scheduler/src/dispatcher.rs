//! Fan-out to many subscribers with per-subscriber failure isolation.

use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use tracing::info;

use wird_core::{Subscriber, WirdResult};
use wird_logging::{DeliveryEvent, EventLogger};

/// Delays between sends to one subscriber.
#[derive(Debug, Clone, Copy)]
pub struct Pacing {
    /// Between single-item sends within one delivery.
    pub item: Duration,
    /// Between successive media groups for the same subscriber.
    pub batch: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            item: Duration::from_millis(300),
            batch: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl BroadcastReport {
    pub fn total(&self) -> usize {
        self.delivered + self.skipped + self.failed
    }
}

/// Deliver to every subscriber whose selector yields `true` (absent counts as
/// `true`). A failing delivery is logged and the fan-out continues.
pub async fn broadcast<S, D, Fut>(
    trigger: &str,
    subscribers: Vec<Subscriber>,
    selector: S,
    deliver: D,
) -> BroadcastReport
where
    S: Fn(&Subscriber) -> Option<bool>,
    D: Fn(Subscriber) -> Fut,
    Fut: Future<Output = WirdResult<()>>,
{
    let mut report = BroadcastReport::default();

    for subscriber in subscribers {
        let id = subscriber.id;
        if !selector(&subscriber).unwrap_or(true) {
            report.skipped += 1;
            EventLogger::log_event(
                trigger,
                DeliveryEvent::Skipped {
                    subscriber_id: id,
                    reason: "disabled".into(),
                },
            );
            continue;
        }

        match deliver(subscriber).await {
            Ok(()) => {
                report.delivered += 1;
                EventLogger::log_event(trigger, DeliveryEvent::Delivered { subscriber_id: id });
            }
            Err(e) => {
                report.failed += 1;
                EventLogger::log_event(
                    trigger,
                    DeliveryEvent::Failed {
                        subscriber_id: id,
                        error_kind: e.kind().to_string(),
                        error_msg: e.to_string(),
                    },
                );
            }
        }
    }

    info!(
        trigger,
        delivered = report.delivered,
        skipped = report.skipped,
        failed = report.failed,
        "Broadcast finished"
    );
    report
}
