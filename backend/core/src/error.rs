use thiserror::Error;

use crate::types::{ChatTarget, SubscriberId};

/// Top-level error type for the Wird reminder engine.
///
/// Inner layers return these typed failures; the broadcast dispatcher is the
/// only place where they are turned into logged, isolated skips.
#[derive(Debug, Error)]
pub enum WirdError {
    /// The external prayer-time / hijri calendar source failed or timed out.
    #[error("time source unavailable: {0}")]
    TimeSource(String),

    #[error("content asset missing: {0}")]
    MissingContent(String),

    /// A send to one subscriber failed (blocked bot, deleted chat, rate limit).
    #[error("delivery to {target} failed: {reason}")]
    Delivery { target: ChatTarget, reason: String },

    #[error("malformed preference {field}: {value:?}")]
    MalformedPreference { field: String, value: String },

    #[error("unknown subscriber: {0}")]
    UnknownSubscriber(SubscriberId),

    #[error("unknown trigger: {0}")]
    UnknownTrigger(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl WirdError {
    /// Short, stable label used as a structured logging field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TimeSource(_) => "time_source",
            Self::MissingContent(_) => "missing_content",
            Self::Delivery { .. } => "delivery",
            Self::MalformedPreference { .. } => "malformed_preference",
            Self::UnknownSubscriber(_) => "unknown_subscriber",
            Self::UnknownTrigger(_) => "unknown_trigger",
            Self::Storage(_) => "storage",
            Self::Config(_) => "config",
            Self::Other(_) => "other",
        }
    }

    pub fn delivery(target: ChatTarget, reason: impl ToString) -> Self {
        Self::Delivery {
            target,
            reason: reason.to_string(),
        }
    }

    pub fn malformed(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::MalformedPreference {
            field: field.into(),
            value: value.into(),
        }
    }
}

pub type WirdResult<T> = Result<T, WirdError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_labels_are_stable() {
        assert_eq!(WirdError::delivery(42, "blocked").kind(), "delivery");
        assert_eq!(WirdError::malformed("quran_time", "9am").kind(), "malformed_preference");
        assert_eq!(WirdError::TimeSource("timeout".into()).kind(), "time_source");
    }

    #[test]
    fn delivery_error_mentions_target() {
        let err = WirdError::delivery(-100123, "chat not found");
        assert_eq!(err.to_string(), "delivery to -100123 failed: chat not found");
    }
}
