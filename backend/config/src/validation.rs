//! Config validation: field checks with user-friendly error messages.

use thiserror::Error;
use wird_core::TimeOfDay;

use crate::schema::WirdConfig;

#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// A collection of validation errors found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate the config and return a report of all errors and warnings.
pub fn validate(config: &WirdConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_telegram(config, &mut report);
    validate_schedule(config, &mut report);
    validate_delivery(config, &mut report);
    validate_content(config, &mut report);
    validate_calendar(config, &mut report);
    report
}

fn validate_telegram(config: &WirdConfig, report: &mut ValidationReport) {
    if config.telegram.bot_token.is_none() {
        report.error("telegram.botToken", "No bot token configured (set BOT_TOKEN)");
    }
}

/// Bad fixed times are only warnings: that one trigger is skipped at start-up.
fn validate_schedule(config: &WirdConfig, report: &mut ValidationReport) {
    let schedule = &config.schedule;
    if !(-12..=14).contains(&schedule.utc_offset_hours) {
        report.error(
            "schedule.utcOffsetHours",
            format!("{} is not a valid UTC offset", schedule.utc_offset_hours),
        );
    }
    if schedule.refresh_time.parse::<TimeOfDay>().is_err() {
        report.error(
            "schedule.refreshTime",
            format!("'{}' is not HH:MM", schedule.refresh_time),
        );
    }
    for (name, time) in &schedule.fixed {
        if time.parse::<TimeOfDay>().is_err() {
            report.warn(
                format!("schedule.fixed.{name}"),
                format!("'{time}' is not HH:MM; trigger will be skipped"),
            );
        }
    }
    for (i, window) in schedule.random_dhikr_windows.iter().enumerate() {
        if window.start_hour > window.end_hour || window.end_hour > 23 {
            report.error(
                format!("schedule.randomDhikrWindows[{i}]"),
                "window must satisfy startHour <= endHour <= 23",
            );
        }
    }
}

fn validate_delivery(config: &WirdConfig, report: &mut ValidationReport) {
    let delivery = &config.delivery;
    if !(2..=10).contains(&delivery.max_batch_size) {
        report.error(
            "delivery.maxBatchSize",
            format!("{} is outside the media group limits 2..=10", delivery.max_batch_size),
        );
    }
    if delivery.item_pacing_ms == 0 {
        report.warn(
            "delivery.itemPacingMs",
            "No pacing between item sends; large deliveries may hit rate limits",
        );
    }
}

fn validate_content(config: &WirdConfig, report: &mut ValidationReport) {
    if config.content.corpus_size == 0 {
        report.error("content.corpusSize", "Corpus size must be positive");
    }
}

fn validate_calendar(config: &WirdConfig, report: &mut ValidationReport) {
    if !(1..=60).contains(&config.calendar.timeout_secs) {
        report.warn(
            "calendar.timeoutSecs",
            "Timeout should be between 1 and 60 seconds",
        );
    }
    if config.location.city.trim().is_empty() {
        report.error("location.city", "Default city cannot be empty");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::apply_all_defaults_with;

    fn valid_config() -> WirdConfig {
        apply_all_defaults_with(WirdConfig::default(), Some("123:abc".into()))
    }

    #[test]
    fn defaults_with_token_are_valid() {
        let report = validate(&valid_config());
        assert!(report.is_valid(), "{:?}", report.errors);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn missing_token_is_an_error() {
        let config = apply_all_defaults_with(WirdConfig::default(), None);
        let report = validate(&config);
        assert!(report.errors.iter().any(|e| e.path == "telegram.botToken"));
    }

    #[test]
    fn malformed_fixed_time_is_a_warning() {
        let mut config = valid_config();
        config.schedule.fixed.insert("mulk".into(), "25:00".into());
        let report = validate(&config);
        assert!(report.is_valid());
        assert_eq!(report.warnings[0].path, "schedule.fixed.mulk");
    }

    #[test]
    fn batch_size_limits() {
        let mut config = valid_config();
        config.delivery.max_batch_size = 11;
        assert!(!validate(&config).is_valid());
        config.delivery.max_batch_size = 1;
        assert!(!validate(&config).is_valid());
    }
}
