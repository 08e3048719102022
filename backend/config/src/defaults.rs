//! Config defaults: fills in values that depend on more than a single field.

use crate::schema::{HourWindow, WirdConfig};

/// Built-in times for the fixed daily reminders.
pub const DEFAULT_FIXED_TRIGGERS: &[(&str, &str)] = &[
    ("morning_azkar", "06:00"),
    ("evening_azkar", "17:00"),
    ("mulk", "22:00"),
    ("friday_kahf", "08:00"),
    ("occasions", "07:00"),
    ("white_days", "20:00"),
    ("qiyam", "02:00"),
];

/// Late morning and mid afternoon.
pub const DEFAULT_RANDOM_DHIKR_WINDOWS: &[HourWindow] = &[
    HourWindow { start_hour: 10, end_hour: 11 },
    HourWindow { start_hour: 15, end_hour: 16 },
];

pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Apply all defaults to a freshly loaded config.
pub fn apply_all_defaults(config: WirdConfig) -> WirdConfig {
    apply_all_defaults_with(config, std::env::var("BOT_TOKEN").ok())
}

/// Same as [`apply_all_defaults`] with an explicit token fallback (for tests).
pub fn apply_all_defaults_with(config: WirdConfig, env_token: Option<String>) -> WirdConfig {
    let config = apply_telegram_defaults(config, env_token);
    let config = apply_schedule_defaults(config);
    apply_logging_defaults(config)
}

/// Fall back to the `BOT_TOKEN` environment variable.
fn apply_telegram_defaults(mut config: WirdConfig, env_token: Option<String>) -> WirdConfig {
    let missing = config
        .telegram
        .bot_token
        .as_deref()
        .map_or(true, |t| t.trim().is_empty());
    if missing {
        config.telegram.bot_token = env_token.filter(|t| !t.trim().is_empty());
    }
    config
}

/// Fill in any fixed trigger the file does not override, and the random windows.
fn apply_schedule_defaults(mut config: WirdConfig) -> WirdConfig {
    for (name, time) in DEFAULT_FIXED_TRIGGERS {
        config
            .schedule
            .fixed
            .entry((*name).to_string())
            .or_insert_with(|| (*time).to_string());
    }
    if config.schedule.random_dhikr_windows.is_empty() {
        config.schedule.random_dhikr_windows = DEFAULT_RANDOM_DHIKR_WINDOWS.to_vec();
    }
    config
}

fn apply_logging_defaults(mut config: WirdConfig) -> WirdConfig {
    if config.logging.level.as_deref().map_or(true, str::is_empty) {
        config.logging.level = Some(DEFAULT_LOG_LEVEL.to_string());
    }
    if config.logging.dir.as_deref().map_or(true, str::is_empty) {
        config.logging.dir = Some(DEFAULT_LOG_DIR.to_string());
    }
    config
}
