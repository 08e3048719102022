use std::time::Duration;

use anyhow::{Context, Result};
use wird_config::WirdConfig;
use wird_core::Location;
use wird_scheduler::{EngineSettings, Pacing};

/// Engine knobs derived from the loaded config.
pub fn engine_settings(config: &WirdConfig) -> EngineSettings {
    let defaults = EngineSettings::default();

    let mut fixed = defaults.fixed;
    fixed.extend(config.schedule.fixed.clone());

    let random_dhikr_windows = if config.schedule.random_dhikr_windows.is_empty() {
        defaults.random_dhikr_windows
    } else {
        config
            .schedule
            .random_dhikr_windows
            .iter()
            .map(|w| (w.start_hour, w.end_hour))
            .collect()
    };

    EngineSettings {
        corpus_size: config.content.corpus_size,
        max_batch_size: config.delivery.max_batch_size,
        pacing: Pacing {
            item: Duration::from_millis(config.delivery.item_pacing_ms),
            batch: Duration::from_millis(config.delivery.batch_pacing_ms),
        },
        default_utc_offset: config.schedule.utc_offset_hours,
        prayer_offset_minutes: config.schedule.prayer_offset_minutes,
        refresh_time: config.schedule.refresh_time.clone(),
        default_location: default_location(config),
        fixed,
        random_dhikr_windows,
    }
}

pub fn default_location(config: &WirdConfig) -> Location {
    Location::new(config.location.city.trim(), config.location.country.trim())
}

/// The bot token, required by anything that talks to Telegram.
pub fn bot_token(config: &WirdConfig) -> Result<String> {
    config
        .telegram
        .bot_token
        .clone()
        .filter(|t| !t.trim().is_empty())
        .context("telegram.botToken is not set (or export BOT_TOKEN)")
}
