use std::collections::BTreeMap;
use std::time::Duration;

use wird_core::{Location, QURAN_PAGES};

use crate::dispatcher::Pacing;

/// Runtime knobs for the reminder engine, built from the loaded config.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub corpus_size: u32,
    pub max_batch_size: usize,
    pub pacing: Pacing,
    /// Offset fixed triggers and subscribers without their own are interpreted in.
    pub default_utc_offset: i32,
    pub prayer_offset_minutes: i32,
    pub refresh_time: String,
    pub default_location: Location,
    /// Fixed trigger name → `HH:MM`.
    pub fixed: BTreeMap<String, String>,
    /// Inclusive hour windows for the random dhikr triggers.
    pub random_dhikr_windows: Vec<(u8, u8)>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            corpus_size: QURAN_PAGES,
            max_batch_size: 10,
            pacing: Pacing {
                item: Duration::from_millis(300),
                batch: Duration::from_millis(500),
            },
            default_utc_offset: 3,
            prayer_offset_minutes: 5,
            refresh_time: "00:30".into(),
            default_location: Location::new("Makkah", "Saudi Arabia"),
            fixed: [
                ("morning_azkar", "06:00"),
                ("evening_azkar", "17:00"),
                ("mulk", "22:00"),
                ("friday_kahf", "08:00"),
                ("occasions", "07:00"),
                ("white_days", "20:00"),
                ("qiyam", "02:00"),
            ]
            .into_iter()
            .map(|(name, time)| (name.to_string(), time.to_string()))
            .collect(),
            random_dhikr_windows: vec![(10, 11), (15, 16)],
        }
    }
}
