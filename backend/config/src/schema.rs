//! Wird runtime configuration schema.
//!
//! Typed for serde YAML/JSON deserialization. Every section is optional in the
//! file; missing fields take the defaults below.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WirdConfig {
    #[serde(default)]
    pub telegram: TelegramConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub content: ContentConfig,

    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// Default location for prayer-linked triggers.
    #[serde(default)]
    pub location: LocationConfig,

    #[serde(default)]
    pub calendar: CalendarConfig,

    #[serde(default)]
    pub delivery: DeliveryConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub api: ApiConfig,
}

// ---------------------------------------------------------------------------
// Telegram
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelegramConfig {
    /// Bot API token. Usually `${BOT_TOKEN}`; falls back to the `BOT_TOKEN` env var.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot_token: Option<String>,
}

// ---------------------------------------------------------------------------
// Storage & content
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentConfig {
    /// Root of `quran_pages/`, `azkar/`, and `bakarah_qiyam/`.
    #[serde(default = "default_images_dir")]
    pub images_dir: String,
    #[serde(default = "default_pdf_dir")]
    pub pdf_dir: String,
    #[serde(default = "default_corpus_size")]
    pub corpus_size: u32,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            images_dir: default_images_dir(),
            pdf_dir: default_pdf_dir(),
            corpus_size: default_corpus_size(),
        }
    }
}

// ---------------------------------------------------------------------------
// Schedule
// ---------------------------------------------------------------------------

/// Inclusive hour window a random trigger time is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HourWindow {
    pub start_hour: u8,
    pub end_hour: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleConfig {
    /// Offset fixed-time triggers are interpreted in, and the default for
    /// subscribers without their own.
    #[serde(default = "default_utc_offset")]
    pub utc_offset_hours: i32,

    /// Minutes after a prayer the matching Baqarah part is sent.
    #[serde(default = "default_prayer_offset")]
    pub prayer_offset_minutes: i32,

    /// Daily time the prayer-linked triggers are re-resolved.
    #[serde(default = "default_refresh_time")]
    pub refresh_time: String,

    /// Trigger name → `HH:MM` for the fixed daily reminders.
    #[serde(default)]
    pub fixed: BTreeMap<String, String>,

    /// One window per random-dhikr trigger.
    #[serde(default)]
    pub random_dhikr_windows: Vec<HourWindow>,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            utc_offset_hours: default_utc_offset(),
            prayer_offset_minutes: default_prayer_offset(),
            refresh_time: default_refresh_time(),
            fixed: BTreeMap::new(),
            random_dhikr_windows: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Location & calendar
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationConfig {
    #[serde(default = "default_city")]
    pub city: String,
    #[serde(default = "default_country")]
    pub country: String,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            city: default_city(),
            country: default_country(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarConfig {
    #[serde(default = "default_calendar_url")]
    pub base_url: String,
    #[serde(default = "default_calendar_timeout")]
    pub timeout_secs: u64,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            base_url: default_calendar_url(),
            timeout_secs: default_calendar_timeout(),
        }
    }
}

// ---------------------------------------------------------------------------
// Delivery
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryConfig {
    /// Pause between individual item sends within one subscriber's delivery.
    #[serde(default = "default_item_pacing")]
    pub item_pacing_ms: u64,
    /// Pause between successive media groups to the same subscriber.
    #[serde(default = "default_batch_pacing")]
    pub batch_pacing_ms: u64,
    /// Items per media group. The Bot API accepts 2..=10.
    #[serde(default = "default_max_batch")]
    pub max_batch_size: usize,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            item_pacing_ms: default_item_pacing(),
            batch_pacing_ms: default_batch_pacing(),
            max_batch_size: default_max_batch(),
        }
    }
}

// ---------------------------------------------------------------------------
// Logging & admin API
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_api_bind")]
    pub bind: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind: default_api_bind(),
        }
    }
}

fn default_db_path() -> String {
    "wird_bot.db".into()
}
fn default_images_dir() -> String {
    "images".into()
}
fn default_pdf_dir() -> String {
    "pdfs".into()
}
fn default_corpus_size() -> u32 {
    wird_core::QURAN_PAGES
}
fn default_utc_offset() -> i32 {
    3
}
fn default_prayer_offset() -> i32 {
    5
}
fn default_refresh_time() -> String {
    "00:30".into()
}
fn default_city() -> String {
    "Makkah".into()
}
fn default_country() -> String {
    "Saudi Arabia".into()
}
fn default_calendar_url() -> String {
    "http://api.aladhan.com/v1".into()
}
fn default_calendar_timeout() -> u64 {
    10
}
fn default_item_pacing() -> u64 {
    300
}
fn default_batch_pacing() -> u64 {
    500
}
fn default_max_batch() -> usize {
    10
}
fn default_true() -> bool {
    true
}
fn default_api_bind() -> String {
    "127.0.0.1:8787".into()
}
