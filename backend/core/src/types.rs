use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{WirdError, WirdResult};
use crate::time::TimeOfDay;

/// Telegram user or chat id the subscriber record is keyed by.
pub type SubscriberId = i64;

/// Chat id messages are delivered to. Equal to the subscriber id for groups and channels.
pub type ChatTarget = i64;

/// Number of pages in the rotating Qur'an corpus.
pub const QURAN_PAGES: u32 = 604;

pub const DEFAULT_DAILY_PAGES: u32 = 2;
pub const DEFAULT_QURAN_TIME: &str = "09:00";

/// Independent per-subscriber feature switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureFlag {
    /// Surah al-Baqarah pages after each prayer (extra corpus).
    Baqarah,
    MorningAzkar,
    EveningAzkar,
    /// Surah al-Kahf on Fridays.
    Kahf,
    /// Surah al-Mulk before sleep.
    Mulk,
    /// Reminder on the eve of the white days.
    WhiteDays,
}

impl FeatureFlag {
    pub const ALL: [FeatureFlag; 6] = [
        FeatureFlag::Baqarah,
        FeatureFlag::MorningAzkar,
        FeatureFlag::EveningAzkar,
        FeatureFlag::Kahf,
        FeatureFlag::Mulk,
        FeatureFlag::WhiteDays,
    ];

    /// Every flag is on for new subscribers except the extra-corpus delivery.
    pub fn default_enabled(self) -> bool {
        !matches!(self, FeatureFlag::Baqarah)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FeatureFlag::Baqarah => "baqarah",
            FeatureFlag::MorningAzkar => "morning_azkar",
            FeatureFlag::EveningAzkar => "evening_azkar",
            FeatureFlag::Kahf => "kahf",
            FeatureFlag::Mulk => "mulk",
            FeatureFlag::WhiteDays => "white_days",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|f| f.as_str() == name)
    }
}

impl fmt::Display for FeatureFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// City/country pair used to look up prayer times.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Location {
    pub city: String,
    pub country: String,
}

impl Location {
    pub fn new(city: impl Into<String>, country: impl Into<String>) -> Self {
        Self {
            city: city.into(),
            country: country.into(),
        }
    }

    /// Stable key used in derived trigger names.
    pub fn key(&self) -> String {
        format!("{}/{}", self.city.trim(), self.country.trim())
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.city, self.country)
    }
}

/// The five daily prayers, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Prayer {
    Fajr,
    Dhuhr,
    Asr,
    Maghrib,
    Isha,
}

impl Prayer {
    pub const ALL: [Prayer; 5] = [
        Prayer::Fajr,
        Prayer::Dhuhr,
        Prayer::Asr,
        Prayer::Maghrib,
        Prayer::Isha,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Prayer::Fajr => "Fajr",
            Prayer::Dhuhr => "Dhuhr",
            Prayer::Asr => "Asr",
            Prayer::Maghrib => "Maghrib",
            Prayer::Isha => "Isha",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for Prayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A resolved hijri calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HijriDate {
    pub day: u32,
    pub month: u32,
    pub month_name: String,
    pub year: String,
}

/// One subscriber record.
///
/// Every preference is optional so rows written by older schema versions load
/// cleanly; accessors apply the documented defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscriber {
    pub id: SubscriberId,
    pub chat_id: ChatTarget,
    #[serde(default)]
    pub daily_pages: Option<u32>,
    #[serde(default)]
    pub current_page: Option<u32>,
    #[serde(default)]
    pub quran_time: Option<String>,
    #[serde(default)]
    pub flags: HashMap<FeatureFlag, bool>,
    #[serde(default)]
    pub utc_offset: Option<i32>,
    #[serde(default)]
    pub location: Option<Location>,
}

impl Subscriber {
    pub fn new(id: SubscriberId, chat_id: ChatTarget) -> Self {
        Self {
            id,
            chat_id,
            daily_pages: None,
            current_page: None,
            quran_time: None,
            flags: HashMap::new(),
            utc_offset: None,
            location: None,
        }
    }

    /// Stored value of a flag, `None` when the record predates it.
    pub fn flag_value(&self, flag: FeatureFlag) -> Option<bool> {
        self.flags.get(&flag).copied()
    }

    /// Effective value of a flag with its default applied.
    pub fn flag(&self, flag: FeatureFlag) -> bool {
        self.flag_value(flag).unwrap_or(flag.default_enabled())
    }

    pub fn daily_pages(&self) -> u32 {
        self.daily_pages
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_DAILY_PAGES)
    }

    /// Cursor into a corpus of `corpus_size` pages, normalized into `[1, corpus_size]`.
    pub fn cursor(&self, corpus_size: u32) -> u32 {
        match self.current_page {
            Some(page) if (1..=corpus_size).contains(&page) => page,
            _ => 1,
        }
    }

    /// Personal delivery time. A stored value that does not parse is reported
    /// rather than silently replaced.
    pub fn quran_time(&self) -> WirdResult<TimeOfDay> {
        match self.quran_time.as_deref() {
            None => DEFAULT_QURAN_TIME.parse(),
            Some(raw) => raw
                .parse()
                .map_err(|_| WirdError::malformed("quran_time", raw)),
        }
    }

    pub fn utc_offset_or(&self, default_hours: i32) -> i32 {
        self.utc_offset.unwrap_or(default_hours)
    }
}

/// One explicit preference mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum PreferenceChange {
    DailyPages(u32),
    QuranTime(TimeOfDay),
    UtcOffset(i32),
    Flag(FeatureFlag, bool),
    Location(Option<Location>),
    Cursor(u32),
}

impl PreferenceChange {
    pub fn field(&self) -> &'static str {
        match self {
            PreferenceChange::DailyPages(_) => "daily_pages",
            PreferenceChange::QuranTime(_) => "quran_time",
            PreferenceChange::UtcOffset(_) => "timezone_offset",
            PreferenceChange::Flag(flag, _) => flag.as_str(),
            PreferenceChange::Location(_) => "location",
            PreferenceChange::Cursor(_) => "current_page",
        }
    }

    /// Whether the subscriber's personal trigger must be re-derived.
    pub fn reschedules_personal(&self) -> bool {
        matches!(
            self,
            PreferenceChange::QuranTime(_) | PreferenceChange::UtcOffset(_)
        )
    }

    /// Whether prayer-linked triggers must be re-derived.
    pub fn reschedules_prayers(&self) -> bool {
        matches!(self, PreferenceChange::Location(_))
    }

    /// Apply the change to an in-memory record.
    pub fn apply(&self, subscriber: &mut Subscriber) {
        match self {
            PreferenceChange::DailyPages(n) => subscriber.daily_pages = Some(*n),
            PreferenceChange::QuranTime(t) => subscriber.quran_time = Some(t.to_string()),
            PreferenceChange::UtcOffset(h) => subscriber.utc_offset = Some(*h),
            PreferenceChange::Flag(flag, on) => {
                subscriber.flags.insert(*flag, *on);
            }
            PreferenceChange::Location(loc) => subscriber.location = loc.clone(),
            PreferenceChange::Cursor(page) => subscriber.current_page = Some(*page),
        }
    }
}

/// What the settings screen shows about a subscriber's rotating delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryPreview {
    pub daily_pages: u32,
    pub current_page: u32,
    pub quran_time: String,
}
