//! Timeout-bounded prayer-time and calendar resolution.
//!
//! Prayer times never fail: any error or timeout yields [`FALLBACK_TIMES`].
//! Calendar lookups yield `None` instead.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use wird_core::{HijriDate, Location, Prayer, TimeOfDay, TimeSource, WirdError, WirdResult};
use wird_logging::{DeliveryEvent, EventLogger};

use crate::occasions::{check_occasion, is_day_before_white_days};

pub const FALLBACK_TIMES: [(Prayer, &str); 5] = [
    (Prayer::Fajr, "05:00"),
    (Prayer::Dhuhr, "12:30"),
    (Prayer::Asr, "15:45"),
    (Prayer::Maghrib, "18:15"),
    (Prayer::Isha, "19:45"),
];

const EVENT_TRIGGER: &str = "time_resolver";

pub struct PrayerTimeResolver {
    source: Arc<dyn TimeSource>,
    timeout: Duration,
}

impl PrayerTimeResolver {
    pub fn new(source: Arc<dyn TimeSource>, timeout: Duration) -> Self {
        Self { source, timeout }
    }

    /// Raw `HH:MM` strings for the five prayers, in prayer order.
    pub async fn resolve(&self, location: &Location) -> Vec<(Prayer, String)> {
        let fetched = match tokio::time::timeout(self.timeout, self.source.named_times(location))
            .await
        {
            Ok(Ok(times)) => times,
            Ok(Err(e)) => return fallback(location, &e),
            Err(_) => {
                let e = WirdError::TimeSource(format!("timed out after {:?}", self.timeout));
                return fallback(location, &e);
            }
        };

        FALLBACK_TIMES
            .iter()
            .map(|(prayer, default)| {
                let found = fetched
                    .iter()
                    .find(|(name, _)| Prayer::from_name(name) == Some(*prayer))
                    .map(|(_, time)| time.clone());
                match found {
                    Some(time) => (*prayer, time),
                    None => {
                        debug!(%prayer, location = %location, "No time returned; using fallback");
                        (*prayer, default.to_string())
                    }
                }
            })
            .collect()
    }

    /// Resolved times shifted by `offset_minutes`. An entry that does not parse is
    /// returned as an error so the caller can skip just that prayer.
    pub async fn resolve_adjusted(
        &self,
        location: &Location,
        offset_minutes: i32,
    ) -> Vec<(Prayer, WirdResult<TimeOfDay>)> {
        self.resolve(location)
            .await
            .into_iter()
            .map(|(prayer, raw)| {
                let adjusted = raw
                    .parse::<TimeOfDay>()
                    .map(|t| t.adjust(offset_minutes))
                    .map_err(|_| WirdError::malformed(prayer.name(), raw));
                (prayer, adjusted)
            })
            .collect()
    }

    /// Today's hijri date, `None` when the calendar is unavailable.
    pub async fn today(&self) -> Option<HijriDate> {
        match tokio::time::timeout(self.timeout, self.source.calendar_day()).await {
            Ok(Ok(date)) => Some(date),
            Ok(Err(e)) => {
                warn!(error = %e, "Hijri calendar unavailable");
                None
            }
            Err(_) => {
                warn!(timeout = ?self.timeout, "Hijri calendar lookup timed out");
                None
            }
        }
    }

    /// Today's date together with its occasion label, if today is one.
    pub async fn today_occasion(&self) -> Option<(HijriDate, String)> {
        let date = self.today().await?;
        let label = check_occasion(&date)?;
        Some((date, label))
    }

    pub async fn is_eve_of_white_days(&self) -> bool {
        self.today()
            .await
            .is_some_and(|date| is_day_before_white_days(&date))
    }
}

fn fallback(location: &Location, error: &WirdError) -> Vec<(Prayer, String)> {
    EventLogger::log_event(
        EVENT_TRIGGER,
        DeliveryEvent::FallbackUsed {
            source: format!("prayer_times:{}", location.key()),
            error_msg: error.to_string(),
        },
    );
    FALLBACK_TIMES
        .iter()
        .map(|(prayer, time)| (*prayer, time.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    enum Behavior {
        Times(Vec<(&'static str, &'static str)>),
        Fail,
        Hang,
        Day(u32, u32),
    }

    struct FakeSource(Behavior);

    #[async_trait]
    impl TimeSource for FakeSource {
        async fn named_times(&self, _location: &Location) -> WirdResult<Vec<(String, String)>> {
            match &self.0 {
                Behavior::Times(times) => Ok(times
                    .iter()
                    .map(|(n, t)| (n.to_string(), t.to_string()))
                    .collect()),
                Behavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(vec![])
                }
                _ => Err(WirdError::TimeSource("connection refused".into())),
            }
        }

        async fn calendar_day(&self) -> WirdResult<HijriDate> {
            match &self.0 {
                Behavior::Day(month, day) => Ok(HijriDate {
                    day: *day,
                    month: *month,
                    month_name: "محرم".into(),
                    year: "1448".into(),
                }),
                Behavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Err(WirdError::TimeSource("unreachable".into()))
                }
                _ => Err(WirdError::TimeSource("connection refused".into())),
            }
        }
    }

    fn resolver(behavior: Behavior) -> PrayerTimeResolver {
        PrayerTimeResolver::new(Arc::new(FakeSource(behavior)), Duration::from_secs(10))
    }

    fn makkah() -> Location {
        Location::new("Makkah", "Saudi Arabia")
    }

    fn fallback_strings() -> Vec<(Prayer, String)> {
        FALLBACK_TIMES
            .iter()
            .map(|(p, t)| (*p, t.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn failure_yields_fallback_table() {
        let times = resolver(Behavior::Fail).resolve(&makkah()).await;
        assert_eq!(times, fallback_strings());
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_yields_fallback_table() {
        let times = resolver(Behavior::Hang).resolve(&makkah()).await;
        assert_eq!(times, fallback_strings());
    }

    #[tokio::test]
    async fn missing_prayers_are_filled_in_order() {
        let times = resolver(Behavior::Times(vec![("Isha", "20:01"), ("fajr", "04:40")]))
            .resolve(&makkah())
            .await;
        assert_eq!(times[0], (Prayer::Fajr, "04:40".to_string()));
        assert_eq!(times[1], (Prayer::Dhuhr, "12:30".to_string()));
        assert_eq!(times[4], (Prayer::Isha, "20:01".to_string()));
    }

    #[tokio::test]
    async fn adjusted_times_wrap_and_report_malformed() {
        let adjusted = resolver(Behavior::Times(vec![
            ("Fajr", "bogus"),
            ("Dhuhr", "12:00"),
            ("Asr", "15:30"),
            ("Maghrib", "18:00"),
            ("Isha", "23:58"),
        ]))
        .resolve_adjusted(&makkah(), 5)
        .await;

        assert_eq!(adjusted[0].1.as_ref().unwrap_err().kind(), "malformed_preference");
        assert_eq!(adjusted[1].1.as_ref().unwrap().to_string(), "12:05");
        assert_eq!(adjusted[4].1.as_ref().unwrap().to_string(), "00:03");
    }

    #[tokio::test]
    async fn calendar_variants() {
        assert!(resolver(Behavior::Day(4, 12)).is_eve_of_white_days().await);
        assert!(!resolver(Behavior::Day(4, 13)).is_eve_of_white_days().await);
        assert!(!resolver(Behavior::Fail).is_eve_of_white_days().await);

        let (date, label) = resolver(Behavior::Day(1, 1)).today_occasion().await.unwrap();
        assert_eq!(date.day, 1);
        assert_eq!(label, "🌙 رأس السنة الهجرية");
        assert!(resolver(Behavior::Day(2, 3)).today_occasion().await.is_none());
        assert!(resolver(Behavior::Fail).today_occasion().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn calendar_timeout_is_none() {
        assert!(resolver(Behavior::Hang).today().await.is_none());
    }
}
