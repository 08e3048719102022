//! Triggers whose times come from data: prayer times per location and each
//! subscriber's own delivery time.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use tracing::{debug, info, warn};

use wird_core::{
    Location, PreferenceChange, Prayer, Subscriber, SubscriberId, TimeOfDay, WirdError, WirdResult,
};

use crate::deliveries::DeliveryEngine;
use crate::registry::{callback, TriggerRegistry};

pub const PRAYER_TRIGGER_PREFIX: &str = "baqarah_";
pub const PERSONAL_TRIGGER_PREFIX: &str = "daily_wird_";
pub const REFRESH_TRIGGER: &str = "prayer_refresh";

/// Subscribers sharing one set of prayer times.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationGroup {
    pub location: Location,
    /// The configured location; also holds subscribers without one.
    pub is_default: bool,
}

impl LocationGroup {
    pub fn default_group(location: Location) -> Self {
        Self {
            location,
            is_default: true,
        }
    }

    pub fn named(location: Location) -> Self {
        Self {
            location,
            is_default: false,
        }
    }

    pub fn contains(&self, subscriber: &Subscriber) -> bool {
        match &subscriber.location {
            None => self.is_default,
            Some(location) => *location == self.location,
        }
    }

    pub fn trigger_name(&self, prayer: Prayer) -> String {
        if self.is_default {
            format!("{PRAYER_TRIGGER_PREFIX}{prayer}")
        } else {
            format!("{PRAYER_TRIGGER_PREFIX}{prayer}@{}", self.location.key())
        }
    }
}

pub fn personal_trigger_name(id: SubscriberId) -> String {
    format!("{PERSONAL_TRIGGER_PREFIX}{id}")
}

#[derive(Clone)]
pub struct DynamicScheduler {
    registry: TriggerRegistry,
    engine: Arc<DeliveryEngine>,
}

impl DynamicScheduler {
    pub fn new(registry: TriggerRegistry, engine: Arc<DeliveryEngine>) -> Self {
        Self { registry, engine }
    }

    /// Register prayer triggers for every location group, every subscriber's
    /// personal trigger, and the daily prayer refresh.
    pub async fn start(&self) -> WirdResult<()> {
        self.refresh_prayer_triggers().await?;
        self.schedule_all_personal().await?;
        self.register_refresh()?;
        Ok(())
    }

    fn register_refresh(&self) -> WirdResult<()> {
        let settings = self.engine.settings();
        let time: TimeOfDay = settings
            .refresh_time
            .parse()
            .map_err(|_| WirdError::malformed("refresh_time", settings.refresh_time.clone()))?;

        let scheduler = self.clone();
        self.registry.register(
            REFRESH_TRIGGER,
            time,
            settings.default_utc_offset,
            callback(move |_ctx| {
                let scheduler = scheduler.clone();
                async move {
                    if let Err(e) = scheduler.refresh_prayer_triggers().await {
                        warn!(error = %e, "Prayer trigger refresh failed");
                    }
                }
            }),
        );
        Ok(())
    }

    /// Default group first, then one group per distinct stored location, each
    /// with the UTC offset its times are read in.
    fn location_groups(&self, subscribers: &[Subscriber]) -> Vec<(LocationGroup, i32)> {
        let settings = self.engine.settings();
        let default_location = &settings.default_location;

        let mut named: BTreeMap<Location, i32> = BTreeMap::new();
        for subscriber in subscribers {
            let Some(location) = &subscriber.location else {
                continue;
            };
            if location == default_location {
                continue;
            }
            named
                .entry(location.clone())
                .or_insert_with(|| subscriber.utc_offset_or(settings.default_utc_offset));
        }

        std::iter::once((
            LocationGroup::default_group(default_location.clone()),
            settings.default_utc_offset,
        ))
        .chain(
            named
                .into_iter()
                .map(|(location, offset)| (LocationGroup::named(location), offset)),
        )
        .collect()
    }

    /// Re-resolve prayer times and re-register every prayer trigger. Groups
    /// no subscriber belongs to any more are canceled. Returns the number of
    /// triggers registered.
    pub async fn refresh_prayer_triggers(&self) -> WirdResult<usize> {
        let subscribers = self.engine.store().all().await?;
        let offset_minutes = self.engine.settings().prayer_offset_minutes;
        let mut live = HashSet::new();

        for (group, utc_offset) in self.location_groups(&subscribers) {
            let times = self
                .engine
                .calendar()
                .resolve_adjusted(&group.location, offset_minutes)
                .await;

            for (prayer, time) in times {
                let name = group.trigger_name(prayer);
                let time = match time {
                    Ok(time) => time,
                    Err(e) => {
                        warn!(trigger = %name, error = %e, "Skipping prayer trigger");
                        continue;
                    }
                };

                let engine = self.engine.clone();
                let group = group.clone();
                self.registry.register(
                    name.clone(),
                    time,
                    utc_offset,
                    callback(move |ctx| {
                        let engine = engine.clone();
                        let group = group.clone();
                        async move {
                            engine.baqarah_part(&ctx.trigger, prayer, &group).await;
                        }
                    }),
                );
                live.insert(name);
            }
        }

        for stale in self.registry.names_with_prefix(PRAYER_TRIGGER_PREFIX) {
            if !live.contains(&stale) {
                self.registry.cancel(&stale);
                debug!(trigger = %stale, "Dropped stale prayer trigger");
            }
        }

        info!(count = live.len(), "Prayer triggers refreshed");
        Ok(live.len())
    }

    /// Replace the subscriber's personal trigger. Returns `false` when the
    /// stored time does not parse; the subscriber then has no personal trigger.
    pub fn schedule_personal(&self, subscriber: &Subscriber) -> bool {
        let name = personal_trigger_name(subscriber.id);
        self.registry.cancel(&name);

        let time = match subscriber.quran_time() {
            Ok(time) => time,
            Err(e) => {
                warn!(trigger = %name, error = %e, "Skipping personal trigger");
                return false;
            }
        };
        let offset = subscriber.utc_offset_or(self.engine.settings().default_utc_offset);

        let engine = self.engine.clone();
        let id = subscriber.id;
        self.registry.register(
            name,
            time,
            offset,
            callback(move |ctx| {
                let engine = engine.clone();
                async move {
                    if let Err(e) = engine.daily_wird(&ctx.trigger, id).await {
                        warn!(trigger = %ctx.trigger, error = %e, "Daily wird failed");
                    }
                }
            }),
        );
        true
    }

    pub async fn schedule_all_personal(&self) -> WirdResult<usize> {
        let subscribers = self.engine.store().all().await?;
        let scheduled = subscribers
            .iter()
            .filter(|s| self.schedule_personal(s))
            .count();
        info!(scheduled, total = subscribers.len(), "Personal triggers scheduled");
        Ok(scheduled)
    }

    /// Re-derive whatever triggers `change` affects. Expects the change to be
    /// stored already.
    pub async fn on_preference_changed(
        &self,
        id: SubscriberId,
        change: &PreferenceChange,
    ) -> WirdResult<()> {
        if change.reschedules_personal() {
            let subscriber = self
                .engine
                .store()
                .get(id)
                .await?
                .ok_or(WirdError::UnknownSubscriber(id))?;
            self.schedule_personal(&subscriber);
        }
        if change.reschedules_prayers() {
            self.refresh_prayer_triggers().await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{harness, Harness, Sent};
    use std::time::Duration;
    use wird_core::{ContentAsset, SubscriberStore};

    const MAKKAH: &[(&str, &str)] = &[
        ("Fajr", "04:30"),
        ("Dhuhr", "12:20"),
        ("Asr", "15:40"),
        ("Maghrib", "18:30"),
        ("Isha", "23:58"),
    ];

    fn scheduler(h: &Harness) -> (TriggerRegistry, DynamicScheduler) {
        let registry = TriggerRegistry::new(h.clock.clone());
        let dynamic = DynamicScheduler::new(registry.clone(), h.engine.clone());
        (registry, dynamic)
    }

    fn time_of(registry: &TriggerRegistry, name: &str) -> Option<(String, i32)> {
        registry
            .list()
            .into_iter()
            .find(|t| t.name == name)
            .map(|t| (t.time, t.utc_offset_hours))
    }

    #[tokio::test(start_paused = true)]
    async fn start_registers_every_dynamic_trigger() {
        let h = harness();
        h.time_source.set_times("Makkah", MAKKAH);
        h.time_source.set_times("Cairo", MAKKAH);
        h.store.upsert(1, 1).await.unwrap();
        h.store.upsert(2, 2).await.unwrap();
        h.store
            .set_field(2, &PreferenceChange::Location(Some(Location::new("Cairo", "Egypt"))))
            .await
            .unwrap();
        h.store.set_field(2, &PreferenceChange::UtcOffset(2)).await.unwrap();

        let (registry, dynamic) = scheduler(&h);
        dynamic.start().await.unwrap();

        assert_eq!(registry.names_with_prefix(PRAYER_TRIGGER_PREFIX).len(), 10);
        assert_eq!(time_of(&registry, "baqarah_Fajr"), Some(("04:35".into(), 3)));
        assert_eq!(time_of(&registry, "baqarah_Isha"), Some(("00:03".into(), 3)));
        assert_eq!(
            time_of(&registry, "baqarah_Fajr@Cairo/Egypt"),
            Some(("04:35".into(), 2))
        );
        assert_eq!(time_of(&registry, "daily_wird_1"), Some(("09:00".into(), 3)));
        assert_eq!(time_of(&registry, "daily_wird_2"), Some(("09:00".into(), 2)));
        assert_eq!(time_of(&registry, REFRESH_TRIGGER), Some(("00:30".into(), 3)));
        registry.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_prayer_time_skips_only_that_prayer() {
        let h = harness();
        h.time_source.set_times(
            "Makkah",
            &[
                ("Fajr", "04:30"),
                ("Dhuhr", "12:20"),
                ("Asr", "bogus"),
                ("Maghrib", "18:30"),
                ("Isha", "20:00"),
            ],
        );
        let (registry, dynamic) = scheduler(&h);
        assert_eq!(dynamic.refresh_prayer_triggers().await.unwrap(), 4);
        assert!(!registry.contains("baqarah_Asr"));
        assert!(registry.contains("baqarah_Maghrib"));
        registry.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn unavailable_source_uses_fallback_times() {
        let h = harness();
        let (registry, dynamic) = scheduler(&h);
        dynamic.refresh_prayer_triggers().await.unwrap();
        assert_eq!(time_of(&registry, "baqarah_Dhuhr"), Some(("12:35".into(), 3)));
        registry.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn location_change_drops_stale_group() {
        let h = harness();
        h.time_source.set_times("Makkah", MAKKAH);
        h.time_source.set_times("Cairo", MAKKAH);
        h.store.upsert(2, 2).await.unwrap();
        let cairo = PreferenceChange::Location(Some(Location::new("Cairo", "Egypt")));
        h.store.set_field(2, &cairo).await.unwrap();

        let (registry, dynamic) = scheduler(&h);
        dynamic.refresh_prayer_triggers().await.unwrap();
        assert!(registry.contains("baqarah_Asr@Cairo/Egypt"));

        let cleared = PreferenceChange::Location(None);
        h.store.set_field(2, &cleared).await.unwrap();
        dynamic.on_preference_changed(2, &cleared).await.unwrap();
        assert_eq!(registry.names_with_prefix(PRAYER_TRIGGER_PREFIX).len(), 5);
        assert!(!registry.contains("baqarah_Asr@Cairo/Egypt"));
        registry.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn personal_time_change_replaces_trigger() {
        let h = harness();
        h.store.upsert(1, 1).await.unwrap();
        let (registry, dynamic) = scheduler(&h);
        dynamic.schedule_all_personal().await.unwrap();

        let change = PreferenceChange::QuranTime("21:15".parse().unwrap());
        h.store.set_field(1, &change).await.unwrap();
        dynamic.on_preference_changed(1, &change).await.unwrap();
        assert_eq!(time_of(&registry, "daily_wird_1"), Some(("21:15".into(), 3)));
        assert_eq!(registry.names_with_prefix(PERSONAL_TRIGGER_PREFIX).len(), 1);
        registry.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_personal_time_leaves_no_trigger() {
        let h = harness();
        let mut s = Subscriber::new(5, 5);
        s.quran_time = Some("9am".into());
        h.store.insert(s.clone()).await;

        let (registry, dynamic) = scheduler(&h);
        assert!(!dynamic.schedule_personal(&s));
        assert!(!registry.contains("daily_wird_5"));
    }

    #[tokio::test(start_paused = true)]
    async fn personal_trigger_delivers_at_local_time() {
        // Harness clock starts Friday 08:00 UTC; 12:00 at UTC+3 is 09:00 UTC.
        let h = harness();
        h.store.upsert(1, 1).await.unwrap();
        h.store
            .set_field(1, &PreferenceChange::QuranTime("12:00".parse().unwrap()))
            .await
            .unwrap();
        h.content.install(ContentAsset::QuranPage(1));
        h.content.install(ContentAsset::QuranPage(2));

        let (registry, dynamic) = scheduler(&h);
        dynamic.schedule_all_personal().await.unwrap();

        tokio::time::sleep(Duration::from_secs(50 * 60)).await;
        assert!(h.channel.sent().is_empty());

        tokio::time::sleep(Duration::from_secs(20 * 60)).await;
        tokio::task::yield_now().await;
        assert_eq!(
            h.channel.sent(),
            vec![Sent::Group(1, vec!["quran_page:0001".into(), "quran_page:0002".into()])]
        );
        assert_eq!(h.store.get(1).await.unwrap().unwrap().current_page, Some(3));
        registry.shutdown();
    }
}
