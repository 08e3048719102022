//! What each reminder sends.
//!
//! Every method resolves its content once, then fans it out through
//! [`broadcast`]. Missing images fall back to the caption as plain text.

use std::collections::HashMap;
use std::ops::RangeInclusive;
use std::sync::{Arc, Mutex};

use chrono::Weekday;
use tracing::{debug, info, warn};

use wird_calendar::PrayerTimeResolver;
use wird_core::{
    ChatTarget, ContentAsset, ContentBlob, ContentResolver, DeliveryChannel, DeliveryPreview,
    FeatureFlag, MediaItem, PreferenceChange, Prayer, Subscriber, SubscriberId, SubscriberStore,
    WirdError, WirdResult,
};
use wird_media::{batch, captions, next_range, random_dhikr};

use crate::clock::{local_weekday, Clock};
use crate::dispatcher::{broadcast, BroadcastReport};
use crate::dynamic::LocationGroup;
use crate::settings::EngineSettings;

/// Surah al-Baqarah pages read after each prayer.
pub fn baqarah_pages(prayer: Prayer) -> RangeInclusive<u32> {
    match prayer {
        Prayer::Fajr => 1..=3,
        Prayer::Dhuhr => 4..=6,
        Prayer::Asr => 7..=9,
        Prayer::Maghrib => 10..=10,
        Prayer::Isha => 11..=12,
    }
}

pub struct DeliveryEngine {
    store: Arc<dyn SubscriberStore>,
    content: Arc<dyn ContentResolver>,
    channel: Arc<dyn DeliveryChannel>,
    calendar: Arc<PrayerTimeResolver>,
    clock: Arc<dyn Clock>,
    settings: EngineSettings,
    subscriber_locks: Mutex<HashMap<SubscriberId, Arc<tokio::sync::Mutex<()>>>>,
}

impl DeliveryEngine {
    pub fn new(
        store: Arc<dyn SubscriberStore>,
        content: Arc<dyn ContentResolver>,
        channel: Arc<dyn DeliveryChannel>,
        calendar: Arc<PrayerTimeResolver>,
        clock: Arc<dyn Clock>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            store,
            content,
            channel,
            calendar,
            clock,
            settings,
            subscriber_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn calendar(&self) -> &PrayerTimeResolver {
        &self.calendar
    }

    pub fn store(&self) -> &Arc<dyn SubscriberStore> {
        &self.store
    }

    async fn subscribers(&self, trigger: &str) -> Vec<Subscriber> {
        match self.store.all().await {
            Ok(subscribers) => subscribers,
            Err(e) => {
                warn!(trigger, error = %e, "Could not load subscribers; nothing sent");
                Vec::new()
            }
        }
    }

    async fn resolve(&self, asset: ContentAsset) -> Option<ContentBlob> {
        match self.content.resolve(asset).await {
            Ok(blob) => blob,
            Err(e) => {
                warn!(%asset, error = %e, "Content lookup failed");
                None
            }
        }
    }

    fn subscriber_lock(&self, id: SubscriberId) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self
            .subscriber_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        locks.entry(id).or_default().clone()
    }

    /// Drop `id`'s lock when no other run holds or waits on it.
    fn release_subscriber_lock(&self, id: SubscriberId) {
        let mut locks = self
            .subscriber_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if locks.get(&id).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(&id);
        }
    }

    #[cfg(test)]
    fn held_subscriber_locks(&self) -> usize {
        self.subscriber_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Send media groups in order. Single-item groups go out as a photo.
    async fn send_groups(&self, target: ChatTarget, groups: &[Vec<MediaItem>]) -> WirdResult<()> {
        let mut previous_len = 0;
        for group in groups {
            if previous_len > 0 {
                let pause = if previous_len == 1 && group.len() == 1 {
                    self.settings.pacing.item
                } else {
                    self.settings.pacing.batch
                };
                tokio::time::sleep(pause).await;
            }
            match group.as_slice() {
                [single] => {
                    self.channel
                        .send_photo(target, &single.blob, single.caption.as_deref())
                        .await?
                }
                items => self.channel.send_media_group(target, items).await?,
            }
            previous_len = group.len();
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Fixed reminders
    // ------------------------------------------------------------------

    /// One image with a caption to every subscriber with `flag` on.
    pub async fn image_reminder(
        &self,
        trigger: &str,
        asset: ContentAsset,
        caption: &str,
        flag: FeatureFlag,
    ) -> BroadcastReport {
        let blob = self.resolve(asset).await;
        if blob.is_none() {
            debug!(trigger, %asset, "Image not installed; sending caption only");
        }
        let subscribers = self.subscribers(trigger).await;
        broadcast(
            trigger,
            subscribers,
            |s| Some(s.flag(flag)),
            |s| {
                let blob = blob.as_ref();
                async move {
                    match blob {
                        Some(blob) => self.channel.send_photo(s.chat_id, blob, Some(caption)).await,
                        None => self.channel.send_text(s.chat_id, caption).await,
                    }
                }
            },
        )
        .await
    }

    pub async fn morning_azkar(&self, trigger: &str) -> BroadcastReport {
        self.image_reminder(
            trigger,
            ContentAsset::MorningAzkar,
            captions::MORNING_AZKAR,
            FeatureFlag::MorningAzkar,
        )
        .await
    }

    pub async fn evening_azkar(&self, trigger: &str) -> BroadcastReport {
        self.image_reminder(
            trigger,
            ContentAsset::EveningAzkar,
            captions::EVENING_AZKAR,
            FeatureFlag::EveningAzkar,
        )
        .await
    }

    pub async fn mulk(&self, trigger: &str) -> BroadcastReport {
        self.image_reminder(
            trigger,
            ContentAsset::SurahMulk,
            captions::SURAH_MULK,
            FeatureFlag::Mulk,
        )
        .await
    }

    /// Surah al-Kahf PDF, Fridays only. `None` on other days.
    pub async fn friday_kahf(&self, trigger: &str) -> Option<BroadcastReport> {
        let weekday = local_weekday(self.settings.default_utc_offset, self.clock.now());
        if weekday != Weekday::Fri {
            debug!(trigger, %weekday, "Not Friday; skipping");
            return None;
        }

        let pdf = self.resolve(ContentAsset::SurahKahf).await;
        let subscribers = self.subscribers(trigger).await;
        let report = broadcast(
            trigger,
            subscribers,
            |s| Some(s.flag(FeatureFlag::Kahf)),
            |s| {
                let pdf = pdf.as_ref();
                async move {
                    match pdf {
                        Some(pdf) => {
                            self.channel
                                .send_document(
                                    s.chat_id,
                                    pdf,
                                    captions::KAHF_FILE_NAME,
                                    Some(captions::FRIDAY_KAHF),
                                )
                                .await
                        }
                        None => self.channel.send_text(s.chat_id, captions::FRIDAY_KAHF).await,
                    }
                }
            },
        )
        .await;
        Some(report)
    }

    /// Plain text to every subscriber, optionally gated by a flag.
    pub async fn text_reminder(
        &self,
        trigger: &str,
        text: &str,
        flag: Option<FeatureFlag>,
    ) -> BroadcastReport {
        let subscribers = self.subscribers(trigger).await;
        broadcast(
            trigger,
            subscribers,
            |s| flag.map(|f| s.flag(f)),
            |s| async move { self.channel.send_text(s.chat_id, text).await },
        )
        .await
    }

    /// Occasion notice when today is one. `None` otherwise or when the
    /// calendar is unavailable.
    pub async fn occasions(&self, trigger: &str) -> Option<BroadcastReport> {
        let Some((date, label)) = self.calendar.today_occasion().await else {
            debug!(trigger, "No occasion today");
            return None;
        };
        info!(trigger, occasion = %label, "Occasion today");
        let text = captions::occasion(&date, &label);
        Some(self.text_reminder(trigger, &text, None).await)
    }

    /// Reminder on hijri day 12 for the white days that follow.
    pub async fn white_days_eve(&self, trigger: &str) -> Option<BroadcastReport> {
        if !self.calendar.is_eve_of_white_days().await {
            debug!(trigger, "Not the eve of the white days");
            return None;
        }
        Some(
            self.text_reminder(trigger, captions::WHITE_DAYS_EVE, Some(FeatureFlag::WhiteDays))
                .await,
        )
    }

    pub async fn qiyam(&self, trigger: &str) -> BroadcastReport {
        self.text_reminder(trigger, captions::QIYAM, None).await
    }

    pub async fn random_dhikr(&self, trigger: &str) -> BroadcastReport {
        let text = random_dhikr(&mut rand::thread_rng());
        self.text_reminder(trigger, text, None).await
    }

    // ------------------------------------------------------------------
    // Prayer-linked and personal deliveries
    // ------------------------------------------------------------------

    /// The Baqarah part for `prayer` to opted-in subscribers of `group`.
    pub async fn baqarah_part(
        &self,
        trigger: &str,
        prayer: Prayer,
        group: &LocationGroup,
    ) -> BroadcastReport {
        let pages = baqarah_pages(prayer);
        let caption = captions::baqarah_part(prayer, *pages.start(), *pages.end());

        let mut resolved = Vec::new();
        for page in pages {
            resolved.push(self.resolve(ContentAsset::BaqarahPage(page)).await);
        }
        let groups: Vec<Vec<MediaItem>> =
            batch(resolved, self.settings.max_batch_size, Some(caption.clone())).collect();

        let subscribers = self
            .subscribers(trigger)
            .await
            .into_iter()
            .filter(|s| group.contains(s))
            .collect();

        broadcast(
            trigger,
            subscribers,
            |s| Some(s.flag(FeatureFlag::Baqarah)),
            |s| {
                let (groups, caption) = (&groups, &caption);
                async move {
                    if groups.is_empty() {
                        self.channel.send_text(s.chat_id, caption).await
                    } else {
                        self.send_groups(s.chat_id, groups).await
                    }
                }
            },
        )
        .await
    }

    /// The subscriber's next Qur'an range. The cursor only advances after the
    /// pages were sent.
    pub async fn daily_wird(&self, trigger: &str, id: SubscriberId) -> WirdResult<BroadcastReport> {
        let lock = self.subscriber_lock(id);
        let result = {
            let _guard = lock.lock().await;
            self.send_daily_wird(trigger, id).await
        };
        drop(lock);
        self.release_subscriber_lock(id);
        result
    }

    async fn send_daily_wird(&self, trigger: &str, id: SubscriberId) -> WirdResult<BroadcastReport> {
        let subscriber = self
            .store
            .get(id)
            .await?
            .ok_or(WirdError::UnknownSubscriber(id))?;
        let size = self.settings.corpus_size;
        let range = next_range(subscriber.cursor(size), subscriber.daily_pages(), size);

        let mut resolved = Vec::with_capacity(range.page_count() as usize);
        for page in range.pages() {
            resolved.push(self.resolve(ContentAsset::QuranPage(page)).await);
        }
        let caption = captions::daily_wird(range.start, range.end);
        let groups: Vec<Vec<MediaItem>> =
            batch(resolved, self.settings.max_batch_size, Some(caption)).collect();

        let report = broadcast(
            trigger,
            vec![subscriber],
            |_| None,
            |s| {
                let groups = &groups;
                async move {
                    if groups.is_empty() {
                        self.channel
                            .send_text(s.chat_id, captions::PAGES_UNAVAILABLE)
                            .await
                    } else {
                        self.send_groups(s.chat_id, groups).await
                    }
                }
            },
        )
        .await;

        if report.delivered == 1 && !groups.is_empty() {
            self.store
                .set_field(id, &PreferenceChange::Cursor(range.next_cursor))
                .await?;
            debug!(
                subscriber_id = id,
                start = range.start,
                end = range.end,
                next = range.next_cursor,
                "Advanced cursor"
            );
        }
        Ok(report)
    }

    pub async fn preview(&self, id: SubscriberId) -> WirdResult<DeliveryPreview> {
        let subscriber = self
            .store
            .get(id)
            .await?
            .ok_or(WirdError::UnknownSubscriber(id))?;
        let quran_time = match subscriber.quran_time() {
            Ok(time) => time.to_string(),
            Err(_) => subscriber.quran_time.clone().unwrap_or_default(),
        };
        Ok(DeliveryPreview {
            daily_pages: subscriber.daily_pages(),
            current_page: subscriber.cursor(self.settings.corpus_size),
            quran_time,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::Pacing;
    use crate::testing::{friday_at, harness, harness_at, harness_with, Sent};
    use chrono::Duration;
    use wird_core::Location;
    use wird_store::InMemorySubscriberStore;

    async fn add(store: &InMemorySubscriberStore, id: i64, edit: impl FnOnce(&mut Subscriber)) {
        let mut s = Subscriber::new(id, id);
        edit(&mut s);
        store.insert(s).await;
    }

    #[tokio::test]
    async fn image_reminder_falls_back_to_text() {
        let h = harness();
        add(&h.store, 1, |_| {}).await;
        add(&h.store, 2, |s| {
            s.flags.insert(FeatureFlag::MorningAzkar, false);
        })
        .await;

        let report = h.engine.morning_azkar("morning_azkar").await;
        assert_eq!((report.delivered, report.skipped), (1, 1));
        assert_eq!(
            h.channel.sent(),
            vec![Sent::Text(1, captions::MORNING_AZKAR.to_string())]
        );

        h.content.install(ContentAsset::MorningAzkar);
        h.engine.morning_azkar("morning_azkar").await;
        assert!(matches!(&h.channel.sent()[1], Sent::Photo(1, _, Some(_))));
    }

    #[tokio::test]
    async fn daily_wird_advances_cursor_after_delivery() {
        let h = harness();
        add(&h.store, 7, |s| {
            s.daily_pages = Some(3);
            s.current_page = Some(603);
        })
        .await;
        for page in 600..=604 {
            h.content.install(ContentAsset::QuranPage(page));
        }

        h.engine.daily_wird("daily_wird_7", 7).await.unwrap();
        let s = h.store.get(7).await.unwrap().unwrap();
        assert_eq!(s.current_page, Some(1));
        assert_eq!(
            h.channel.sent(),
            vec![Sent::Group(
                7,
                vec!["quran_page:0603".into(), "quran_page:0604".into()]
            )]
        );
    }

    fn paced() -> EngineSettings {
        EngineSettings {
            max_batch_size: 10,
            pacing: Pacing {
                item: std::time::Duration::from_millis(300),
                batch: std::time::Duration::from_millis(500),
            },
            ..EngineSettings::default()
        }
    }

    fn page_names(pages: RangeInclusive<u32>) -> Vec<String> {
        pages.map(|p| ContentAsset::QuranPage(p).to_string()).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn long_wird_goes_out_in_paced_groups() {
        let h = harness_with(friday_at(8, 0), paced());
        add(&h.store, 7, |s| s.daily_pages = Some(23)).await;
        for page in 1..=23 {
            h.content.install(ContentAsset::QuranPage(page));
        }

        let report = h.engine.daily_wird("daily_wird_7", 7).await.unwrap();
        assert_eq!(report.delivered, 1);
        assert_eq!(
            h.channel.sent(),
            vec![
                Sent::Group(7, page_names(1..=10)),
                Sent::Group(7, page_names(11..=20)),
                Sent::Group(7, page_names(21..=23)),
            ]
        );

        let per_group = h.channel.group_captions();
        assert_eq!(per_group[0][0], Some(captions::daily_wird(1, 23)));
        let captioned = per_group.iter().flatten().filter(|c| c.is_some()).count();
        assert_eq!(captioned, 1);

        let gaps = h.channel.gaps();
        assert_eq!(gaps.len(), 2);
        assert!(gaps.iter().all(|g| *g >= std::time::Duration::from_millis(500)));

        let s = h.store.get(7).await.unwrap().unwrap();
        assert_eq!(s.current_page, Some(24));
    }

    #[tokio::test(start_paused = true)]
    async fn single_page_groups_use_item_pacing() {
        let h = harness_with(
            friday_at(8, 0),
            EngineSettings {
                max_batch_size: 1,
                ..paced()
            },
        );
        add(&h.store, 7, |s| s.daily_pages = Some(3)).await;
        for page in 1..=3 {
            h.content.install(ContentAsset::QuranPage(page));
        }

        h.engine.daily_wird("daily_wird_7", 7).await.unwrap();
        let names = page_names(1..=3);
        assert_eq!(
            h.channel.sent(),
            vec![
                Sent::Photo(7, names[0].clone(), Some(captions::daily_wird(1, 3))),
                Sent::Photo(7, names[1].clone(), None),
                Sent::Photo(7, names[2].clone(), None),
            ]
        );
        let gaps = h.channel.gaps();
        assert!(gaps.iter().all(|g| *g >= std::time::Duration::from_millis(300)));
        assert!(gaps.iter().all(|g| *g < std::time::Duration::from_millis(500)));
    }

    #[tokio::test]
    async fn concurrent_wirds_for_one_subscriber_advance_twice_and_leave_no_lock() {
        let h = harness();
        add(&h.store, 7, |s| s.daily_pages = Some(2)).await;
        add(&h.store, 8, |_| {}).await;
        for page in 1..=4 {
            h.content.install(ContentAsset::QuranPage(page));
        }

        let (a, b, c) = tokio::join!(
            h.engine.daily_wird("daily_wird_7", 7),
            h.engine.daily_wird("daily_wird_7", 7),
            h.engine.daily_wird("daily_wird_8", 8),
        );
        a.unwrap();
        b.unwrap();
        c.unwrap();

        assert_eq!(h.store.get(7).await.unwrap().unwrap().current_page, Some(5));
        assert_eq!(h.engine.held_subscriber_locks(), 0);
    }

    #[tokio::test]
    async fn failed_delivery_keeps_cursor() {
        let h = harness();
        add(&h.store, 7, |s| s.current_page = Some(10)).await;
        h.content.install(ContentAsset::QuranPage(10));
        h.content.install(ContentAsset::QuranPage(11));
        h.channel.fail_for(7);

        let report = h.engine.daily_wird("daily_wird_7", 7).await.unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(h.store.get(7).await.unwrap().unwrap().current_page, Some(10));
    }

    #[tokio::test]
    async fn missing_pages_send_a_notice_without_advancing() {
        let h = harness();
        add(&h.store, 7, |_| {}).await;

        h.engine.daily_wird("daily_wird_7", 7).await.unwrap();
        assert_eq!(
            h.channel.sent(),
            vec![Sent::Text(7, captions::PAGES_UNAVAILABLE.to_string())]
        );
        assert_eq!(h.store.get(7).await.unwrap().unwrap().current_page, None);
    }

    #[tokio::test]
    async fn single_page_goes_out_as_photo_with_caption() {
        let h = harness();
        add(&h.store, 3, |s| s.daily_pages = Some(1)).await;
        h.content.install(ContentAsset::QuranPage(1));

        h.engine.daily_wird("daily_wird_3", 3).await.unwrap();
        let sent = h.channel.sent();
        assert!(
            matches!(&sent[0], Sent::Photo(3, name, Some(c)) if name == "quran_page:0001" && c.contains("1 - 1"))
        );
        assert_eq!(h.store.get(3).await.unwrap().unwrap().current_page, Some(2));
    }

    #[tokio::test]
    async fn baqarah_reaches_only_opted_in_members_of_the_group() {
        let h = harness();
        add(&h.store, 1, |s| {
            s.flags.insert(FeatureFlag::Baqarah, true);
        })
        .await;
        add(&h.store, 2, |_| {}).await;
        add(&h.store, 3, |s| {
            s.flags.insert(FeatureFlag::Baqarah, true);
            s.location = Some(Location::new("Cairo", "Egypt"));
        })
        .await;
        for page in 1..=3 {
            h.content.install(ContentAsset::BaqarahPage(page));
        }

        let group = LocationGroup::default_group(h.settings.default_location.clone());
        let report = h
            .engine
            .baqarah_part("baqarah_Fajr", Prayer::Fajr, &group)
            .await;
        assert_eq!((report.delivered, report.skipped), (1, 1));
        assert_eq!(
            h.channel.sent(),
            vec![Sent::Group(
                1,
                vec![
                    "baqarah_page:001".into(),
                    "baqarah_page:002".into(),
                    "baqarah_page:003".into()
                ]
            )]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn kahf_only_on_friday_in_trigger_offset() {
        // Friday 21:30 UTC is already Saturday at UTC+3.
        let h = harness_at(friday_at(21, 30));
        add(&h.store, 1, |_| {}).await;
        assert!(h.engine.friday_kahf("friday_kahf").await.is_none());

        let h = harness_at(friday_at(5, 0));
        add(&h.store, 1, |_| {}).await;
        h.content.install(ContentAsset::SurahKahf);
        let report = h.engine.friday_kahf("friday_kahf").await.unwrap();
        assert_eq!(report.delivered, 1);
        assert_eq!(
            h.channel.sent(),
            vec![Sent::Document(1, captions::KAHF_FILE_NAME.to_string())]
        );

        let h = harness_at(friday_at(5, 0) + Duration::days(1));
        assert!(h.engine.friday_kahf("friday_kahf").await.is_none());
    }

    #[tokio::test]
    async fn calendar_gated_reminders() {
        let h = harness();
        add(&h.store, 1, |_| {}).await;
        add(&h.store, 2, |s| {
            s.flags.insert(FeatureFlag::WhiteDays, false);
        })
        .await;

        // Calendar offline: nothing is sent.
        assert!(h.engine.occasions("occasions").await.is_none());
        assert!(h.engine.white_days_eve("white_days").await.is_none());

        h.time_source.set_hijri(7, 12);
        assert!(h.engine.occasions("occasions").await.is_none());
        let report = h.engine.white_days_eve("white_days").await.unwrap();
        assert_eq!((report.delivered, report.skipped), (1, 1));

        h.time_source.set_hijri(7, 13);
        let report = h.engine.occasions("occasions").await.unwrap();
        assert_eq!(report.delivered, 2);
    }

    #[tokio::test]
    async fn preview_reports_defaults_and_raw_bad_time() {
        let h = harness();
        add(&h.store, 4, |s| s.quran_time = Some("late".into())).await;
        let preview = h.engine.preview(4).await.unwrap();
        assert_eq!(preview.daily_pages, 2);
        assert_eq!(preview.current_page, 1);
        assert_eq!(preview.quran_time, "late");

        assert_eq!(h.engine.preview(99).await.unwrap_err().kind(), "unknown_subscriber");
    }
}
