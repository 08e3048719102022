//! In-memory fakes of the engine's collaborators.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use tokio::time::Instant;

use wird_calendar::PrayerTimeResolver;
use wird_core::{
    ChatTarget, ContentAsset, ContentBlob, ContentResolver, DeliveryChannel, HijriDate, Location,
    MediaItem, TimeSource, WirdError, WirdResult,
};
use wird_store::InMemorySubscriberStore;

use crate::clock::TokioClock;
use crate::deliveries::DeliveryEngine;
use crate::dispatcher::Pacing;
use crate::settings::EngineSettings;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Text(ChatTarget, String),
    Photo(ChatTarget, String, Option<String>),
    Document(ChatTarget, String),
    Group(ChatTarget, Vec<String>),
}

#[derive(Default)]
pub struct FakeChannel {
    pub sent: Mutex<Vec<Sent>>,
    /// When each entry of `sent` went out.
    pub sent_at: Mutex<Vec<Instant>>,
    /// Per media group, the caption of each item.
    pub group_captions: Mutex<Vec<Vec<Option<String>>>>,
    pub failing: Mutex<HashSet<ChatTarget>>,
}

impl FakeChannel {
    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    /// Time between consecutive sends.
    pub fn gaps(&self) -> Vec<Duration> {
        let at = self.sent_at.lock().unwrap();
        at.windows(2).map(|w| w[1] - w[0]).collect()
    }

    pub fn group_captions(&self) -> Vec<Vec<Option<String>>> {
        self.group_captions.lock().unwrap().clone()
    }

    pub fn fail_for(&self, target: ChatTarget) {
        self.failing.lock().unwrap().insert(target);
    }

    fn record(&self, target: ChatTarget, sent: Sent) -> WirdResult<()> {
        if self.failing.lock().unwrap().contains(&target) {
            return Err(WirdError::delivery(target, "Forbidden: bot was blocked by the user"));
        }
        self.sent.lock().unwrap().push(sent);
        self.sent_at.lock().unwrap().push(Instant::now());
        Ok(())
    }
}

#[async_trait]
impl DeliveryChannel for FakeChannel {
    fn name(&self) -> &str {
        "fake"
    }

    async fn send_text(&self, target: ChatTarget, text: &str) -> WirdResult<()> {
        self.record(target, Sent::Text(target, text.to_string()))
    }

    async fn send_photo(
        &self,
        target: ChatTarget,
        blob: &ContentBlob,
        caption: Option<&str>,
    ) -> WirdResult<()> {
        self.record(
            target,
            Sent::Photo(target, blob.file_name.clone(), caption.map(str::to_string)),
        )
    }

    async fn send_document(
        &self,
        target: ChatTarget,
        _blob: &ContentBlob,
        filename: &str,
        _caption: Option<&str>,
    ) -> WirdResult<()> {
        self.record(target, Sent::Document(target, filename.to_string()))
    }

    async fn send_media_group(&self, target: ChatTarget, items: &[MediaItem]) -> WirdResult<()> {
        let names = items.iter().map(|i| i.blob.file_name.clone()).collect();
        self.record(target, Sent::Group(target, names))?;
        let captions = items.iter().map(|i| i.caption.clone()).collect();
        self.group_captions.lock().unwrap().push(captions);
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeContent {
    pub assets: Mutex<HashMap<ContentAsset, ContentBlob>>,
}

impl FakeContent {
    pub fn install(&self, asset: ContentAsset) {
        let blob = ContentBlob::new(asset.to_string(), asset.to_string().into_bytes());
        self.assets.lock().unwrap().insert(asset, blob);
    }
}

#[async_trait]
impl ContentResolver for FakeContent {
    async fn resolve(&self, asset: ContentAsset) -> WirdResult<Option<ContentBlob>> {
        Ok(self.assets.lock().unwrap().get(&asset).cloned())
    }
}

/// Serves fixed prayer times per city and a settable hijri date.
#[derive(Default)]
pub struct FakeTimeSource {
    pub times: Mutex<HashMap<String, Vec<(String, String)>>>,
    pub hijri: Mutex<Option<HijriDate>>,
}

impl FakeTimeSource {
    pub fn set_times(&self, city: &str, times: &[(&str, &str)]) {
        self.times.lock().unwrap().insert(
            city.to_string(),
            times
                .iter()
                .map(|(n, t)| (n.to_string(), t.to_string()))
                .collect(),
        );
    }

    pub fn set_hijri(&self, month: u32, day: u32) {
        *self.hijri.lock().unwrap() = Some(HijriDate {
            day,
            month,
            month_name: "رجب".into(),
            year: "1447".into(),
        });
    }
}

#[async_trait]
impl TimeSource for FakeTimeSource {
    async fn named_times(&self, location: &Location) -> WirdResult<Vec<(String, String)>> {
        self.times
            .lock()
            .unwrap()
            .get(&location.city)
            .cloned()
            .ok_or_else(|| WirdError::TimeSource("no such city".into()))
    }

    async fn calendar_day(&self) -> WirdResult<HijriDate> {
        self.hijri
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| WirdError::TimeSource("calendar offline".into()))
    }
}

pub struct Harness {
    pub store: Arc<InMemorySubscriberStore>,
    pub channel: Arc<FakeChannel>,
    pub content: Arc<FakeContent>,
    pub time_source: Arc<FakeTimeSource>,
    pub clock: Arc<TokioClock>,
    pub engine: Arc<DeliveryEngine>,
    pub settings: EngineSettings,
}

/// 2024-03-01 (a Friday) at the given UTC time.
pub fn friday_at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, hour, minute, 0).unwrap()
}

/// Sends are unpaced; see [`harness_with`] for real pacing.
pub fn harness_at(now: DateTime<Utc>) -> Harness {
    harness_with(
        now,
        EngineSettings {
            pacing: Pacing {
                item: Duration::ZERO,
                batch: Duration::ZERO,
            },
            ..EngineSettings::default()
        },
    )
}

pub fn harness_with(now: DateTime<Utc>, settings: EngineSettings) -> Harness {
    let store = Arc::new(InMemorySubscriberStore::new());
    let channel = Arc::new(FakeChannel::default());
    let content = Arc::new(FakeContent::default());
    let time_source = Arc::new(FakeTimeSource::default());
    let clock = Arc::new(TokioClock::starting_at(now));
    let calendar = Arc::new(PrayerTimeResolver::new(
        time_source.clone(),
        Duration::from_secs(10),
    ));
    let engine = Arc::new(DeliveryEngine::new(
        store.clone(),
        content.clone(),
        channel.clone(),
        calendar,
        clock.clone(),
        settings.clone(),
    ));
    Harness {
        store,
        channel,
        content,
        time_source,
        clock,
        engine,
        settings,
    }
}

pub fn harness() -> Harness {
    harness_at(friday_at(8, 0))
}
