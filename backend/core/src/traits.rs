use async_trait::async_trait;

use crate::content::{ContentAsset, ContentBlob, MediaItem};
use crate::error::WirdResult;
use crate::types::{
    ChatTarget, DeliveryPreview, HijriDate, Location, PreferenceChange, Subscriber, SubscriberId,
};

/// Persistent subscriber settings.
///
/// Every mutation is a single-row operation.
#[async_trait]
pub trait SubscriberStore: Send + Sync {
    /// Insert the subscriber if absent. Returns `true` when a new row was created;
    /// an existing subscriber's preferences are left untouched.
    async fn upsert(&self, id: SubscriberId, target: ChatTarget) -> WirdResult<bool>;

    async fn get(&self, id: SubscriberId) -> WirdResult<Option<Subscriber>>;

    async fn set_field(&self, id: SubscriberId, change: &PreferenceChange) -> WirdResult<()>;

    async fn all(&self) -> WirdResult<Vec<Subscriber>>;
}

/// Maps a content address to bytes, `None` when the asset is not installed.
#[async_trait]
pub trait ContentResolver: Send + Sync {
    async fn resolve(&self, asset: ContentAsset) -> WirdResult<Option<ContentBlob>>;
}

/// External prayer-time and hijri calendar feed.
#[async_trait]
pub trait TimeSource: Send + Sync {
    /// Named `HH:MM` strings (Fajr, Dhuhr, Asr, Maghrib, Isha) for a location.
    async fn named_times(&self, location: &Location) -> WirdResult<Vec<(String, String)>>;

    /// Today's hijri date.
    async fn calendar_day(&self) -> WirdResult<HijriDate>;
}

/// Outbound transport. Every call may fail independently; failures are local to
/// the target chat.
#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    fn name(&self) -> &str;

    async fn send_text(&self, target: ChatTarget, text: &str) -> WirdResult<()>;

    async fn send_photo(
        &self,
        target: ChatTarget,
        blob: &ContentBlob,
        caption: Option<&str>,
    ) -> WirdResult<()>;

    async fn send_document(
        &self,
        target: ChatTarget,
        blob: &ContentBlob,
        filename: &str,
        caption: Option<&str>,
    ) -> WirdResult<()>;

    async fn send_media_group(&self, target: ChatTarget, items: &[MediaItem]) -> WirdResult<()>;
}

/// What the inbound command layer is allowed to do to the engine.
#[async_trait]
pub trait CommandSink: Send + Sync {
    /// First contact from a chat. Idempotent.
    async fn register_subscriber(&self, id: SubscriberId, target: ChatTarget) -> WirdResult<()>;

    async fn on_preference_changed(
        &self,
        id: SubscriberId,
        change: PreferenceChange,
    ) -> WirdResult<()>;

    async fn get_delivery_preview(&self, id: SubscriberId) -> WirdResult<DeliveryPreview>;

    /// Deliver the subscriber's next Qur'an range immediately.
    async fn send_daily_wird(&self, id: SubscriberId) -> WirdResult<()>;
}
