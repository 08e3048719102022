pub mod content;
pub mod error;
pub mod time;
pub mod traits;
pub mod types;

pub use content::{ContentAsset, ContentBlob, MediaItem};
pub use error::{WirdError, WirdResult};
pub use time::TimeOfDay;
pub use traits::{CommandSink, ContentResolver, DeliveryChannel, SubscriberStore, TimeSource};
pub use types::{
    ChatTarget, DeliveryPreview, FeatureFlag, HijriDate, Location, PreferenceChange, Prayer,
    Subscriber, SubscriberId, DEFAULT_DAILY_PAGES, DEFAULT_QURAN_TIME, QURAN_PAGES,
};
