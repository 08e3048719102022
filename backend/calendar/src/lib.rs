//! `wird-calendar`: prayer times and the hijri calendar.
//!
//! - [`AladhanClient`]: HTTP [`wird_core::TimeSource`] backed by the Aladhan API
//! - [`PrayerTimeResolver`]: timeout-bounded resolution with a built-in fallback table
//! - [`occasions`]: hijri occasion and white-days checks

pub mod aladhan;
pub mod occasions;
pub mod resolver;

pub use aladhan::AladhanClient;
pub use occasions::{check_occasion, is_day_before_white_days};
pub use resolver::{PrayerTimeResolver, FALLBACK_TIMES};
