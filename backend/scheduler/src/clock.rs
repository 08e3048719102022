//! Wall-clock access and daily occurrence arithmetic.

use chrono::{DateTime, Datelike, Duration, Utc, Weekday};
use wird_core::TimeOfDay;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that advances with the tokio timer, so it follows a paused runtime.
pub struct TokioClock {
    base: DateTime<Utc>,
    origin: tokio::time::Instant,
}

impl TokioClock {
    pub fn starting_at(base: DateTime<Utc>) -> Self {
        Self {
            base,
            origin: tokio::time::Instant::now(),
        }
    }
}

impl Clock for TokioClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = Duration::from_std(self.origin.elapsed()).unwrap_or_else(|_| Duration::zero());
        self.base + elapsed
    }
}

/// First instant strictly after `now` at which the local wall clock at
/// `UTC+offset_hours` reads `time`.
pub fn next_occurrence(time: TimeOfDay, offset_hours: i32, now: DateTime<Utc>) -> DateTime<Utc> {
    let offset = Duration::hours(i64::from(offset_hours));
    let local_now = now.naive_utc() + offset;
    let mut local = local_now.date().and_time(time.to_naive());
    if local <= local_now {
        local += Duration::days(1);
    }
    DateTime::from_naive_utc_and_offset(local - offset, Utc)
}

/// Weekday of `now` on the local wall clock at `UTC+offset_hours`.
pub fn local_weekday(offset_hours: i32, now: DateTime<Utc>) -> Weekday {
    (now.naive_utc() + Duration::hours(i64::from(offset_hours))).weekday()
}
