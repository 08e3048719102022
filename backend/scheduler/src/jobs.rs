//! Fixed daily reminders and the random dhikr triggers.

use std::sync::Arc;

use rand::Rng;
use tracing::{debug, info, warn};

use wird_core::TimeOfDay;

use crate::deliveries::DeliveryEngine;
use crate::registry::{callback, TriggerRegistry};

/// A fixed-catalogue reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixedJob {
    MorningAzkar,
    EveningAzkar,
    Mulk,
    FridayKahf,
    Occasions,
    WhiteDays,
    Qiyam,
    RandomDhikr,
}

impl FixedJob {
    /// Job for a configured trigger name. Random dhikr triggers are numbered.
    pub fn from_trigger(name: &str) -> Option<Self> {
        let job = match name {
            "morning_azkar" => FixedJob::MorningAzkar,
            "evening_azkar" => FixedJob::EveningAzkar,
            "mulk" => FixedJob::Mulk,
            "friday_kahf" => FixedJob::FridayKahf,
            "occasions" => FixedJob::Occasions,
            "white_days" => FixedJob::WhiteDays,
            "qiyam" => FixedJob::Qiyam,
            other if other.starts_with("random_dhikr") => FixedJob::RandomDhikr,
            _ => return None,
        };
        Some(job)
    }

    pub async fn run(self, engine: &DeliveryEngine, trigger: &str) {
        let report = match self {
            FixedJob::MorningAzkar => Some(engine.morning_azkar(trigger).await),
            FixedJob::EveningAzkar => Some(engine.evening_azkar(trigger).await),
            FixedJob::Mulk => Some(engine.mulk(trigger).await),
            FixedJob::FridayKahf => engine.friday_kahf(trigger).await,
            FixedJob::Occasions => engine.occasions(trigger).await,
            FixedJob::WhiteDays => engine.white_days_eve(trigger).await,
            FixedJob::Qiyam => Some(engine.qiyam(trigger).await),
            FixedJob::RandomDhikr => Some(engine.random_dhikr(trigger).await),
        };
        if report.is_none() {
            debug!(trigger, "Nothing to send today");
        }
    }
}

/// A uniformly random minute inside the inclusive hour window.
pub fn random_time_in<R: Rng + ?Sized>(rng: &mut R, start_hour: u8, end_hour: u8) -> TimeOfDay {
    let start = u32::from(start_hour.min(23)) * 60;
    let end = (u32::from(end_hour.clamp(start_hour.min(23), 23)) + 1) * 60;
    let minute = rng.gen_range(start..end);
    TimeOfDay::MIDNIGHT.adjust(minute as i32)
}

/// Register the configured fixed reminders plus one random dhikr trigger per
/// window. A time that does not parse skips only that trigger. Returns the
/// names registered.
pub fn register_fixed_jobs<R: Rng + ?Sized>(
    registry: &TriggerRegistry,
    engine: &Arc<DeliveryEngine>,
    rng: &mut R,
) -> Vec<String> {
    let settings = engine.settings();
    let offset = settings.default_utc_offset;
    let mut planned: Vec<(String, TimeOfDay)> = Vec::new();

    for (name, raw) in &settings.fixed {
        if FixedJob::from_trigger(name).is_none() {
            warn!(trigger = %name, "Unknown fixed trigger; skipping");
            continue;
        }
        match raw.parse::<TimeOfDay>() {
            Ok(time) => planned.push((name.clone(), time)),
            Err(e) => warn!(trigger = %name, error = %e, "Skipping fixed trigger"),
        }
    }

    for (i, (start, end)) in settings.random_dhikr_windows.iter().enumerate() {
        let time = random_time_in(rng, *start, *end);
        planned.push((format!("random_dhikr_{}", i + 1), time));
    }

    let mut registered = Vec::with_capacity(planned.len());
    for (name, time) in planned {
        let Some(job) = FixedJob::from_trigger(&name) else {
            continue;
        };
        let engine = engine.clone();
        registry.register(
            name.clone(),
            time,
            offset,
            callback(move |ctx| {
                let engine = engine.clone();
                async move { job.run(&engine, &ctx.trigger).await }
            }),
        );
        registered.push(name);
    }

    info!(count = registered.len(), "Fixed triggers registered");
    registered
}
