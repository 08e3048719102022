//! Named daily triggers.
//!
//! Each registered trigger owns one timer task that sleeps until the next
//! occurrence and then spawns the callback. Replacing or canceling a trigger
//! aborts only the timer; a callback already running finishes. Runs of one
//! name are serialized through a per-name slot that outlives replacement.
//! A slot is dropped once its name is gone and nothing else holds it.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use wird_core::{TimeOfDay, WirdError, WirdResult};
use wird_logging::{DeliveryEvent, EventLogger};

use crate::clock::{next_occurrence, Clock};

/// What a callback is told about the run it is serving.
#[derive(Debug, Clone)]
pub struct FireContext {
    pub trigger: String,
    /// Scheduled instant, `None` for manual runs.
    pub occurrence: Option<DateTime<Utc>>,
    pub manual: bool,
}

pub type TriggerCallback = Arc<dyn Fn(FireContext) -> BoxFuture<'static, ()> + Send + Sync>;

/// Box an async closure as a [`TriggerCallback`].
pub fn callback<F, Fut>(f: F) -> TriggerCallback
where
    F: Fn(FireContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(move |ctx| Box::pin(f(ctx)))
}

/// Listing entry for one live trigger.
#[derive(Debug, Clone, Serialize)]
pub struct TriggerInfo {
    pub name: String,
    pub time: String,
    pub utc_offset_hours: i32,
    pub next_fire: DateTime<Utc>,
    pub last_fired: Option<DateTime<Utc>>,
}

/// Per-name run lock; holds the last scheduled occurrence that ran.
#[derive(Default)]
struct TriggerSlot {
    last_fired: tokio::sync::Mutex<Option<DateTime<Utc>>>,
}

struct Entry {
    time: TimeOfDay,
    offset_hours: i32,
    callback: TriggerCallback,
    timer: JoinHandle<()>,
}

#[derive(Default)]
struct State {
    entries: HashMap<String, Entry>,
    slots: HashMap<String, Arc<TriggerSlot>>,
}

impl State {
    /// Forget slots of unregistered names that no timer or run still holds.
    fn prune_slots(&mut self) {
        let entries = &self.entries;
        self.slots
            .retain(|name, slot| entries.contains_key(name) || Arc::strong_count(slot) > 1);
    }
}

/// Cloneable handle to the trigger table.
#[derive(Clone)]
pub struct TriggerRegistry {
    clock: Arc<dyn Clock>,
    state: Arc<Mutex<State>>,
}

impl TriggerRegistry {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register `name` to fire daily at `time` on the `UTC+offset_hours` wall
    /// clock, replacing any trigger already under that name.
    pub fn register(
        &self,
        name: impl Into<String>,
        time: TimeOfDay,
        offset_hours: i32,
        callback: TriggerCallback,
    ) {
        let name = name.into();
        let mut state = self.lock();
        state.prune_slots();

        let slot = state.slots.entry(name.clone()).or_default().clone();
        let timer = tokio::spawn(run_timer(
            name.clone(),
            time,
            offset_hours,
            callback.clone(),
            slot,
            self.clock.clone(),
        ));

        let replaced = state.entries.insert(
            name.clone(),
            Entry {
                time,
                offset_hours,
                callback,
                timer,
            },
        );
        if let Some(old) = replaced {
            old.timer.abort();
            debug!(trigger = %name, old_time = %old.time, "Replaced trigger");
        }
        info!(trigger = %name, time = %time, utc_offset = offset_hours, "Registered trigger");
    }

    /// Remove `name`. Returns whether a trigger was live under it.
    pub fn cancel(&self, name: &str) -> bool {
        let mut state = self.lock();
        let removed = match state.entries.remove(name) {
            Some(entry) => {
                entry.timer.abort();
                info!(trigger = %name, "Canceled trigger");
                true
            }
            None => false,
        };
        state.prune_slots();
        removed
    }

    /// Run `name`'s callback now and wait for it. Waits behind any run of the
    /// same name already in progress.
    pub async fn fire_now(&self, name: &str) -> WirdResult<()> {
        let (callback, slot) = {
            let state = self.lock();
            let entry = state
                .entries
                .get(name)
                .ok_or_else(|| WirdError::UnknownTrigger(name.to_string()))?;
            let slot = state.slots.get(name).cloned().unwrap_or_default();
            (entry.callback.clone(), slot)
        };

        {
            let _running = slot.last_fired.lock().await;
            EventLogger::log_event(name, DeliveryEvent::TriggerFired { manual: true });
            callback(FireContext {
                trigger: name.to_string(),
                occurrence: None,
                manual: true,
            })
            .await;
        }
        drop(slot);
        self.lock().prune_slots();
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lock().entries.contains_key(name)
    }

    pub fn names_with_prefix(&self, prefix: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .lock()
            .entries
            .keys()
            .filter(|name| name.starts_with(prefix))
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Live triggers, sorted by name.
    pub fn list(&self) -> Vec<TriggerInfo> {
        let now = self.clock.now();
        let state = self.lock();
        let mut infos: Vec<TriggerInfo> = state
            .entries
            .iter()
            .map(|(name, entry)| TriggerInfo {
                name: name.clone(),
                time: entry.time.to_string(),
                utc_offset_hours: entry.offset_hours,
                next_fire: next_occurrence(entry.time, entry.offset_hours, now),
                last_fired: state
                    .slots
                    .get(name)
                    .and_then(|slot| slot.last_fired.try_lock().ok().and_then(|g| *g)),
            })
            .collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[cfg(test)]
    fn has_slot(&self, name: &str) -> bool {
        self.lock().slots.contains_key(name)
    }

    /// Abort every pending timer.
    pub fn shutdown(&self) {
        let mut state = self.lock();
        for (_, entry) in state.entries.drain() {
            entry.timer.abort();
        }
        info!("Trigger registry shut down");
    }
}

async fn run_timer(
    name: String,
    time: TimeOfDay,
    offset_hours: i32,
    callback: TriggerCallback,
    slot: Arc<TriggerSlot>,
    clock: Arc<dyn Clock>,
) {
    let mut after = clock.now();
    loop {
        let occurrence = next_occurrence(time, offset_hours, after);
        let wait = (occurrence - clock.now()).to_std().unwrap_or_default();
        debug!(trigger = %name, next = %occurrence, "Timer armed");
        tokio::time::sleep(wait).await;

        // Detached so aborting this timer never interrupts a delivery.
        tokio::spawn(fire_scheduled(
            name.clone(),
            occurrence,
            callback.clone(),
            slot.clone(),
        ));
        after = clock.now().max(occurrence);
    }
}

async fn fire_scheduled(
    name: String,
    occurrence: DateTime<Utc>,
    callback: TriggerCallback,
    slot: Arc<TriggerSlot>,
) {
    let mut last_fired = slot.last_fired.lock().await;
    if last_fired.is_some_and(|last| last >= occurrence) {
        warn!(trigger = %name, %occurrence, "Occurrence already fired; skipping");
        return;
    }
    *last_fired = Some(occurrence);

    EventLogger::log_event(&name, DeliveryEvent::TriggerFired { manual: false });
    callback(FireContext {
        trigger: name,
        occurrence: Some(occurrence),
        manual: false,
    })
    .await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::TokioClock;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn registry() -> TriggerRegistry {
        let base = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        TriggerRegistry::new(Arc::new(TokioClock::starting_at(base)))
    }

    fn counting(counter: Arc<AtomicUsize>) -> TriggerCallback {
        callback(move |_ctx| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        })
    }

    fn tod(s: &str) -> TimeOfDay {
        s.parse().unwrap()
    }

    async fn advance(hours: u64) {
        tokio::time::sleep(Duration::from_secs(hours * 3600)).await;
        tokio::task::yield_now().await;
    }

    #[tokio::test(start_paused = true)]
    async fn replacement_keeps_one_trigger_at_the_new_time() {
        let registry = registry();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        registry.register("A", tod("09:00"), 0, counting(first.clone()));
        registry.register("A", tod("10:00"), 0, counting(second.clone()));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.list()[0].time, "10:00");

        advance(1).await; // 09:00 passes
        advance(2).await; // 11:00
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn fires_once_per_day() {
        let registry = registry();
        let count = Arc::new(AtomicUsize::new(0));
        registry.register("daily", tod("09:00"), 0, counting(count.clone()));

        advance(50).await; // 10:00 two days later
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_future_runs() {
        let registry = registry();
        let count = Arc::new(AtomicUsize::new(0));
        registry.register("gone", tod("09:00"), 0, counting(count.clone()));
        assert!(registry.cancel("gone"));
        assert!(!registry.cancel("gone"));

        advance(24).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(registry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn runs_of_one_name_never_overlap() {
        let registry = registry();
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (a, p) = (active.clone(), peak.clone());
        registry.register(
            "slow",
            tod("23:00"),
            0,
            callback(move |_ctx| {
                let (a, p) = (a.clone(), p.clone());
                async move {
                    let now = a.fetch_add(1, Ordering::SeqCst) + 1;
                    p.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    a.fetch_sub(1, Ordering::SeqCst);
                }
            }),
        );

        let (r1, r2) = (registry.clone(), registry.clone());
        let (x, y) = tokio::join!(r1.fire_now("slow"), r2.fire_now("slow"));
        x.unwrap();
        y.unwrap();
        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn in_flight_run_survives_cancel() {
        let registry = registry();
        let done = Arc::new(AtomicUsize::new(0));
        let d = done.clone();
        registry.register(
            "long",
            tod("09:00"),
            0,
            callback(move |_ctx| {
                let d = d.clone();
                async move {
                    tokio::time::sleep(Duration::from_secs(600)).await;
                    d.fetch_add(1, Ordering::SeqCst);
                }
            }),
        );

        tokio::time::sleep(Duration::from_secs(3660)).await; // 09:01, run in progress
        registry.cancel("long");
        tokio::time::sleep(Duration::from_secs(601)).await;
        tokio::task::yield_now().await;
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn canceled_names_release_their_slots() {
        let registry = registry();
        let count = Arc::new(AtomicUsize::new(0));
        for i in 0..50 {
            let name = format!("daily_wird_{i}");
            registry.register(name.as_str(), tod("09:00"), 0, counting(count.clone()));
            registry.cancel(&name);
            tokio::task::yield_now().await;
        }
        registry.register("mulk", tod("21:00"), 0, counting(count.clone()));

        assert!(!registry.has_slot("daily_wird_0"));
        assert!(!registry.has_slot("daily_wird_49"));
        assert!(registry.has_slot("mulk"));
        assert_eq!(registry.lock().slots.len(), 1);
        registry.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn slot_outlives_cancel_until_the_run_ends() {
        let registry = registry();
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
        let release_rx = Arc::new(tokio::sync::Mutex::new(Some(release_rx)));
        registry.register(
            "long",
            tod("23:00"),
            0,
            callback(move |_ctx| {
                let release_rx = release_rx.clone();
                async move {
                    if let Some(rx) = release_rx.lock().await.take() {
                        let _ = rx.await;
                    }
                }
            }),
        );

        let r = registry.clone();
        let run = tokio::spawn(async move { r.fire_now("long").await });
        tokio::task::yield_now().await;

        registry.cancel("long");
        tokio::task::yield_now().await;
        assert!(registry.has_slot("long"));

        release_tx.send(()).unwrap();
        run.await.unwrap().unwrap();
        assert!(!registry.has_slot("long"));
    }

    #[tokio::test]
    async fn fire_now_unknown_name() {
        let err = registry().fire_now("nope").await.unwrap_err();
        assert_eq!(err.kind(), "unknown_trigger");
    }

    #[tokio::test]
    async fn prefix_lookup() {
        let registry = registry();
        let count = Arc::new(AtomicUsize::new(0));
        for name in ["baqarah_Fajr", "baqarah_Isha@Cairo/Egypt", "mulk"] {
            registry.register(name, tod("12:00"), 3, counting(count.clone()));
        }
        assert_eq!(
            registry.names_with_prefix("baqarah_"),
            vec!["baqarah_Fajr", "baqarah_Isha@Cairo/Egypt"]
        );
        registry.shutdown();
    }
}
