//! Engine facade used by the command layer, the admin API, and the binary.

use std::sync::Arc;

use async_trait::async_trait;
use rand::Rng;
use tracing::{info, warn};

use wird_core::{
    ChatTarget, CommandSink, DeliveryPreview, PreferenceChange, SubscriberId, WirdError,
    WirdResult,
};

use crate::deliveries::DeliveryEngine;
use crate::dynamic::{personal_trigger_name, DynamicScheduler};
use crate::jobs::register_fixed_jobs;
use crate::registry::{TriggerInfo, TriggerRegistry};

#[derive(Clone)]
pub struct WirdService {
    registry: TriggerRegistry,
    engine: Arc<DeliveryEngine>,
    dynamic: DynamicScheduler,
}

impl WirdService {
    pub fn new(registry: TriggerRegistry, engine: Arc<DeliveryEngine>) -> Self {
        let dynamic = DynamicScheduler::new(registry.clone(), engine.clone());
        Self {
            registry,
            engine,
            dynamic,
        }
    }

    /// Register every fixed and dynamic trigger.
    pub async fn start<R: Rng + ?Sized>(&self, rng: &mut R) -> WirdResult<()> {
        register_fixed_jobs(&self.registry, &self.engine, rng);
        self.dynamic.start().await?;
        info!(triggers = self.registry.len(), "Reminder engine started");
        Ok(())
    }

    pub fn shutdown(&self) {
        self.registry.shutdown();
    }

    /// Fire a registered trigger by name and wait for it to finish.
    pub async fn trigger_now(&self, name: &str) -> WirdResult<()> {
        info!(trigger = name, "Manual trigger");
        self.registry.fire_now(name).await
    }

    pub fn triggers(&self) -> Vec<TriggerInfo> {
        self.registry.list()
    }

    pub fn registry(&self) -> &TriggerRegistry {
        &self.registry
    }

    pub fn engine(&self) -> &Arc<DeliveryEngine> {
        &self.engine
    }

    fn check(&self, change: &PreferenceChange) -> WirdResult<()> {
        let invalid = |value: String| Err(WirdError::malformed(change.field(), value));
        match change {
            PreferenceChange::DailyPages(0) => invalid("0".into()),
            PreferenceChange::DailyPages(n) if *n > self.engine.settings().corpus_size => {
                invalid(n.to_string())
            }
            PreferenceChange::UtcOffset(h) if !(-12..=14).contains(h) => invalid(h.to_string()),
            PreferenceChange::Cursor(p) if !(1..=self.engine.settings().corpus_size).contains(p) => {
                invalid(p.to_string())
            }
            PreferenceChange::Location(Some(loc))
                if loc.city.trim().is_empty() || loc.country.trim().is_empty() =>
            {
                invalid(loc.to_string())
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl CommandSink for WirdService {
    async fn register_subscriber(&self, id: SubscriberId, target: ChatTarget) -> WirdResult<()> {
        let created = self.engine.store().upsert(id, target).await?;
        if !created {
            return Ok(());
        }
        info!(subscriber_id = id, target, "New subscriber");
        if let Some(subscriber) = self.engine.store().get(id).await? {
            self.dynamic.schedule_personal(&subscriber);
        }
        Ok(())
    }

    async fn on_preference_changed(
        &self,
        id: SubscriberId,
        change: PreferenceChange,
    ) -> WirdResult<()> {
        if let Err(e) = self.check(&change) {
            warn!(subscriber_id = id, error = %e, "Rejected preference change");
            return Err(e);
        }
        self.engine.store().set_field(id, &change).await?;
        info!(subscriber_id = id, field = change.field(), "Preference changed");
        self.dynamic.on_preference_changed(id, &change).await
    }

    async fn get_delivery_preview(&self, id: SubscriberId) -> WirdResult<DeliveryPreview> {
        self.engine.preview(id).await
    }

    async fn send_daily_wird(&self, id: SubscriberId) -> WirdResult<()> {
        let report = self
            .engine
            .daily_wird(&personal_trigger_name(id), id)
            .await?;
        if report.failed > 0 {
            return Err(WirdError::delivery(id, "daily wird could not be delivered"));
        }
        Ok(())
    }
}
