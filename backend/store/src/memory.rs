use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use wird_core::{ChatTarget, PreferenceChange, Subscriber, SubscriberId, SubscriberStore, WirdError, WirdResult};

/// Process-local subscriber store. Iteration order is by subscriber id.
#[derive(Default)]
pub struct InMemorySubscriberStore {
    rows: RwLock<BTreeMap<SubscriberId, Subscriber>>,
}

impl InMemorySubscriberStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a fully-formed record, replacing any existing one.
    pub async fn insert(&self, subscriber: Subscriber) {
        self.rows.write().await.insert(subscriber.id, subscriber);
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

#[async_trait]
impl SubscriberStore for InMemorySubscriberStore {
    async fn upsert(&self, id: SubscriberId, target: ChatTarget) -> WirdResult<bool> {
        let mut rows = self.rows.write().await;
        if rows.contains_key(&id) {
            return Ok(false);
        }
        rows.insert(id, Subscriber::new(id, target));
        Ok(true)
    }

    async fn get(&self, id: SubscriberId) -> WirdResult<Option<Subscriber>> {
        Ok(self.rows.read().await.get(&id).cloned())
    }

    async fn set_field(&self, id: SubscriberId, change: &PreferenceChange) -> WirdResult<()> {
        let mut rows = self.rows.write().await;
        let subscriber = rows.get_mut(&id).ok_or(WirdError::UnknownSubscriber(id))?;
        change.apply(subscriber);
        Ok(())
    }

    async fn all(&self) -> WirdResult<Vec<Subscriber>> {
        Ok(self.rows.read().await.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wird_core::FeatureFlag;

    #[tokio::test]
    async fn upsert_is_idempotent() {
        let store = InMemorySubscriberStore::new();
        assert!(store.upsert(1, 10).await.unwrap());
        store
            .set_field(1, &PreferenceChange::DailyPages(5))
            .await
            .unwrap();
        assert!(!store.upsert(1, 99).await.unwrap());

        let s = store.get(1).await.unwrap().unwrap();
        assert_eq!(s.chat_id, 10);
        assert_eq!(s.daily_pages(), 5);
    }

    #[tokio::test]
    async fn set_field_on_unknown_subscriber_fails() {
        let store = InMemorySubscriberStore::new();
        let err = store
            .set_field(7, &PreferenceChange::Flag(FeatureFlag::Mulk, false))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "unknown_subscriber");
    }
}
