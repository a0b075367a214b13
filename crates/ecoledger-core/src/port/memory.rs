//! In-process hosted collection
//!
//! Behaves like a backend service living in the same process: ids and
//! creation times are assigned on save, and every change is pushed to all
//! open subscriptions. Clones share the same collection.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::mpsc;

use super::{RemoteCollection, Subscription};
use crate::error::{CoreError, CoreResult};
use crate::models::{NewRecord, Record, RecordId, RecordPatch};
use crate::types::SyncEvent;

#[derive(Default)]
struct State {
    // Newest first
    records: Vec<Record>,
    subscribers: Vec<mpsc::UnboundedSender<SyncEvent>>,
    next_id: u64,
}

#[derive(Clone, Default)]
pub struct InMemoryCollection {
    state: Arc<Mutex<State>>,
    offline: Arc<AtomicBool>,
}

impl InMemoryCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed records without notifying subscribers
    pub fn with_records(records: Vec<Record>) -> Self {
        let collection = Self::new();
        {
            let mut state = collection.lock();
            state.records = records;
            state.records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        }
        collection
    }

    /// While offline every request fails with a remote error
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Change stored fields, as another client editing the object would
    pub fn update(&self, patch: RecordPatch) -> CoreResult<()> {
        self.check_online()?;
        let mut state = self.lock();
        let record = state
            .records
            .iter_mut()
            .find(|r| r.id == patch.id)
            .ok_or_else(|| CoreError::RecordNotFound { id: patch.id.to_string() })?;
        record.merge(&patch);
        let full = RecordPatch::from(record.clone());
        Self::broadcast(&mut state, SyncEvent::Update(full));
        Ok(())
    }

    /// Number of subscriptions still open
    pub fn subscriber_count(&self) -> usize {
        let mut state = self.lock();
        state.subscribers.retain(|tx| !tx.is_closed());
        state.subscribers.len()
    }

    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_online(&self) -> CoreResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(CoreError::RemoteError {
                message: "backend unreachable".to_string(),
            })
        } else {
            Ok(())
        }
    }

    fn broadcast(state: &mut State, event: SyncEvent) {
        state.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

#[async_trait]
impl RemoteCollection for InMemoryCollection {
    async fn query(&self, limit: usize) -> CoreResult<Vec<Record>> {
        self.check_online()?;
        Ok(self.lock().records.iter().take(limit).cloned().collect())
    }

    async fn subscribe(&self, _baseline: &[Record]) -> CoreResult<Subscription> {
        self.check_online().map_err(|e| CoreError::SubscriptionError { message: e.to_string() })?;
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().subscribers.push(tx);
        Ok(Subscription::new(rx))
    }

    async fn save(&self, record: NewRecord) -> CoreResult<Record> {
        self.check_online()?;
        let mut state = self.lock();
        state.next_id += 1;
        let record = record.into_record(format!("obj-{}", state.next_id), Utc::now());
        state.records.insert(0, record.clone());
        Self::broadcast(&mut state, SyncEvent::Create(record.clone()));
        Ok(record)
    }

    async fn destroy(&self, id: &RecordId) -> CoreResult<()> {
        self.check_online()?;
        let mut state = self.lock();
        let before = state.records.len();
        state.records.retain(|r| &r.id != id);
        if state.records.len() == before {
            return Err(CoreError::RecordNotFound { id: id.to_string() });
        }
        Self::broadcast(&mut state, SyncEvent::Delete { id: id.clone() });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn new_record(amount: i64) -> NewRecord {
        NewRecord::new(Decimal::from(amount), "x").unwrap()
    }

    #[tokio::test]
    async fn test_save_assigns_id_and_notifies() {
        let collection = InMemoryCollection::new();
        let mut sub = collection.subscribe(&[]).await.unwrap();

        let saved = collection.save(new_record(4)).await.unwrap();
        assert_eq!(saved.id.as_str(), "obj-1");
        assert_eq!(sub.try_next(), Some(SyncEvent::Create(saved)));
    }

    #[tokio::test]
    async fn test_query_is_bounded_newest_first() {
        let collection = InMemoryCollection::new();
        for amount in 1..=5 {
            collection.save(new_record(amount)).await.unwrap();
        }

        let records = collection.query(3).await.unwrap();
        let amounts: Vec<Decimal> = records.iter().map(|r| r.amount).collect();
        assert_eq!(amounts, vec![Decimal::from(5), Decimal::from(4), Decimal::from(3)]);
    }

    #[tokio::test]
    async fn test_destroy_missing_is_error() {
        let collection = InMemoryCollection::new();
        let err = collection.destroy(&"nope".into()).await.unwrap_err();
        assert!(matches!(err, CoreError::RecordNotFound { .. }));
    }

    #[tokio::test]
    async fn test_offline_rejects_requests() {
        let collection = InMemoryCollection::new();
        collection.set_offline(true);
        assert!(collection.save(new_record(1)).await.is_err());
        assert!(collection.query(10).await.is_err());
        assert!(matches!(
            collection.subscribe(&[]).await,
            Err(CoreError::SubscriptionError { .. })
        ));
        assert!(collection.is_empty());
    }

    #[tokio::test]
    async fn test_closed_subscription_is_pruned() {
        let collection = InMemoryCollection::new();
        let mut sub = collection.subscribe(&[]).await.unwrap();
        assert_eq!(collection.subscriber_count(), 1);

        sub.close();
        assert_eq!(collection.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_update_pushes_full_patch() {
        let collection = InMemoryCollection::new();
        let saved = collection.save(new_record(1)).await.unwrap();
        let mut sub = collection.subscribe(&[]).await.unwrap();

        collection.update(RecordPatch::new(saved.id.clone()).note("edited")).unwrap();
        match sub.try_next() {
            Some(SyncEvent::Update(patch)) => {
                assert_eq!(patch.note.as_deref(), Some("edited"));
                assert_eq!(patch.amount, Some(Decimal::from(1)));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
