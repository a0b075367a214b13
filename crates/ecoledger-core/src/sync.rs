//! Synchronization controller
//!
//! Owns the [`RecordStore`] and drives it through the session lifecycle:
//! initial bounded fetch, live subscription, writes and teardown.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, Weak};

use chrono::FixedOffset;
use rust_decimal::Decimal;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::{CoreResult, DefaultErrorLogger, ErrorContext, ErrorLogger};
use crate::models::{NewRecord, Record, RecordId};
use crate::port::{PortRef, Subscription, WriteOutcome};
use crate::reports::{cumulative_series, CumulativePoint, DashboardStats};
use crate::store::RecordStore;
use crate::types::{SyncEvent, SyncState};

pub struct LedgerSync {
    port: PortRef,
    fetch_limit: usize,
    store: RwLock<RecordStore>,
    revision: watch::Sender<u64>,
    // Bumped by every mount and unmount; work started under an older value is dropped
    epoch: AtomicU64,
    pump: Mutex<Option<JoinHandle<()>>>,
    session_entries: AtomicUsize,
    logger: DefaultErrorLogger,
}

impl LedgerSync {
    pub fn new(port: PortRef, fetch_limit: usize) -> Arc<Self> {
        let (revision, _) = watch::channel(0);
        Arc::new(Self {
            port,
            fetch_limit,
            store: RwLock::new(RecordStore::new()),
            revision,
            epoch: AtomicU64::new(0),
            pump: Mutex::new(None),
            session_entries: AtomicUsize::new(0),
            logger: DefaultErrorLogger,
        })
    }

    /// Start a session: fetch the newest records, then follow live changes
    ///
    /// A failed fetch leaves the store in the error state and never
    /// subscribes. There is no retry.
    pub async fn mount(self: &Arc<Self>) -> CoreResult<()> {
        let epoch = {
            let mut pump = self.lock_pump();
            if let Some(handle) = pump.take() {
                handle.abort();
            }
            self.epoch.fetch_add(1, Ordering::SeqCst) + 1
        };

        self.update(|store| store.set_state(SyncState::Loading));
        log::info!("Loading up to {} records from {} storage", self.fetch_limit, self.port.name());

        let baseline = match self.port.load(self.fetch_limit).await {
            Ok(records) => {
                if !self.is_current(epoch) {
                    log::debug!("Discarding fetch result from an ended session");
                    return Ok(());
                }
                let count = self.update(|store| {
                    store.replace_all(records.clone());
                    store.set_state(SyncState::Synced);
                    store.len()
                });
                log::info!("Synced {} records", count);
                records
            }
            Err(e) => {
                if !self.is_current(epoch) {
                    return Ok(());
                }
                self.update(|store| {
                    store.clear();
                    store.set_state(SyncState::Error { message: e.to_string() });
                });
                let context = ErrorContext::new("initial_fetch").with_data("limit", self.fetch_limit.into());
                self.logger.log_error(&e, &context);
                return Err(e);
            }
        };

        match self.port.subscribe(&baseline).await {
            Ok(subscription) => self.start_pump(subscription, epoch),
            Err(e) => {
                let context = ErrorContext::new("subscribe");
                self.logger.log_warning(&format!("live updates unavailable: {}", e), &context);
            }
        }

        Ok(())
    }

    /// End the session; queued and future events are no longer applied
    pub fn unmount(&self) {
        let mut pump = self.lock_pump();
        self.epoch.fetch_add(1, Ordering::SeqCst);
        if let Some(handle) = pump.take() {
            handle.abort();
            log::info!("Closed live subscription");
        }
    }

    fn start_pump(self: &Arc<Self>, mut subscription: Subscription, epoch: u64) {
        let mut pump = self.lock_pump();
        if !self.is_current(epoch) {
            subscription.close();
            return;
        }

        let this: Weak<Self> = Arc::downgrade(self);
        *pump = Some(tokio::spawn(async move {
            while let Some(event) = subscription.next().await {
                let Some(sync) = this.upgrade() else { break };
                if !sync.is_current(epoch) {
                    break;
                }
                sync.dispatch(&event);
            }
            log::debug!("Event pump stopped");
        }));
    }

    /// Apply one change event to the store
    ///
    /// Returns `true` when the visible record set changed.
    pub fn dispatch(&self, event: &SyncEvent) -> bool {
        let changed = self.update(|store| store.apply(event));
        log::debug!("Applied {} event for {} (changed: {})", event.kind(), event.id(), changed);
        changed
    }

    /// Record a new transaction
    ///
    /// With a remote port the record shows up only once the create event
    /// arrives; a local port applies it before returning.
    pub async fn add(&self, amount: Decimal, note: &str) -> CoreResult<WriteOutcome> {
        let context = ErrorContext::new("add_record").with_data("amount", amount.to_string().into());

        let record = match NewRecord::new(amount, note) {
            Ok(record) => record,
            Err(e) => {
                self.logger.log_warning(&e.to_string(), &context);
                return Err(e);
            }
        };

        match self.port.add(record).await {
            Ok(outcome) => {
                self.session_entries.fetch_add(1, Ordering::SeqCst);
                if let WriteOutcome::Applied(event) = &outcome {
                    self.dispatch(event);
                }
                Ok(outcome)
            }
            Err(e) => {
                self.logger.log_error(&e, &context);
                Err(e)
            }
        }
    }

    /// Delete a transaction by id
    pub async fn remove(&self, id: &RecordId) -> CoreResult<WriteOutcome> {
        match self.port.remove(id).await {
            Ok(outcome) => {
                if let WriteOutcome::Applied(event) = &outcome {
                    self.dispatch(event);
                }
                Ok(outcome)
            }
            Err(e) => {
                self.logger.log_error(&e, &ErrorContext::new("remove_record").with_record(id.as_str()));
                Err(e)
            }
        }
    }

    pub fn state(&self) -> SyncState {
        self.read().state().clone()
    }

    /// Snapshot of the records in display order
    pub fn records(&self) -> Vec<Record> {
        self.read().records().to_vec()
    }

    pub fn record(&self, id: &RecordId) -> Option<Record> {
        self.read().get(id).cloned()
    }

    pub fn stats(&self) -> DashboardStats {
        DashboardStats::from_records(self.read().records())
    }

    pub fn series(&self, offset: &FixedOffset) -> Vec<CumulativePoint> {
        cumulative_series(self.read().records(), offset)
    }

    /// Store revision; changes whenever records or state change
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    /// Records added successfully since startup
    pub fn session_entries(&self) -> usize {
        self.session_entries.load(Ordering::SeqCst)
    }

    pub fn port_name(&self) -> &'static str {
        self.port.name()
    }

    pub fn fetch_limit(&self) -> usize {
        self.fetch_limit
    }

    /// Whether a live subscription is being followed
    pub fn is_live(&self) -> bool {
        self.lock_pump().as_ref().map_or(false, |handle| !handle.is_finished())
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.epoch.load(Ordering::SeqCst) == epoch
    }

    fn update<R>(&self, f: impl FnOnce(&mut RecordStore) -> R) -> R {
        let (result, revision) = {
            let mut store = self.store.write().unwrap_or_else(|poisoned| poisoned.into_inner());
            let result = f(&mut store);
            (result, store.revision())
        };
        self.revision.send_if_modified(|current| {
            if *current == revision {
                false
            } else {
                *current = revision;
                true
            }
        });
        result
    }

    fn read(&self) -> RwLockReadGuard<'_, RecordStore> {
        self.store.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_pump(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.pump.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for LedgerSync {
    fn drop(&mut self) {
        if let Some(handle) = self.lock_pump().take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::port::{InMemoryCollection, LedgerPort, LocalPort, RemoteCollection, RemotePort};
    use crate::storage::LocalStorage;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::time::Duration;
    use tokio::sync::Notify;

    fn remote(collection: &InMemoryCollection) -> Arc<LedgerSync> {
        LedgerSync::new(Arc::new(RemotePort::new(collection.clone())), 100)
    }

    async fn settle(sync: &LedgerSync, condition: impl Fn(&LedgerSync) -> bool) {
        let mut changes = sync.changes();
        tokio::time::timeout(Duration::from_secs(2), async {
            while !condition(sync) {
                if changes.changed().await.is_err() {
                    break;
                }
            }
        })
        .await
        .expect("store did not reach the expected state");
    }

    fn record(id: &str, amount: i64, millis: i64) -> Record {
        Record::new(id, Decimal::from(amount), "x", Utc.timestamp_millis_opt(millis).unwrap())
    }

    #[tokio::test]
    async fn test_mount_loads_and_syncs() {
        let collection = InMemoryCollection::with_records(vec![record("a", 10, 1), record("b", 20, 2)]);
        let sync = remote(&collection);
        assert_eq!(sync.state(), SyncState::Uninitialized);

        sync.mount().await.unwrap();
        assert_eq!(sync.state(), SyncState::Synced);
        let ids: Vec<String> = sync.records().iter().map(|r| r.id.to_string()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert!(sync.is_live());
    }

    #[tokio::test]
    async fn test_remote_add_is_visible_only_after_echo() {
        let collection = InMemoryCollection::new();
        let sync = remote(&collection);
        sync.mount().await.unwrap();

        let outcome = sync.add(Decimal::from(10), "x").await.unwrap();
        assert_eq!(outcome, WriteOutcome::Pending);
        assert!(sync.records().is_empty());

        settle(&sync, |s| s.records().len() == 1).await;
        let stats = sync.stats();
        assert_eq!(stats.total_revenue, Decimal::from(10));
        assert_eq!(stats.carbon_emissions, Decimal::from(50));
        assert_eq!(sync.session_entries(), 1);
    }

    #[tokio::test]
    async fn test_remote_delete_and_update_arrive_as_events() {
        let collection = InMemoryCollection::with_records(vec![record("a", 10, 1), record("b", 20, 2)]);
        let sync = remote(&collection);
        sync.mount().await.unwrap();

        sync.remove(&"a".into()).await.unwrap();
        settle(&sync, |s| s.records().len() == 1).await;

        collection
            .update(crate::models::RecordPatch::new("b").amount(Decimal::from(25)))
            .unwrap();
        settle(&sync, |s| s.stats().total_revenue == Decimal::from(25)).await;
    }

    #[tokio::test]
    async fn test_duplicate_delivery_is_idempotent() {
        let sync = remote(&InMemoryCollection::new());
        let event = SyncEvent::Create(record("r1", 10, 1));

        assert!(sync.dispatch(&event));
        assert!(!sync.dispatch(&event));
        assert_eq!(sync.records().len(), 1);

        let delete = SyncEvent::Delete { id: "r1".into() };
        assert!(sync.dispatch(&delete));
        assert!(!sync.dispatch(&delete));
        assert!(sync.records().is_empty());
    }

    #[tokio::test]
    async fn test_failed_write_leaves_store_unchanged() {
        let collection = InMemoryCollection::with_records(vec![record("a", 10, 1)]);
        let sync = remote(&collection);
        sync.mount().await.unwrap();
        let revision = sync.revision();

        collection.set_offline(true);
        assert!(sync.add(Decimal::from(5), "x").await.is_err());
        assert!(sync.remove(&"a".into()).await.is_err());

        assert_eq!(sync.records().len(), 1);
        assert_eq!(sync.revision(), revision);
        assert_eq!(sync.session_entries(), 0);
    }

    #[tokio::test]
    async fn test_invalid_amount_is_rejected_before_port() {
        let collection = InMemoryCollection::new();
        let sync = remote(&collection);
        sync.mount().await.unwrap();

        let err = sync.add(Decimal::ZERO, "x").await.unwrap_err();
        assert!(matches!(err, CoreError::ValidationError { .. }));
        assert!(collection.is_empty());
    }

    #[tokio::test]
    async fn test_failed_fetch_enters_error_without_subscribing() {
        let collection = InMemoryCollection::new();
        collection.set_offline(true);
        let sync = remote(&collection);

        assert!(sync.mount().await.is_err());
        assert!(matches!(sync.state(), SyncState::Error { .. }));
        assert!(sync.records().is_empty());
        assert!(!sync.is_live());

        collection.set_offline(false);
        assert_eq!(collection.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_unmount_stops_applying_events() {
        let collection = InMemoryCollection::new();
        let sync = remote(&collection);
        sync.mount().await.unwrap();

        sync.unmount();
        assert!(!sync.is_live());
        collection.save(NewRecord::new(Decimal::from(1), "late").unwrap()).await.unwrap();
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert!(sync.records().is_empty());
    }

    #[tokio::test]
    async fn test_changes_follow_revision() {
        let sync = remote(&InMemoryCollection::new());
        let mut changes = sync.changes();

        sync.dispatch(&SyncEvent::Create(record("a", 1, 1)));
        assert!(changes.has_changed().unwrap());
        assert_eq!(*changes.borrow_and_update(), sync.revision());

        // No-op events do not notify
        sync.dispatch(&SyncEvent::Delete { id: "zzz".into() });
        assert!(!changes.has_changed().unwrap());
    }

    /// Port whose initial fetch waits for a release signal
    struct GatedPort {
        gate: Notify,
        records: Vec<Record>,
        fail_subscribe: bool,
    }

    impl GatedPort {
        fn new(records: Vec<Record>) -> Self {
            Self {
                gate: Notify::new(),
                records,
                fail_subscribe: false,
            }
        }
    }

    #[async_trait]
    impl LedgerPort for GatedPort {
        fn name(&self) -> &'static str {
            "gated"
        }

        async fn load(&self, _limit: usize) -> CoreResult<Vec<Record>> {
            self.gate.notified().await;
            Ok(self.records.clone())
        }

        async fn subscribe(&self, _baseline: &[Record]) -> CoreResult<Subscription> {
            if self.fail_subscribe {
                Err(CoreError::SubscriptionError {
                    message: "refused".to_string(),
                })
            } else {
                Ok(Subscription::idle())
            }
        }

        async fn add(&self, _record: NewRecord) -> CoreResult<WriteOutcome> {
            Ok(WriteOutcome::Pending)
        }

        async fn remove(&self, _id: &RecordId) -> CoreResult<WriteOutcome> {
            Ok(WriteOutcome::Pending)
        }
    }

    #[tokio::test]
    async fn test_late_fetch_after_unmount_is_discarded() {
        let port = Arc::new(GatedPort::new(vec![record("a", 10, 1)]));
        let sync = LedgerSync::new(port.clone(), 100);

        let mounting = {
            let sync = sync.clone();
            tokio::spawn(async move { sync.mount().await })
        };
        settle(&sync, |s| s.state().is_loading()).await;

        sync.unmount();
        port.gate.notify_one();
        mounting.await.unwrap().unwrap();

        assert!(sync.records().is_empty());
        assert!(!sync.state().is_synced());
        assert!(!sync.is_live());
    }

    #[tokio::test]
    async fn test_subscribe_failure_keeps_synced_snapshot() {
        let mut port = GatedPort::new(vec![record("a", 10, 1)]);
        port.fail_subscribe = true;
        port.gate.notify_one();
        let sync = LedgerSync::new(Arc::new(port), 100);

        sync.mount().await.unwrap();
        assert_eq!(sync.state(), SyncState::Synced);
        assert_eq!(sync.records().len(), 1);
        assert!(!sync.is_live());
    }

    #[tokio::test]
    async fn test_local_writes_apply_immediately() {
        let storage = LocalStorage::in_memory();
        let sync = LedgerSync::new(Arc::new(LocalPort::new(storage.clone())), 100);
        sync.mount().await.unwrap();
        assert_eq!(sync.state(), SyncState::Synced);

        let outcome = sync.add(Decimal::from(7), "  ").await.unwrap();
        let records = sync.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].note, crate::models::NOTE_PLACEHOLDER);
        assert!(matches!(outcome, WriteOutcome::Applied(SyncEvent::Create(_))));

        sync.remove(&records[0].id).await.unwrap();
        assert!(sync.records().is_empty());
        assert_eq!(sync.session_entries(), 1);

        // A second session sees what the first one stored
        sync.add(Decimal::from(3), "kept").await.unwrap();
        let reopened = LedgerSync::new(Arc::new(LocalPort::new(storage.handle())), 100);
        reopened.mount().await.unwrap();
        assert_eq!(reopened.records().len(), 1);
        assert_eq!(reopened.records()[0].note, "kept");
    }

    #[tokio::test]
    async fn test_series_uses_chronological_order() {
        let sync = remote(&InMemoryCollection::new());
        sync.dispatch(&SyncEvent::Create(record("late", 5, 120_000)));
        sync.dispatch(&SyncEvent::Create(record("early", 10, 60_000)));

        let offset = FixedOffset::east_opt(0).unwrap();
        let totals: Vec<Decimal> = sync.series(&offset).iter().map(|p| p.total).collect();
        assert_eq!(totals, vec![Decimal::from(10), Decimal::from(15)]);
    }

    #[tokio::test]
    async fn test_remote_collection_save_is_echoed_once() {
        let collection = InMemoryCollection::new();
        let sync = remote(&collection);
        sync.mount().await.unwrap();

        let saved = collection.save(NewRecord::new(Decimal::from(2), "x").unwrap()).await.unwrap();
        settle(&sync, |s| s.record(&saved.id).is_some()).await;
        sync.dispatch(&SyncEvent::Create(saved));
        assert_eq!(sync.records().len(), 1);
    }
}
