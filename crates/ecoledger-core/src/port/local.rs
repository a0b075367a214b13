//! Local-only port: records persisted as one JSON array in local storage

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use super::{LedgerPort, Subscription, WriteOutcome};
use crate::error::{CoreError, CoreResult};
use crate::models::{NewRecord, Record, RecordId};
use crate::storage::LocalStorage;
use crate::types::SyncEvent;

/// Storage key of the serialized record list
pub const RECORDS_KEY: &str = "ledger_records";

/// Synchronous storage: every write is committed before it returns
pub struct LocalPort {
    storage: LocalStorage,
    // Serializes read-modify-write cycles on the record list
    write_lock: Mutex<()>,
}

impl LocalPort {
    pub fn new(storage: LocalStorage) -> Self {
        Self {
            storage,
            write_lock: Mutex::new(()),
        }
    }

    fn read_records(&self) -> CoreResult<Vec<Record>> {
        match self.storage.get(RECORDS_KEY) {
            Some(content) => serde_json::from_str(&content).map_err(|e| CoreError::InvalidFormat {
                message: format!("stored records: {}", e),
            }),
            None => Ok(Vec::new()),
        }
    }

    fn write_records(&self, records: &[Record]) -> CoreResult<()> {
        let content = serde_json::to_string(records)?;
        self.storage.set(RECORDS_KEY, &content)
    }
}

#[async_trait]
impl LedgerPort for LocalPort {
    fn name(&self) -> &'static str {
        "local"
    }

    /// Local storage holds the full history, so `limit` is not applied
    async fn load(&self, _limit: usize) -> CoreResult<Vec<Record>> {
        self.read_records()
    }

    async fn subscribe(&self, _baseline: &[Record]) -> CoreResult<Subscription> {
        Ok(Subscription::idle())
    }

    async fn add(&self, record: NewRecord) -> CoreResult<WriteOutcome> {
        let _guard = self.write_lock.lock().await;

        let record = record.into_record(ecoledger_utils::generate_local_id(), Utc::now());
        let mut records = self.read_records()?;
        records.insert(0, record.clone());
        self.write_records(&records)?;

        log::debug!("Stored local record {}", record.id);
        Ok(WriteOutcome::Applied(SyncEvent::Create(record)))
    }

    async fn remove(&self, id: &RecordId) -> CoreResult<WriteOutcome> {
        let _guard = self.write_lock.lock().await;

        let mut records = self.read_records()?;
        let before = records.len();
        records.retain(|r| &r.id != id);
        if records.len() != before {
            self.write_records(&records)?;
            log::debug!("Removed local record {}", id);
        }

        Ok(WriteOutcome::Applied(SyncEvent::Delete { id: id.clone() }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn new_record(amount: i64, note: &str) -> NewRecord {
        NewRecord::new(Decimal::from(amount), note).unwrap()
    }

    #[tokio::test]
    async fn test_add_returns_applied_create() {
        let port = LocalPort::new(LocalStorage::in_memory());
        let outcome = port.add(new_record(10, "x")).await.unwrap();

        match outcome {
            WriteOutcome::Applied(SyncEvent::Create(record)) => {
                assert_eq!(record.amount, Decimal::from(10));
                assert_eq!(record.note, "x");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(port.load(100).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_records_survive_reopen_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");

        {
            let port = LocalPort::new(LocalStorage::open(&path).unwrap());
            port.add(new_record(1, "first")).await.unwrap();
            port.add(new_record(2, "second")).await.unwrap();
        }

        let port = LocalPort::new(LocalStorage::open(&path).unwrap());
        let records = port.load(100).await.unwrap();
        let notes: Vec<&str> = records.iter().map(|r| r.note.as_str()).collect();
        assert_eq!(notes, vec!["second", "first"]);
    }

    #[tokio::test]
    async fn test_remove() {
        let port = LocalPort::new(LocalStorage::in_memory());
        let WriteOutcome::Applied(SyncEvent::Create(record)) = port.add(new_record(3, "x")).await.unwrap() else {
            panic!("expected applied create");
        };

        let outcome = port.remove(&record.id).await.unwrap();
        assert_eq!(outcome, WriteOutcome::Applied(SyncEvent::Delete { id: record.id.clone() }));
        assert!(port.load(100).await.unwrap().is_empty());

        // Missing ids still produce a (no-op) delete
        assert!(port.remove(&record.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_corrupt_records_fail_load() {
        let storage = LocalStorage::in_memory();
        storage.set(RECORDS_KEY, "{oops").unwrap();

        let port = LocalPort::new(storage);
        let err = port.load(100).await.unwrap_err();
        assert!(matches!(err, CoreError::InvalidFormat { .. }));
    }
}
