//! In-memory record store and its event reducers
//!
//! Every mutation of the record set goes through [`RecordStore::apply`] or
//! [`RecordStore::replace_all`]. Reducers are keyed by record id and are
//! idempotent, so duplicate or reordered delivery cannot create two records
//! with the same id.

use std::collections::HashSet;

use crate::models::{Record, RecordId, RecordPatch};
use crate::types::{SyncEvent, SyncState};

/// Ordered record collection plus the sync state it was produced under
#[derive(Debug, Default)]
pub struct RecordStore {
    records: Vec<Record>,
    state: SyncState,
    revision: u64,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records in display order (newest arrivals first)
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &RecordId) -> Option<&Record> {
        self.records.iter().find(|r| &r.id == id)
    }

    pub fn contains(&self, id: &RecordId) -> bool {
        self.get(id).is_some()
    }

    pub fn state(&self) -> &SyncState {
        &self.state
    }

    /// Incremented on every change to records or state
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn set_state(&mut self, state: SyncState) {
        if self.state != state {
            self.state = state;
            self.bump();
        }
    }

    /// Replace the whole set with a fetch result, keeping the first copy of any repeated id
    pub fn replace_all(&mut self, records: Vec<Record>) {
        let mut seen = HashSet::with_capacity(records.len());
        self.records = records
            .into_iter()
            .filter(|r| seen.insert(r.id.clone()))
            .collect();
        self.bump();
    }

    /// Drop every record
    pub fn clear(&mut self) {
        if !self.records.is_empty() {
            self.records.clear();
            self.bump();
        }
    }

    /// Apply one event; returns whether the record set changed
    pub fn apply(&mut self, event: &SyncEvent) -> bool {
        let changed = match event {
            SyncEvent::Create(record) => self.apply_create(record),
            SyncEvent::Update(patch) => self.apply_update(patch),
            SyncEvent::Delete { id } => self.apply_delete(id),
        };
        if changed {
            self.bump();
        }
        changed
    }

    fn apply_create(&mut self, record: &Record) -> bool {
        if self.contains(&record.id) {
            return false;
        }
        self.records.insert(0, record.clone());
        true
    }

    fn apply_update(&mut self, patch: &RecordPatch) -> bool {
        match self.records.iter_mut().find(|r| r.id == patch.id) {
            Some(record) => {
                let before = record.clone();
                record.merge(patch);
                *record != before
            }
            None => false,
        }
    }

    fn apply_delete(&mut self, id: &RecordId) -> bool {
        let before = self.records.len();
        self.records.retain(|r| &r.id != id);
        self.records.len() != before
    }

    fn bump(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use rust_decimal::Decimal;

    fn ts(millis: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(millis).unwrap()
    }

    fn record(id: &str, amount: i64, millis: i64) -> Record {
        Record::new(id, Decimal::from(amount), "x", ts(millis))
    }

    fn ids(store: &RecordStore) -> Vec<&str> {
        store.records().iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn test_create_prepends() {
        let mut store = RecordStore::new();
        assert!(store.apply(&SyncEvent::Create(record("a", 5, 1))));
        assert!(store.apply(&SyncEvent::Create(record("b", 7, 2))));
        assert_eq!(ids(&store), vec!["b", "a"]);
    }

    #[test]
    fn test_create_is_idempotent() {
        let mut store = RecordStore::new();
        let event = SyncEvent::Create(record("a", 10, 1000));

        store.apply(&event);
        let revision = store.revision();
        assert!(!store.apply(&event));

        assert_eq!(store.len(), 1);
        assert_eq!(store.revision(), revision);
    }

    #[test]
    fn test_duplicate_create_does_not_overwrite_fields() {
        let mut store = RecordStore::new();
        store.apply(&SyncEvent::Create(record("a", 10, 1)));
        store.apply(&SyncEvent::Create(record("a", 99, 1)));
        assert_eq!(store.records()[0].amount, Decimal::from(10));
    }

    #[test]
    fn test_update_and_delete_on_missing_id_are_noops() {
        let mut store = RecordStore::new();
        store.apply(&SyncEvent::Create(record("a", 10, 1)));
        let snapshot = store.records().to_vec();

        assert!(!store.apply(&SyncEvent::Update(RecordPatch::new("zzz").amount(Decimal::from(1)))));
        assert!(!store.apply(&SyncEvent::Delete { id: "zzz".into() }));
        assert_eq!(store.records(), snapshot.as_slice());
    }

    #[test]
    fn test_update_replaces_in_place() {
        let mut store = RecordStore::new();
        store.apply(&SyncEvent::Create(record("a", 5, 1)));
        store.apply(&SyncEvent::Create(record("b", 7, 2)));
        store.apply(&SyncEvent::Update(RecordPatch::new("a").amount(Decimal::from(9)).note("y")));

        assert_eq!(ids(&store), vec!["b", "a"]);
        let a = store.get(&"a".into()).unwrap();
        assert_eq!(a.amount, Decimal::from(9));
        assert_eq!(a.note, "y");
    }

    #[test]
    fn test_update_with_same_values_reports_no_change() {
        let mut store = RecordStore::new();
        store.apply(&SyncEvent::Create(record("a", 5, 1)));
        assert!(!store.apply(&SyncEvent::Update(RecordPatch::new("a").amount(Decimal::from(5)))));
    }

    #[test]
    fn test_create_then_update_matches_merged_create() {
        let mut sequential = RecordStore::new();
        sequential.apply(&SyncEvent::Create(record("a", 5, 1)));
        sequential.apply(&SyncEvent::Update(RecordPatch::new("a").amount(Decimal::from(9)).note("final")));

        let mut merged = RecordStore::new();
        merged.apply(&SyncEvent::Create(Record::new("a", Decimal::from(9), "final", ts(1))));

        assert_eq!(sequential.records(), merged.records());
    }

    #[test]
    fn test_delete_removes_record() {
        let mut store = RecordStore::new();
        store.apply(&SyncEvent::Create(record("a", 10, 1)));
        assert!(store.apply(&SyncEvent::Delete { id: "a".into() }));
        assert!(store.is_empty());
        assert!(!store.apply(&SyncEvent::Delete { id: "a".into() }));
    }

    #[test]
    fn test_replace_all_dedupes_ids() {
        let mut store = RecordStore::new();
        store.apply(&SyncEvent::Create(record("old", 1, 1)));
        store.replace_all(vec![record("a", 1, 3), record("b", 2, 2), record("a", 50, 1)]);

        assert_eq!(ids(&store), vec!["a", "b"]);
        assert_eq!(store.get(&"a".into()).unwrap().amount, Decimal::from(1));
    }

    #[test]
    fn test_state_changes_bump_revision() {
        let mut store = RecordStore::new();
        assert_eq!(store.state(), &SyncState::Uninitialized);

        store.set_state(SyncState::Loading);
        let revision = store.revision();
        store.set_state(SyncState::Loading);
        assert_eq!(store.revision(), revision);

        store.set_state(SyncState::Synced);
        assert!(store.state().is_synced());
        assert!(store.revision() > revision);
    }
}
