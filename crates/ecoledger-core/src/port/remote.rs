//! Remote port: writes go to a backend collection and come back as events

use async_trait::async_trait;

use super::{LedgerPort, Subscription, WriteOutcome};
use crate::error::CoreResult;
use crate::models::{NewRecord, Record, RecordId};

/// Backend-as-a-service collection contract
#[async_trait]
pub trait RemoteCollection: Send + Sync {
    /// Newest first, at most `limit` objects
    async fn query(&self, limit: usize) -> CoreResult<Vec<Record>>;

    /// Live create/update/delete events relative to `baseline`, the records
    /// the last query returned
    async fn subscribe(&self, baseline: &[Record]) -> CoreResult<Subscription>;

    /// Create an object; id and creation time are assigned by the backend
    async fn save(&self, record: NewRecord) -> CoreResult<Record>;

    /// Delete an object by id
    async fn destroy(&self, id: &RecordId) -> CoreResult<()>;
}

/// Eventually consistent port over a [`RemoteCollection`]
pub struct RemotePort<C> {
    collection: C,
}

impl<C: RemoteCollection> RemotePort<C> {
    pub fn new(collection: C) -> Self {
        Self { collection }
    }

    pub fn collection(&self) -> &C {
        &self.collection
    }
}

#[async_trait]
impl<C: RemoteCollection> LedgerPort for RemotePort<C> {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn load(&self, limit: usize) -> CoreResult<Vec<Record>> {
        self.collection.query(limit).await
    }

    async fn subscribe(&self, baseline: &[Record]) -> CoreResult<Subscription> {
        self.collection.subscribe(baseline).await
    }

    async fn add(&self, record: NewRecord) -> CoreResult<WriteOutcome> {
        let saved = self.collection.save(record).await?;
        log::debug!("Saved remote record {}, waiting for create event", saved.id);
        Ok(WriteOutcome::Pending)
    }

    async fn remove(&self, id: &RecordId) -> CoreResult<WriteOutcome> {
        self.collection.destroy(id).await?;
        log::debug!("Destroyed remote record {}, waiting for delete event", id);
        Ok(WriteOutcome::Pending)
    }
}
