//! Storage ports
//!
//! The sync controller only talks to a [`LedgerPort`]. Two families exist:
//!
//! - [`LocalPort`]: writes apply at once and hand back the event to apply.
//! - [`RemotePort`]: writes are requests; the visible change arrives later
//!   through the subscription ("eventual echo").

pub mod local;
pub mod memory;
pub mod remote;
pub mod rest;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::CoreResult;
use crate::models::{NewRecord, Record, RecordId};
use crate::types::SyncEvent;

pub use local::{LocalPort, RECORDS_KEY};
pub use memory::InMemoryCollection;
pub use remote::{RemoteCollection, RemotePort};
pub use rest::{RestCollection, RestSettings};

/// Port reference type
pub type PortRef = Arc<dyn LedgerPort>;

/// What a write did to the local view
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome {
    /// Already committed; apply this event now
    Applied(SyncEvent),
    /// Accepted by the backend; the change will arrive as a live event
    Pending,
}

/// Storage interface the sync controller is written against
#[async_trait]
pub trait LedgerPort: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Most recent records first, at most `limit`
    async fn load(&self, limit: usize) -> CoreResult<Vec<Record>>;

    /// Open a live feed of changes made after `baseline` was loaded
    async fn subscribe(&self, baseline: &[Record]) -> CoreResult<Subscription>;

    /// Store a new record
    async fn add(&self, record: NewRecord) -> CoreResult<WriteOutcome>;

    /// Delete a record by id
    async fn remove(&self, id: &RecordId) -> CoreResult<WriteOutcome>;
}

/// Live feed of change events
///
/// Closing (or dropping) the subscription closes the channel and stops the
/// producer task, if any.
#[derive(Debug)]
pub struct Subscription {
    events: mpsc::UnboundedReceiver<SyncEvent>,
    producer: Option<JoinHandle<()>>,
}

impl Subscription {
    pub fn new(events: mpsc::UnboundedReceiver<SyncEvent>) -> Self {
        Self { events, producer: None }
    }

    /// Subscription fed by a background task
    pub fn with_producer(events: mpsc::UnboundedReceiver<SyncEvent>, producer: JoinHandle<()>) -> Self {
        Self {
            events,
            producer: Some(producer),
        }
    }

    /// A feed that never delivers anything
    pub fn idle() -> Self {
        let (_tx, rx) = mpsc::unbounded_channel();
        Self::new(rx)
    }

    /// Next event, or `None` once the feed has ended
    pub async fn next(&mut self) -> Option<SyncEvent> {
        self.events.recv().await
    }

    /// Next event if one is already queued
    pub fn try_next(&mut self) -> Option<SyncEvent> {
        self.events.try_recv().ok()
    }

    /// Stop delivery
    pub fn close(&mut self) {
        self.events.close();
        if let Some(producer) = self.producer.take() {
            producer.abort();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.close();
    }
}
