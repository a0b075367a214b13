//! Basic types for the synchronization core

use serde::{Deserialize, Serialize};

use crate::models::{Record, RecordId, RecordPatch};

/// Lifecycle of the record store for one mount
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum SyncState {
    /// Not mounted yet
    Uninitialized,
    /// Initial fetch in flight
    Loading,
    /// Initial fetch applied; live events are being merged
    Synced,
    /// Initial fetch failed; no retry for this session
    Error { message: String },
}

impl Default for SyncState {
    fn default() -> Self {
        SyncState::Uninitialized
    }
}

impl SyncState {
    pub fn is_loading(&self) -> bool {
        matches!(self, SyncState::Uninitialized | SyncState::Loading)
    }

    pub fn is_synced(&self) -> bool {
        matches!(self, SyncState::Synced)
    }
}

impl std::fmt::Display for SyncState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncState::Uninitialized => write!(f, "uninitialized"),
            SyncState::Loading => write!(f, "loading"),
            SyncState::Synced => write!(f, "synced"),
            SyncState::Error { .. } => write!(f, "error"),
        }
    }
}

/// One change delivered by a subscription (or produced by a local write)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SyncEvent {
    Create(Record),
    Update(RecordPatch),
    Delete { id: RecordId },
}

impl SyncEvent {
    /// Id of the record the event targets
    pub fn id(&self) -> &RecordId {
        match self {
            SyncEvent::Create(record) => &record.id,
            SyncEvent::Update(patch) => &patch.id,
            SyncEvent::Delete { id } => id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            SyncEvent::Create(_) => "create",
            SyncEvent::Update(_) => "update",
            SyncEvent::Delete { .. } => "delete",
        }
    }
}
