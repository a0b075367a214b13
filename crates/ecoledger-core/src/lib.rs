//! Ledger records, live synchronization and derived views

pub mod error;
pub mod models;
pub mod port;
pub mod preferences;
pub mod reports;
pub mod storage;
pub mod store;
pub mod sync;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use ecoledger_config::{Config, RemoteKind, StorageMode};

pub use error::{CoreError, CoreResult, ErrorSeverity};
pub use models::{NewRecord, Record, RecordId, RecordPatch, MAX_AMOUNT};
pub use port::{LedgerPort, PortRef, WriteOutcome};
pub use preferences::PreferenceStore;
pub use reports::{CumulativePoint, DashboardStats};
pub use storage::LocalStorage;
pub use sync::LedgerSync;
pub use types::{SyncEvent, SyncState};

use port::{InMemoryCollection, LocalPort, RemotePort, RestCollection, RestSettings};

/// Build the storage port selected by `storage.mode`
///
/// Local mode keeps records in `storage`, next to the preferences.
pub fn build_port(config: &Config, storage: &LocalStorage) -> CoreResult<PortRef> {
    let port: PortRef = match config.storage.mode {
        StorageMode::Local => Arc::new(LocalPort::new(storage.handle())),
        StorageMode::Remote => {
            let remote = config.storage.remote.as_ref().ok_or_else(|| CoreError::ConfigError {
                message: "storage.remote is required in remote mode".to_string(),
            })?;
            match remote.kind {
                RemoteKind::Memory => Arc::new(RemotePort::new(InMemoryCollection::new())),
                RemoteKind::Rest => {
                    let settings = RestSettings {
                        base_url: remote.base_url.clone(),
                        collection: remote.collection.clone(),
                        app_id: remote.app_id.clone(),
                        app_key: remote.app_key.clone(),
                        poll_interval: Duration::from_millis(remote.poll_interval_ms),
                        request_timeout: Duration::from_millis(remote.request_timeout_ms),
                        window: config.storage.fetch_limit,
                    };
                    Arc::new(RemotePort::new(RestCollection::new(settings)?))
                }
            }
        }
    };

    log::info!("Using {} storage ({})", port.name(), config.storage.mode);
    Ok(port)
}
