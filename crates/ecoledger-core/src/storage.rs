//! Durable key-value storage shared by preference and local-only record data
//!
//! The whole map is one JSON object on disk. Writes go to a sibling temp file
//! first and are renamed into place. Each handle has an origin id; every
//! successful `set` is broadcast to all handles so that other handles can
//! react to changes they did not make.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::error::{CoreError, CoreResult};

const EVENT_CAPACITY: usize = 64;

/// Identifies the handle that performed a write
pub type Origin = u64;

/// Change notification for one key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageEvent {
    pub key: String,
    /// `None` when the key was removed
    pub new_value: Option<String>,
    pub origin: Origin,
}

struct Inner {
    path: Option<PathBuf>,
    entries: Mutex<BTreeMap<String, String>>,
    events: broadcast::Sender<StorageEvent>,
    next_origin: AtomicU64,
}

/// Handle to a key-value map
pub struct LocalStorage {
    inner: Arc<Inner>,
    origin: Origin,
}

impl LocalStorage {
    /// Open (or lazily create) a file-backed map
    pub fn open(path: impl Into<PathBuf>) -> CoreResult<Self> {
        let path = path.into();
        let entries = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&content).map_err(|e| CoreError::InvalidFormat {
                    message: format!("{}: {}", path.display(), e),
                })?
            }
        } else {
            BTreeMap::new()
        };

        log::debug!("Opened local storage at {} ({} keys)", path.display(), entries.len());
        Ok(Self::with_entries(Some(path), entries))
    }

    /// Map that lives only as long as its handles
    pub fn in_memory() -> Self {
        Self::with_entries(None, BTreeMap::new())
    }

    fn with_entries(path: Option<PathBuf>, entries: BTreeMap<String, String>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let inner = Arc::new(Inner {
            path,
            entries: Mutex::new(entries),
            events,
            next_origin: AtomicU64::new(1),
        });
        Self { inner, origin: 0 }
    }

    /// A new handle on the same map with its own origin
    pub fn handle(&self) -> Self {
        let origin = self.inner.next_origin.fetch_add(1, Ordering::Relaxed);
        Self {
            inner: Arc::clone(&self.inner),
            origin,
        }
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn path(&self) -> Option<&Path> {
        self.inner.path.as_deref()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries().get(key).cloned()
    }

    /// Store a value, persist the map and notify other handles
    pub fn set(&self, key: &str, value: &str) -> CoreResult<()> {
        {
            let mut entries = self.entries();
            let previous = entries.insert(key.to_string(), value.to_string());
            if let Err(e) = self.persist(&entries) {
                match previous {
                    Some(old) => entries.insert(key.to_string(), old),
                    None => entries.remove(key),
                };
                return Err(e);
            }
        }
        self.notify(key, Some(value.to_string()));
        Ok(())
    }

    /// Remove a key; returns whether it existed
    pub fn remove(&self, key: &str) -> CoreResult<bool> {
        {
            let mut entries = self.entries();
            let Some(previous) = entries.remove(key) else {
                return Ok(false);
            };
            if let Err(e) = self.persist(&entries) {
                entries.insert(key.to_string(), previous);
                return Err(e);
            }
        }
        self.notify(key, None);
        Ok(true)
    }

    /// Receive change notifications from every handle, including this one
    pub fn subscribe(&self) -> broadcast::Receiver<StorageEvent> {
        self.inner.events.subscribe()
    }

    fn entries(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.inner.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn notify(&self, key: &str, new_value: Option<String>) {
        // No receivers is fine
        let _ = self.inner.events.send(StorageEvent {
            key: key.to_string(),
            new_value,
            origin: self.origin,
        });
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> CoreResult<()> {
        let Some(path) = self.inner.path.as_ref() else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let content = serde_json::to_string_pretty(entries)?;
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}

impl Clone for LocalStorage {
    /// Clones keep the origin; use [`LocalStorage::handle`] for a distinct one
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            origin: self.origin,
        }
    }
}

impl std::fmt::Debug for LocalStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalStorage")
            .field("path", &self.inner.path)
            .field("origin", &self.origin)
            .finish()
    }
}
