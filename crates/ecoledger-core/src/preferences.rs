//! Accent color preference, persisted in local storage and kept in step
//! with other handles on the same storage.

use once_cell::sync::Lazy;
use regex::Regex;
use tokio::sync::broadcast::{self, error::TryRecvError};

use crate::error::{CoreError, CoreResult};
use crate::storage::{LocalStorage, StorageEvent};

/// Storage key of the accent color
pub const ACCENT_KEY: &str = "accent_color";

/// Compiled-in fallback when nothing valid is stored
pub const DEFAULT_ACCENT: &str = "#7C3AED";

static HEX_COLOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").expect("valid color regex")
});

/// Check for `#RGB` or `#RRGGBB`
pub fn is_valid_color(value: &str) -> bool {
    HEX_COLOR.is_match(value)
}

/// One view's copy of the accent color
pub struct PreferenceStore {
    storage: LocalStorage,
    events: broadcast::Receiver<StorageEvent>,
    accent: String,
    default_accent: String,
}

impl PreferenceStore {
    /// Read the stored accent, falling back to `default_accent` (or the
    /// compiled-in default if that is invalid too)
    pub fn new(storage: LocalStorage, default_accent: &str) -> Self {
        let default_accent = if is_valid_color(default_accent) {
            default_accent.to_string()
        } else {
            log::warn!("Configured default accent {:?} is invalid, using {}", default_accent, DEFAULT_ACCENT);
            DEFAULT_ACCENT.to_string()
        };

        let events = storage.subscribe();
        let accent = Self::read_accent(&storage).unwrap_or_else(|| default_accent.clone());

        Self {
            storage,
            events,
            accent,
            default_accent,
        }
    }

    pub fn accent(&self) -> &str {
        &self.accent
    }

    pub fn default_accent(&self) -> &str {
        &self.default_accent
    }

    /// Change and persist the accent color
    pub fn set_accent(&mut self, color: &str) -> CoreResult<()> {
        let color = color.trim();
        if !is_valid_color(color) {
            return Err(CoreError::ValidationError {
                message: format!("invalid color {:?}, expected #RRGGBB", color),
            });
        }

        self.storage.set(ACCENT_KEY, color)?;
        self.accent = color.to_string();
        Ok(())
    }

    /// Apply accent changes written through other handles; returns whether
    /// the accent changed
    pub fn sync(&mut self) -> bool {
        let before = self.accent.clone();
        loop {
            match self.events.try_recv() {
                Ok(event) => self.on_storage_event(&event),
                Err(TryRecvError::Lagged(skipped)) => {
                    log::debug!("Missed {} storage events, re-reading accent", skipped);
                    if let Some(accent) = Self::read_accent(&self.storage) {
                        self.accent = accent;
                    }
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        self.accent != before
    }

    fn on_storage_event(&mut self, event: &StorageEvent) {
        if event.origin == self.storage.origin() || event.key != ACCENT_KEY {
            return;
        }
        match event.new_value.as_deref() {
            Some(value) if is_valid_color(value) => self.accent = value.to_string(),
            Some(value) => log::warn!("Ignoring invalid accent color from storage: {:?}", value),
            None => {}
        }
    }

    fn read_accent(storage: &LocalStorage) -> Option<String> {
        match storage.get(ACCENT_KEY) {
            Some(value) if is_valid_color(&value) => Some(value),
            Some(value) => {
                log::warn!("Stored accent color {:?} is invalid, using default", value);
                None
            }
            None => None,
        }
    }
}
