//! Core data models for the ledger

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Note stored when the merchant leaves the field empty
pub const NOTE_PLACEHOLDER: &str = "Quick Sale";

/// Largest amount a single entry may carry
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

/// Opaque record identifier assigned by the backing store
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for RecordId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// One ledger transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Unique record identifier
    pub id: RecordId,
    /// Positive amount
    pub amount: Decimal,
    /// Free-text label
    pub note: String,
    /// Creation instant, persisted as epoch milliseconds
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

impl Record {
    pub fn new(id: impl Into<RecordId>, amount: Decimal, note: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            amount,
            note: note.into(),
            timestamp,
        }
    }

    /// Apply the fields present in a patch
    pub fn merge(&mut self, patch: &RecordPatch) {
        if let Some(amount) = patch.amount {
            self.amount = amount;
        }
        if let Some(ref note) = patch.note {
            self.note = note.clone();
        }
        if let Some(timestamp) = patch.timestamp {
            self.timestamp = timestamp;
        }
    }
}

/// Field set for a record that has not been stored yet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRecord {
    pub amount: Decimal,
    pub note: String,
}

impl NewRecord {
    /// Validate user input; an empty note becomes the placeholder
    pub fn new(amount: Decimal, note: &str) -> CoreResult<Self> {
        if amount <= Decimal::ZERO {
            return Err(CoreError::ValidationError {
                message: format!("amount must be greater than 0, got {}", amount),
            });
        }
        if amount > MAX_AMOUNT {
            return Err(CoreError::ValidationError {
                message: format!("amount must not exceed {}, got {}", MAX_AMOUNT, amount),
            });
        }

        let note = note.trim();
        let note = if note.is_empty() { NOTE_PLACEHOLDER } else { note };

        Ok(Self {
            amount,
            note: note.to_string(),
        })
    }

    /// Turn into a stored record
    pub fn into_record(self, id: impl Into<RecordId>, timestamp: DateTime<Utc>) -> Record {
        Record::new(id, self.amount, self.note, timestamp)
    }
}

/// Payload of an update event; absent fields stay untouched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordPatch {
    pub id: RecordId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "chrono::serde::ts_milliseconds_option")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl RecordPatch {
    pub fn new(id: impl Into<RecordId>) -> Self {
        Self {
            id: id.into(),
            amount: None,
            note: None,
            timestamp: None,
        }
    }

    pub fn amount(mut self, amount: Decimal) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

impl From<Record> for RecordPatch {
    fn from(record: Record) -> Self {
        Self {
            id: record.id,
            amount: Some(record.amount),
            note: Some(record.note),
            timestamp: Some(record.timestamp),
        }
    }
}
