//! Derived views over the current record set
//!
//! Everything here is a pure function of a record slice and is recomputed
//! after each store change.

use chrono::{FixedOffset, Offset, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::Record;

/// Multiplier turning revenue into the displayed impact figure
pub const IMPACT_FACTOR: Decimal = Decimal::from_parts(5, 0, 0, false, 0);

/// Aggregate figures for the dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_revenue: Decimal,
    pub transaction_count: usize,
    pub carbon_emissions: Decimal,
}

impl DashboardStats {
    /// Totals saturate at `Decimal::MAX` so remote amounts cannot overflow
    pub fn from_records(records: &[Record]) -> Self {
        let total_revenue = records
            .iter()
            .fold(Decimal::ZERO, |sum, r| sum.saturating_add(r.amount));
        Self {
            total_revenue,
            transaction_count: records.len(),
            carbon_emissions: total_revenue.saturating_mul(IMPACT_FACTOR),
        }
    }
}

/// One point of the cumulative revenue trend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CumulativePoint {
    /// 1-based position in chronological order
    pub sequence: usize,
    /// Running total up to and including this record
    pub total: Decimal,
    pub amount: Decimal,
    /// HH:MM label in the display offset
    pub time: String,
}

/// Running revenue totals in ascending timestamp order
///
/// The sort is stable, so records sharing a timestamp keep their relative
/// store order.
pub fn cumulative_series(records: &[Record], offset: &FixedOffset) -> Vec<CumulativePoint> {
    let mut sorted: Vec<&Record> = records.iter().collect();
    sorted.sort_by_key(|r| r.timestamp);

    let mut running = Decimal::ZERO;
    sorted
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            running = running.saturating_add(record.amount);
            CumulativePoint {
                sequence: index + 1,
                total: running,
                amount: record.amount,
                time: record.timestamp.with_timezone(offset).format("%H:%M").to_string(),
            }
        })
        .collect()
}

/// Build a fixed offset from minutes east of UTC, falling back to UTC
pub fn display_offset(minutes: i32) -> FixedOffset {
    FixedOffset::east_opt(minutes * 60).unwrap_or_else(|| Utc.fix())
}
