//! Dashboard routes - Revenue, impact and cumulative trend
//!
//! The page polls a partial so that live record events show up without a reload.

pub mod api;
pub mod page;

pub use api::{api_series, api_stats, htmx_dashboard_live};
pub use page::page_dashboard;
