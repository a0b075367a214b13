//! Route modules for the API server
//!
//! - records: Record list, entry form, deletion, sync status
//! - dashboard: Aggregate stats and cumulative trend
//! - preferences: Accent color
//!
//! Each module follows a consistent structure:
//! - mod.rs: Module declaration and exports
//! - api.rs: JSON API endpoints and HTMX partial responses
//! - page.rs: HTMX page rendering

pub mod dashboard;
pub mod preferences;
pub mod records;
