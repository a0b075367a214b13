//! Record routes - Entry form, admin table, JSON record API
//!
//! Structure:
//! - api.rs: JSON API and HTMX endpoints
//! - page.rs: Full page rendering

pub mod api;
pub mod page;

pub use api::{
    api_record_create,
    api_record_delete,
    api_records,
    api_sync,
    htmx_record_delete,
    htmx_record_store,
    htmx_records_list,
};

pub use page::{page_admin, page_merchant};
