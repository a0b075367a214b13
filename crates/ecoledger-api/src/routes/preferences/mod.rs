//! Preference routes - Accent color

pub mod api;

pub use api::{api_preferences, api_set_accent, htmx_accent_store};
