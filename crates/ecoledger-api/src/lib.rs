//! HTTP API server with HTMX support
//!
//! Routes are organized into modules:
//! - routes::records: Record list, entry form, deletion, sync status
//! - routes::dashboard: Aggregate stats, cumulative trend, live dashboard
//! - routes::preferences: Accent color

pub mod error;
pub mod i18n;
pub mod routes;

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::Html,
    routing::{delete, get, post, put},
    Router,
};
use chrono::FixedOffset;
use ecoledger_config::{Config, Language};
use ecoledger_core::reports::display_offset;
use ecoledger_core::{LedgerSync, PreferenceStore, SyncState};
use ecoledger_utils::escape_html;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;

pub use error::{ApiError, ApiResult};
use i18n::Translations;

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<LedgerSync>,
    pub preferences: Arc<Mutex<PreferenceStore>>,
    pub config: Config,
}

impl AppState {
    pub fn new(config: Config, ledger: Arc<LedgerSync>, preferences: PreferenceStore) -> Self {
        Self {
            ledger,
            preferences: Arc::new(Mutex::new(preferences)),
            config,
        }
    }

    /// Current accent color, after taking in changes made through other storage handles
    pub async fn accent(&self) -> String {
        let mut preferences = self.preferences.lock().await;
        preferences.sync();
        preferences.accent().to_string()
    }

    pub fn offset(&self) -> FixedOffset {
        display_offset(self.config.display.utc_offset_minutes)
    }

    /// Amount with currency symbol, e.g. "¥1,234.50"
    pub fn money(&self, amount: Decimal) -> String {
        ecoledger_utils::format_currency(
            amount,
            &self.config.display.currency_symbol,
            self.config.display.decimal_places,
        )
    }

    pub fn language(&self, params: &HashMap<String, String>) -> Language {
        i18n::request_language(params, self.config.display.language)
    }
}

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    use routes::dashboard::{api_series, api_stats, htmx_dashboard_live, page_dashboard};
    use routes::preferences::{api_preferences, api_set_accent, htmx_accent_store};
    use routes::records::{
        api_record_create, api_record_delete, api_records, api_sync, htmx_record_delete, htmx_record_store,
        htmx_records_list, page_admin, page_merchant,
    };

    Router::new()
        // API endpoints
        .route("/api/health", get(health_check))
        .route("/api/records", get(api_records).post(api_record_create))
        .route("/api/records/:id", delete(api_record_delete))
        .route("/api/stats", get(api_stats))
        .route("/api/series", get(api_series))
        .route("/api/sync", get(api_sync))
        .route("/api/preferences", get(api_preferences))
        .route("/api/preferences/accent", put(api_set_accent))
        // HTMX page routes
        .route("/", get(index_page))
        .route("/merchant", get(page_merchant).post(htmx_record_store))
        .route("/admin", get(page_admin))
        .route("/dashboard", get(page_dashboard))
        // HTMX partial routes
        .route("/admin/records", get(htmx_records_list))
        .route("/admin/records/:id/delete", post(htmx_record_delete))
        .route("/admin/accent", post(htmx_accent_store))
        .route("/dashboard/live", get(htmx_dashboard_live))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

// ==================== Template Functions ====================

/// Base HTML template
pub fn base_html(title: &str, lang: Language, accent: &str, content: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="{}">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{} - Ecoledger</title>
    <script src="https://unpkg.com/htmx.org@1.9.10"></script>
    <script src="https://cdn.tailwindcss.com"></script>
    <style>
        :root {{ --accent: {}; }}
        .accent-text {{ color: var(--accent); }}
        .accent-bg {{ background-color: var(--accent); }}
        .accent-border {{ border-color: var(--accent); }}
        .htmx-indicator {{ opacity: 0; transition: opacity 0.3s; }}
        .htmx-request .htmx-indicator {{ opacity: 1; }}
        .htmx-request.htmx-indicator {{ opacity: 1; }}
    </style>
</head>
<body class="bg-stone-50 text-stone-900">
    {}
</body>
</html>"#,
        match lang {
            Language::En => "en",
            Language::Zh => "zh-CN",
        },
        escape_html(title),
        accent,
        content
    )
}

/// Top navigation bar with back link and language switch
pub fn nav_bar(current_path: &str, lang: Language) -> String {
    let t = i18n::translations(lang);
    let (other, switch_label) = i18n::switch_target(lang);

    let back = if current_path == "/" {
        String::new()
    } else {
        format!(
            "<a href='/?lang={}' class='text-sm text-stone-500 hover:text-stone-900'>← {}</a>",
            lang, t.back
        )
    };

    format!(
        r#"<nav class='flex items-center justify-between px-6 py-4'>
    <div>{}</div>
    <a href='{}?lang={}' class='px-4 py-2 rounded-full bg-white border border-stone-100 text-xs font-bold uppercase tracking-widest text-stone-500'>{}</a>
</nav>"#,
        back, current_path, other, switch_label
    )
}

/// Connection badge for the current sync state
pub fn status_badge(state: &SyncState, t: &Translations) -> String {
    let (label, class) = match state {
        SyncState::Uninitialized => (t.status_idle, "bg-stone-100 text-stone-500"),
        SyncState::Loading => (t.status_loading, "bg-amber-50 text-amber-700"),
        SyncState::Synced => (t.status_synced, "bg-emerald-50 text-emerald-700"),
        SyncState::Error { .. } => (t.status_error, "bg-red-50 text-red-700"),
    };
    format!(
        "<span class='inline-flex items-center gap-2 px-3 py-1 rounded-full text-xs font-semibold {}'>{}</span>",
        class, label
    )
}

/// Check if request is from HTMX (partial page update)
fn is_htmx_request(headers: &HeaderMap) -> bool {
    headers.get("hx-request").is_some()
}

/// Wrap content for full page or HTMX partial
pub fn page_response(
    headers: &HeaderMap,
    title: &str,
    current_path: &str,
    lang: Language,
    accent: &str,
    inner_content: &str,
) -> String {
    if is_htmx_request(headers) {
        format!("<main class='max-w-5xl mx-auto p-6'>{}</main>", inner_content)
    } else {
        base_html(
            title,
            lang,
            accent,
            &format!(
                "{}<main class='max-w-5xl mx-auto p-6'>{}</main>",
                nav_bar(current_path, lang),
                inner_content
            ),
        )
    }
}

/// Decode an `application/x-www-form-urlencoded` body
pub fn parse_form(body: &str) -> HashMap<String, String> {
    let decode = |part: &str| {
        let part = part.replace('+', " ");
        urlencoding::decode(&part).map(|s| s.into_owned()).unwrap_or(part)
    };

    body.split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => (decode(key), decode(value)),
            None => (decode(pair), String::new()),
        })
        .collect()
}

/// Landing page with the three entry points
async fn index_page(
    state: State<AppState>,
    headers: HeaderMap,
    params: Query<HashMap<String, String>>,
) -> Html<String> {
    let lang = state.language(&params);
    let t = i18n::translations(lang);
    let accent = state.accent().await;

    let inner_content = format!(
        r#"<div class='flex flex-col items-center text-center py-16'>
    <h1 class='text-7xl md:text-8xl font-bold tracking-tighter leading-tight mb-16 flex flex-col items-center'>
        <span>{}</span>
        <span class='accent-text'>{}</span>
    </h1>
    <div class='grid grid-cols-1 md:grid-cols-3 gap-4 w-full max-w-3xl mb-10'>
        <a href='/merchant?lang={lang}' class='px-6 py-5 rounded-2xl bg-white border border-stone-100 shadow-sm font-semibold'>{}</a>
        <a href='/dashboard?lang={lang}' class='px-6 py-5 rounded-2xl accent-bg text-white shadow-sm font-semibold'>{}</a>
        <a href='/admin?lang={lang}' class='px-6 py-5 rounded-2xl bg-white border border-stone-100 shadow-sm font-semibold'>{}</a>
    </div>
    <div>{}</div>
</div>"#,
        t.title_line1,
        t.title_line2,
        t.btn_merchant,
        t.btn_dashboard,
        t.btn_admin,
        status_badge(&state.ledger.state(), t),
        lang = lang,
    );

    Html(page_response(&headers, t.btn_dashboard, "/", lang, &accent, &inner_content))
}

/// Start the HTTP server
///
/// Serves until `shutdown` completes, then drains open connections.
pub async fn start_server<F>(state: AppState, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = format!("{}:{}", state.config.server.host, state.config.server.port);
    let router = create_router(state);

    let listener = TcpListener::bind(&addr).await?;
    log::info!("Starting Ecoledger server on http://{}", addr);
    log::info!("Available routes:");
    log::info!("  - / (Home)");
    log::info!("  - /merchant (Record entry)");
    log::info!("  - /admin (Records and theme)");
    log::info!("  - /dashboard (Live analytics)");
    log::info!("  - /api/* (JSON API endpoints)");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;

    log::info!("Server stopped gracefully");
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use ecoledger_core::port::{InMemoryCollection, LocalPort, RemotePort};
    use ecoledger_core::LocalStorage;

    /// State over in-memory local storage, already mounted
    pub async fn local_state() -> AppState {
        let storage = LocalStorage::in_memory();
        let ledger = LedgerSync::new(Arc::new(LocalPort::new(storage.handle())), 100);
        ledger.mount().await.unwrap();
        let preferences = PreferenceStore::new(storage.handle(), "#7C3AED");
        AppState::new(Config::default(), ledger, preferences)
    }

    /// State over an in-process remote collection, already mounted
    pub async fn remote_state(collection: &InMemoryCollection) -> AppState {
        let ledger = LedgerSync::new(Arc::new(RemotePort::new(collection.clone())), 100);
        ledger.mount().await.unwrap();
        let preferences = PreferenceStore::new(LocalStorage::in_memory(), "#7C3AED");
        AppState::new(Config::default(), ledger, preferences)
    }

    pub async fn body_string(response: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[test]
    fn test_parse_form() {
        let form = parse_form("amount=12.5&note=Old+books%21&empty=");
        assert_eq!(form.get("amount").map(String::as_str), Some("12.5"));
        assert_eq!(form.get("note").map(String::as_str), Some("Old books!"));
        assert_eq!(form.get("empty").map(String::as_str), Some(""));
    }

    #[tokio::test]
    async fn test_health() {
        let router = create_router(local_state().await);
        let response = router
            .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "OK");
    }

    #[tokio::test]
    async fn test_index_page_translates() {
        let router = create_router(local_state().await);
        let response = router
            .oneshot(Request::builder().uri("/?lang=en").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = body_string(response).await;
        assert!(body.contains("REIMAGINE"));
        assert!(body.contains("Connected"));
        assert!(body.contains("--accent: #7C3AED"));
    }

    #[tokio::test]
    async fn test_htmx_request_gets_partial() {
        let router = create_router(local_state().await);
        let response = router
            .oneshot(
                Request::builder()
                    .uri("/?lang=zh")
                    .header("hx-request", "true")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = body_string(response).await;
        assert!(body.contains("重塑"));
        assert!(!body.contains("<!DOCTYPE html>"));
    }
}
