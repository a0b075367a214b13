//! Records API endpoints - JSON API and HTMX partial responses
//!
//! Endpoints:
//! - api_records: Current records (JSON)
//! - api_record_create: Add a record (JSON)
//! - api_record_delete: Delete a record (JSON)
//! - api_sync: Synchronization status (JSON)
//! - htmx_record_store: Entry form submit (HTML fragment)
//! - htmx_records_list: Admin record table (HTML fragment)
//! - htmx_record_delete: Delete from the admin table (HTML fragment)

use crate::{i18n, parse_form, ApiError, ApiResult, AppState};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::Json;
use ecoledger_core::{Record, RecordId, SyncEvent, SyncState, WriteOutcome};
use ecoledger_utils::escape_html;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

#[derive(Debug, Deserialize)]
pub struct CreateRecordRequest {
    pub amount: Decimal,
    #[serde(default)]
    pub note: String,
}

#[derive(Debug, Serialize)]
pub struct RecordsResponse {
    pub records: Vec<Record>,
    pub total_count: usize,
    #[serde(flatten)]
    pub state: SyncState,
}

#[derive(Debug, Serialize)]
pub struct SyncStatusResponse {
    #[serde(flatten)]
    pub state: SyncState,
    pub storage: &'static str,
    pub live: bool,
    pub revision: u64,
    pub record_count: usize,
    pub fetch_limit: usize,
    pub session_entries: usize,
}

/// JSON body for a write, with the status telling whether it is already visible
fn write_response(outcome: WriteOutcome) -> (StatusCode, Json<serde_json::Value>) {
    match outcome {
        WriteOutcome::Applied(SyncEvent::Create(record)) => (
            StatusCode::CREATED,
            Json(serde_json::json!({ "status": "applied", "record": record })),
        ),
        WriteOutcome::Applied(event) => (
            StatusCode::OK,
            Json(serde_json::json!({ "status": "applied", "event": event })),
        ),
        WriteOutcome::Pending => (StatusCode::ACCEPTED, Json(serde_json::json!({ "status": "pending" }))),
    }
}

/// Get current records, newest first (JSON API)
pub async fn api_records(
    state: State<AppState>,
    params: Query<HashMap<String, String>>,
) -> Json<RecordsResponse> {
    let records = state.ledger.records();
    let total_count = records.len();
    let limit = params.get("limit").and_then(|s| s.parse().ok()).unwrap_or(total_count);

    Json(RecordsResponse {
        records: records.into_iter().take(limit).collect(),
        total_count,
        state: state.ledger.state(),
    })
}

/// Add a record (JSON API)
///
/// Local storage answers `201` with the stored record; remote storage answers
/// `202` and the record appears once the backend confirms it.
pub async fn api_record_create(
    state: State<AppState>,
    Json(request): Json<CreateRecordRequest>,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    let outcome = state.ledger.add(request.amount, &request.note).await?;
    Ok(write_response(outcome))
}

/// Delete a record (JSON API)
pub async fn api_record_delete(
    state: State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    let outcome = state.ledger.remove(&RecordId::new(id)).await?;
    Ok(write_response(outcome))
}

/// Synchronization status (JSON API)
pub async fn api_sync(state: State<AppState>) -> Json<SyncStatusResponse> {
    let ledger = &state.ledger;
    Json(SyncStatusResponse {
        state: ledger.state(),
        storage: ledger.port_name(),
        live: ledger.is_live(),
        revision: ledger.revision(),
        record_count: ledger.records().len(),
        fetch_limit: ledger.fetch_limit(),
        session_entries: ledger.session_entries(),
    })
}

fn parse_amount(value: &str) -> ApiResult<Decimal> {
    Decimal::from_str(value.trim()).map_err(|_| ApiError::BadRequest {
        message: format!("invalid amount: {:?}", value),
    })
}

/// HTMX: Entry form submit - Status message for the merchant page
pub async fn htmx_record_store(
    state: State<AppState>,
    params: Query<HashMap<String, String>>,
    body: String,
) -> Html<String> {
    let t = i18n::translations(state.language(&params));
    let form = parse_form(&body);

    let amount = form.get("amount").map(String::as_str).unwrap_or_default();
    let note = form.get("note").map(String::as_str).unwrap_or_default();

    let result = match parse_amount(amount) {
        Ok(amount) => state.ledger.add(amount, note).await.map_err(ApiError::from),
        Err(e) => Err(e),
    };

    let message = match result {
        Ok(WriteOutcome::Applied(_)) => format!("<p class='text-emerald-600 font-medium'>{}</p>", t.recorded),
        Ok(WriteOutcome::Pending) => format!("<p class='text-amber-600 font-medium'>{}</p>", t.pending),
        Err(e) => format!("<p class='text-red-600 font-medium'>{}</p>", escape_html(&e.to_string())),
    };

    Html(format!(
        "{}<p id='session-stats' hx-swap-oob='true' class='text-xs text-stone-400 uppercase tracking-widest'>{}</p>",
        message,
        t.session_stats(state.ledger.session_entries())
    ))
}

/// Admin record table
pub(crate) fn records_table(state: &AppState, params: &HashMap<String, String>) -> String {
    let lang = state.language(params);
    let t = i18n::translations(lang);
    let ledger_state = state.ledger.state();

    if ledger_state.is_loading() {
        return format!("<div class='py-16 text-center text-stone-400'>{}</div>", t.syncing);
    }

    let records = state.ledger.records();
    if records.is_empty() {
        return format!("<div class='py-16 text-center text-stone-300'>{}</div>", t.empty);
    }

    let offset = state.offset();
    let rows: Vec<String> = records
        .iter()
        .map(|record| {
            format!(
                r#"<div class='grid grid-cols-12 items-center py-4 border-b border-stone-100 text-sm px-4'>
    <div class='col-span-3 font-semibold text-stone-900'>{}</div>
    <div class='col-span-4 text-stone-500 font-medium truncate pr-4'>{}</div>
    <div class='col-span-3 text-stone-400 text-xs uppercase tracking-wide'>{}</div>
    <div class='col-span-2 text-right'>
        <button hx-post='/admin/records/{}/delete?lang={}' hx-target='#records-table' hx-confirm='{}' class='text-xs font-bold uppercase tracking-wider text-stone-400 hover:text-red-600'>{}</button>
    </div>
</div>"#,
                state.money(record.amount),
                escape_html(&record.note),
                record.timestamp.with_timezone(&offset).format("%H:%M"),
                urlencoding::encode(record.id.as_str()),
                lang,
                t.confirm,
                t.remove
            )
        })
        .collect();

    rows.join("")
}

/// HTMX: Admin record table - Polled for live changes
pub async fn htmx_records_list(
    state: State<AppState>,
    params: Query<HashMap<String, String>>,
) -> Html<String> {
    Html(records_table(&state, &params))
}

/// HTMX: Delete from the admin table
///
/// With remote storage the row stays until the delete is confirmed by the
/// backend and the next poll of the table picks it up.
pub async fn htmx_record_delete(
    state: State<AppState>,
    Path(id): Path<String>,
    params: Query<HashMap<String, String>>,
) -> Html<String> {
    let mut content = String::new();
    if let Err(e) = state.ledger.remove(&RecordId::new(id)).await {
        content.push_str(&format!(
            "<p class='px-4 py-2 text-sm text-red-600'>{}</p>",
            escape_html(&e.to_string())
        ));
    }
    content.push_str(&records_table(&state, &params));
    Html(content)
}
