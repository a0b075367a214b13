//! Record page rendering - Full page endpoints

use super::api::records_table;
use crate::{i18n, page_response, status_badge, AppState};
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::Html;
use std::collections::HashMap;

/// Merchant entry form
pub async fn page_merchant(
    state: State<AppState>,
    headers: HeaderMap,
    params: Query<HashMap<String, String>>,
) -> Html<String> {
    let lang = state.language(&params);
    let t = i18n::translations(lang);
    let accent = state.accent().await;

    let inner_content = format!(
        r#"<div class='max-w-md mx-auto bg-white rounded-3xl shadow-sm border border-stone-100 p-8'>
    <div class='flex items-center justify-between mb-8'>
        <h2 class='text-2xl font-bold tracking-tight'>{}</h2>
        {}
    </div>
    <form hx-post='/merchant?lang={}' hx-target='#entry-result' hx-on::after-request='if(event.detail.successful) this.reset()' class='space-y-6'>
        <div>
            <label class='block text-xs font-bold uppercase tracking-widest text-stone-400 mb-2'>{}</label>
            <input type='number' name='amount' step='0.01' min='0.01' required autofocus class='w-full text-4xl font-light border-b-2 border-stone-200 focus:accent-border outline-none py-2'>
        </div>
        <div>
            <label class='block text-xs font-bold uppercase tracking-widest text-stone-400 mb-2'>{}</label>
            <input type='text' name='note' placeholder='{}' class='w-full border-b border-stone-200 outline-none py-2'>
        </div>
        <button type='submit' class='w-full py-4 rounded-2xl accent-bg text-white font-semibold'>
            {} <span class='htmx-indicator'>· {}</span>
        </button>
    </form>
    <div id='entry-result' class='mt-6 text-sm text-center'></div>
    <p id='session-stats' class='mt-4 text-xs text-stone-400 uppercase tracking-widest text-center'>{}</p>
</div>"#,
        t.new_entry,
        status_badge(&state.ledger.state(), t),
        lang,
        t.amount_label,
        t.note_label,
        t.note_placeholder,
        t.record_btn,
        t.syncing,
        t.session_stats(state.ledger.session_entries())
    );

    Html(page_response(&headers, t.btn_merchant, "/merchant", lang, &accent, &inner_content))
}

/// Admin page - Theme color and the live record table
pub async fn page_admin(
    state: State<AppState>,
    headers: HeaderMap,
    params: Query<HashMap<String, String>>,
) -> Html<String> {
    let lang = state.language(&params);
    let t = i18n::translations(lang);
    let accent = state.accent().await;

    let inner_content = format!(
        r#"<div class='mb-8 flex items-center justify-between'>
    <h2 class='text-3xl font-bold tracking-tight'>{}</h2>
    {}
</div>
<div class='grid grid-cols-1 lg:grid-cols-3 gap-8'>
    <div class='bg-white rounded-3xl shadow-sm border border-stone-100 p-6'>
        <h3 class='text-sm font-bold uppercase tracking-widest text-stone-400 mb-4'>{}</h3>
        <form hx-post='/admin/accent?lang={}' hx-target='#accent-result' class='space-y-4'>
            <input type='color' value='{}' onchange="this.form.querySelector('[name=color]').value = this.value" class='w-full h-12 rounded-xl'>
            <label class='block text-xs text-stone-400'>{}</label>
            <input type='text' name='color' value='{}' class='w-full font-mono border-b border-stone-200 outline-none py-2'>
            <button type='submit' class='w-full py-3 rounded-xl accent-bg text-white font-semibold'>{}</button>
        </form>
        <div id='accent-result' class='mt-4 text-sm'></div>
    </div>
    <div class='lg:col-span-2 bg-white rounded-3xl shadow-sm border border-stone-100 p-6'>
        <h3 class='text-sm font-bold uppercase tracking-widest text-stone-400 mb-4'>{}</h3>
        <div id='records-table' hx-get='/admin/records?lang={}' hx-trigger='every 2s' hx-swap='innerHTML'>{}</div>
    </div>
</div>"#,
        t.data_mgmt,
        status_badge(&state.ledger.state(), t),
        t.theme,
        lang,
        accent,
        t.hex_code,
        accent,
        t.confirm,
        t.records_title,
        lang,
        records_table(&state, &params)
    );

    Html(page_response(&headers, t.btn_admin, "/admin", lang, &accent, &inner_content))
}
