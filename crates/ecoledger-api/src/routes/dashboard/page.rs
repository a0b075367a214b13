//! Dashboard page rendering - Full page endpoints

use crate::{i18n, page_response, status_badge, AppState};
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::Html;
use ecoledger_config::Language;
use ecoledger_core::CumulativePoint;
use ecoledger_utils::{escape_html, format_amount};
use rust_decimal::prelude::ToPrimitive;
use std::collections::HashMap;

const CHART_WIDTH: f64 = 600.0;
const CHART_HEIGHT: f64 = 240.0;
const RECENT_LIMIT: usize = 20;

/// Inline SVG area chart of the cumulative totals
fn trend_svg(points: &[CumulativePoint], accent: &str) -> String {
    let totals: Vec<f64> = points.iter().map(|p| p.total.to_f64().unwrap_or(0.0)).collect();
    let max = totals.iter().cloned().fold(0.0_f64, f64::max);
    if totals.is_empty() || max <= 0.0 {
        return String::new();
    }

    let step = if totals.len() > 1 {
        CHART_WIDTH / (totals.len() - 1) as f64
    } else {
        0.0
    };
    let coords: Vec<String> = totals
        .iter()
        .enumerate()
        .map(|(i, total)| {
            let x = i as f64 * step;
            let y = CHART_HEIGHT - (total / max) * (CHART_HEIGHT - 10.0);
            format!("{:.1},{:.1}", x, y)
        })
        .collect();

    let last_x = (totals.len() - 1) as f64 * step;
    format!(
        r#"<svg viewBox='0 0 {w} {h}' class='w-full h-64' preserveAspectRatio='none'>
    <polygon points='0,{h} {line} {last_x:.1},{h}' fill='{accent}' fill-opacity='0.1'/>
    <polyline points='{line}' fill='none' stroke='{accent}' stroke-width='3'/>
</svg>"#,
        w = CHART_WIDTH,
        h = CHART_HEIGHT,
        line = coords.join(" "),
        last_x = last_x,
        accent = accent,
    )
}

/// Stat cards, trend chart and recent list
pub(crate) fn dashboard_body(state: &AppState, lang: Language, accent: &str) -> String {
    let t = i18n::translations(lang);
    let stats = state.ledger.stats();
    let offset = state.offset();
    let series = state.ledger.series(&offset);
    let records = state.ledger.records();

    let card = |title: &str, value: String, trend: &str| {
        format!(
            r#"<div class='bg-white rounded-3xl border border-stone-100 p-6 shadow-sm'>
    <p class='text-xs font-bold uppercase tracking-widest text-stone-400'>{}</p>
    <p class='text-3xl font-bold mt-2'>{}</p>
    <p class='text-xs accent-text mt-1'>{}</p>
</div>"#,
            title, value, trend
        )
    };

    let chart = if series.is_empty() {
        format!("<div class='py-24 text-center text-stone-300'>{}</div>", t.no_data)
    } else {
        let labels: Vec<String> = series
            .iter()
            .map(|p| format!("<span>{}</span>", p.time))
            .collect();
        format!(
            "{}<div class='flex justify-between text-xs text-stone-400 mt-2'>{}</div>",
            trend_svg(&series, accent),
            labels.join("")
        )
    };

    let recent = if records.is_empty() {
        format!("<div class='text-center py-12 text-stone-300 text-sm'>{}</div>", t.no_data)
    } else {
        records
            .iter()
            .take(RECENT_LIMIT)
            .map(|r| {
                format!(
                    "<div class='flex justify-between py-3 border-b border-stone-100 text-sm'><span class='text-stone-500 truncate pr-4'>{}</span><span class='text-stone-400 text-xs'>{}</span><span class='font-semibold'>{}</span></div>",
                    escape_html(&r.note),
                    r.timestamp.with_timezone(&offset).format("%H:%M"),
                    state.money(r.amount)
                )
            })
            .collect::<Vec<_>>()
            .join("")
    };

    format!(
        r#"<div class='grid grid-cols-1 md:grid-cols-3 gap-6 mb-8'>{}{}{}</div>
<div class='grid grid-cols-1 lg:grid-cols-3 gap-8'>
    <div class='lg:col-span-2 bg-white rounded-3xl border border-stone-100 p-8 shadow-sm'>
        <h2 class='text-2xl font-light tracking-tight mb-6'>{}</h2>
        {}
    </div>
    <div class='bg-white rounded-3xl border border-stone-200 p-8 shadow-sm'>
        <h2 class='text-lg font-bold tracking-tight mb-6'>{}</h2>
        {}
    </div>
</div>"#,
        card(t.revenue, state.money(stats.total_revenue), t.live),
        card(t.transactions, stats.transaction_count.to_string(), ""),
        card(t.impact, format!("{}g", format_amount(stats.carbon_emissions, 0)), t.co2_saved),
        t.velocity,
        chart,
        t.recent,
        recent
    )
}

/// Dashboard page - Live stats, trend and recent records
pub async fn page_dashboard(
    state: State<AppState>,
    headers: HeaderMap,
    params: Query<HashMap<String, String>>,
) -> Html<String> {
    let lang = state.language(&params);
    let t = i18n::translations(lang);
    let accent = state.accent().await;

    let inner_content = format!(
        r#"<div class='mb-8 flex items-center justify-between'>
    <h1 class='text-2xl font-bold tracking-tight'>{}</h1>
    {}
</div>
<div id='dashboard-live' hx-get='/dashboard/live?lang={}' hx-trigger='every 2s' hx-swap='innerHTML'>{}</div>"#,
        t.trends,
        status_badge(&state.ledger.state(), t),
        lang,
        dashboard_body(&state, lang, &accent)
    );

    Html(page_response(&headers, t.trends, "/dashboard", lang, &accent, &inner_content))
}
