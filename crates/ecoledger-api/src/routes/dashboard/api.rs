//! Dashboard API endpoints - JSON API and HTMX partial responses

use super::page::dashboard_body;
use crate::AppState;
use axum::extract::{Query, State};
use axum::response::Html;
use axum::Json;
use ecoledger_core::{CumulativePoint, DashboardStats};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub stats: DashboardStats,
    pub session_entries: usize,
}

/// Aggregate revenue and impact (JSON API)
pub async fn api_stats(state: State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        stats: state.ledger.stats(),
        session_entries: state.ledger.session_entries(),
    })
}

/// Cumulative revenue in chronological order (JSON API)
pub async fn api_series(state: State<AppState>) -> Json<Vec<CumulativePoint>> {
    Json(state.ledger.series(&state.offset()))
}

/// HTMX: Dashboard content - Polled for live updates
pub async fn htmx_dashboard_live(
    state: State<AppState>,
    params: Query<HashMap<String, String>>,
) -> Html<String> {
    let accent = state.accent().await;
    Html(dashboard_body(&state, state.language(&params), &accent))
}

#[cfg(test)]
mod tests {
    use crate::create_router;
    use crate::test_support::*;
    use axum::body::Body;
    use axum::http::Request;
    use ecoledger_core::{Record, SyncEvent};
    use rust_decimal::Decimal;
    use tower::ServiceExt;

    fn record(id: &str, amount: i64, minute: i64) -> Record {
        let timestamp = chrono::DateTime::from_timestamp(minute * 60, 0).unwrap();
        Record::new(id, Decimal::from(amount), "x", timestamp)
    }

    async fn get_json(state: crate::AppState, uri: &str) -> serde_json::Value {
        let response = create_router(state)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        serde_json::from_str(&body_string(response).await).unwrap()
    }

    #[tokio::test]
    async fn test_stats() {
        let state = local_state().await;
        state.ledger.dispatch(&SyncEvent::Create(record("a", 10, 1)));
        state.ledger.dispatch(&SyncEvent::Create(record("b", 20, 2)));

        let stats = get_json(state, "/api/stats").await;
        assert_eq!(stats["total_revenue"], "30");
        assert_eq!(stats["transaction_count"], 2);
        assert_eq!(stats["carbon_emissions"], "150");
    }

    #[tokio::test]
    async fn test_series_is_chronological() {
        let state = local_state().await;
        state.ledger.dispatch(&SyncEvent::Create(record("late", 5, 90)));
        state.ledger.dispatch(&SyncEvent::Create(record("early", 10, 30)));

        let series = get_json(state, "/api/series").await;
        let points = series.as_array().unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0]["total"], "10");
        assert_eq!(points[1]["total"], "15");
        // Default display offset is UTC+8
        assert_eq!(points[0]["time"], "08:30");
    }

    #[tokio::test]
    async fn test_live_partial_renders_stats() {
        let state = local_state().await;
        state.ledger.dispatch(&SyncEvent::Create(record("a", 10, 1)));

        let response = create_router(state)
            .oneshot(Request::builder().uri("/dashboard/live?lang=en").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = body_string(response).await;
        assert!(body.contains("¥10.00"));
        assert!(body.contains("50g"));
        assert!(!body.contains("<!DOCTYPE html>"));
    }
}
