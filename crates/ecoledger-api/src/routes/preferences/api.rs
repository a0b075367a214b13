//! Preference API endpoints - JSON API and HTMX partial responses

use crate::{i18n, parse_form, ApiResult, AppState};
use axum::extract::{Query, State};
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use ecoledger_utils::escape_html;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Serialize)]
pub struct PreferencesResponse {
    pub accent_color: String,
    pub default_accent: String,
}

#[derive(Debug, Deserialize)]
pub struct AccentRequest {
    pub color: String,
}

async fn preferences_response(state: &AppState) -> PreferencesResponse {
    let mut preferences = state.preferences.lock().await;
    preferences.sync();
    PreferencesResponse {
        accent_color: preferences.accent().to_string(),
        default_accent: preferences.default_accent().to_string(),
    }
}

/// Current preferences (JSON API)
pub async fn api_preferences(state: State<AppState>) -> Json<PreferencesResponse> {
    Json(preferences_response(&state).await)
}

/// Set the accent color (JSON API)
pub async fn api_set_accent(
    state: State<AppState>,
    Json(request): Json<AccentRequest>,
) -> ApiResult<Json<PreferencesResponse>> {
    state.preferences.lock().await.set_accent(&request.color)?;
    log::info!("Accent color set to {}", request.color.trim());
    Ok(Json(preferences_response(&state).await))
}

/// HTMX: Theme form submit
pub async fn htmx_accent_store(
    state: State<AppState>,
    params: Query<HashMap<String, String>>,
    body: String,
) -> Response {
    let t = i18n::translations(state.language(&params));
    let form = parse_form(&body);
    let color = form.get("color").map(String::as_str).unwrap_or_default();

    let result = state.preferences.lock().await.set_accent(color);
    match result {
        // Full refresh so every accent-colored element picks up the new value
        Ok(()) => (
            [("HX-Refresh", "true")],
            Html(format!("<p class='text-emerald-600'>{} {}</p>", t.theme, escape_html(color.trim()))),
        )
            .into_response(),
        Err(e) => Html(format!("<p class='text-red-600'>{}</p>", escape_html(&e.to_string()))).into_response(),
    }
}
