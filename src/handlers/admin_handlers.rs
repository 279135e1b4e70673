use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::handlers::auth_middleware::AuthUser;
use crate::models::lead_models::Lead;
use crate::utils::lead_stats::{self, LeadStats};
use crate::AppState;

#[derive(Deserialize, Default, Debug)]
pub struct LeadQuery {
    pub search: Option<String>,
    pub status: Option<String>,
}

fn fetch_leads(state: &AppState) -> Result<Vec<Lead>, (StatusCode, Json<serde_json::Value>)> {
    state.lead_repository.get_all_leads().map_err(|e| {
        tracing::error!("Database error while fetching leads: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "Database error"})),
        )
    })
}

pub async fn get_leads(
    State(state): State<Arc<AppState>>,
    _auth_user: AuthUser,
    Query(query): Query<LeadQuery>,
) -> Result<Json<Vec<Lead>>, (StatusCode, Json<serde_json::Value>)> {
    let leads = fetch_leads(&state)?;
    let filtered = lead_stats::filter_leads(
        &leads,
        query.search.as_deref(),
        query.status.as_deref(),
    );
    Ok(Json(filtered))
}

pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    _auth_user: AuthUser,
) -> Result<Json<LeadStats>, (StatusCode, Json<serde_json::Value>)> {
    let leads = fetch_leads(&state)?;
    let now = Utc::now().with_timezone(&state.dashboard_tz);
    Ok(Json(lead_stats::compute_stats(&leads, now)))
}

/// Streams the filtered lead list as a dated CSV attachment.
pub async fn export_leads(
    State(state): State<Arc<AppState>>,
    _auth_user: AuthUser,
    Query(query): Query<LeadQuery>,
) -> Result<impl IntoResponse, (StatusCode, Json<serde_json::Value>)> {
    let leads = fetch_leads(&state)?;
    let filtered = lead_stats::filter_leads(
        &leads,
        query.search.as_deref(),
        query.status.as_deref(),
    );
    let csv = lead_stats::export_csv(&filtered, state.dashboard_tz);
    let today = Utc::now()
        .with_timezone(&state.dashboard_tz)
        .format("%Y-%m-%d");
    let headers = [
        (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"club-shoc-leads-{}.csv\"", today),
        ),
    ];
    Ok((headers, csv))
}
