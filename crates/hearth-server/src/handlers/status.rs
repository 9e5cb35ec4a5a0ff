//! Health and status handlers

use std::sync::Arc;

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{AppError, AppState};
use hearth_core::EventStats;

/// Engine status for the host
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub events: EventStats,
    pub active_insights: i64,
    pub last_scan: Option<DateTime<Utc>>,
    pub scan_interval_minutes: u64,
    pub lookback_days: i64,
}

/// GET /api/health - Liveness probe
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// GET /api/status - Event-store stats, last scan time, key config values
pub async fn get_status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StatusResponse>, AppError> {
    let db = state.scanner.db();
    let config = state.scanner.config();

    Ok(Json(StatusResponse {
        events: db.event_stats()?,
        active_insights: db.count_active_insights()?,
        last_scan: db.last_scan()?,
        scan_interval_minutes: config.scan_interval_minutes,
        lookback_days: config.lookback_days,
    }))
}
