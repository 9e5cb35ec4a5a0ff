//! Insight retrieval and lifecycle handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use crate::{AppError, AppState, SuccessResponse};
use hearth_core::{
    Error, Insight, InsightKind, InsightStatus, InsightSummary, ScanReport,
};

/// Query parameters for listing insights
#[derive(Debug, Deserialize)]
pub struct InsightQuery {
    /// Filter by status (active, dismissed, implemented)
    pub status: Option<String>,
    /// Filter by insight kind
    pub kind: Option<String>,
}

/// GET /api/insights - List insights, highest confidence first
pub async fn list_insights(
    State(state): State<Arc<AppState>>,
    Query(params): Query<InsightQuery>,
) -> Result<Json<Vec<Insight>>, AppError> {
    let status = match params.status.as_deref() {
        Some(raw) => Some(
            raw.parse::<InsightStatus>()
                .map_err(|e| AppError::bad_request(&e))?,
        ),
        None => None,
    };
    let kind = match params.kind.as_deref() {
        Some(raw) => Some(
            raw.parse::<InsightKind>()
                .map_err(|e| AppError::bad_request(&e))?,
        ),
        None => None,
    };

    let insights = state.scanner.db().list_insights(status, kind)?;
    Ok(Json(insights))
}

/// GET /api/insights/summary - Aggregate counts, recomputed on demand
pub async fn get_summary(
    State(state): State<Arc<AppState>>,
) -> Result<Json<InsightSummary>, AppError> {
    let summary = state.scanner.db().insight_summary()?;
    Ok(Json(summary))
}

/// GET /api/insights/:id - Fetch one insight
pub async fn get_insight(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Insight>, AppError> {
    let insight = state
        .scanner
        .db()
        .get_insight(&id)?
        .ok_or_else(|| AppError::not_found("Insight not found"))?;
    Ok(Json(insight))
}

/// POST /api/insights/generate - Run a scan now
///
/// Shares the non-overlap guard with the scheduled tick: if a scan is
/// already in flight the report comes back with `skipped_overlap`.
pub async fn generate_insights(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ScanReport>, AppError> {
    let scanner = state.scanner.clone();
    let report = tokio::task::spawn_blocking(move || scanner.run_scan())
        .await
        .map_err(anyhow::Error::from)??;
    Ok(Json(report))
}

/// POST /api/insights/:id/dismiss - Dismiss an insight
pub async fn dismiss_insight(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    match state.scanner.db().dismiss_insight(&id) {
        Ok(()) => Ok(Json(SuccessResponse { success: true })),
        Err(Error::NotFound(msg)) => Err(AppError::not_found(&msg)),
        Err(Error::Lifecycle(msg)) => Err(AppError::conflict(&msg)),
        Err(e) => Err(e.into()),
    }
}

/// POST /api/insights/:id/implement - Mark an insight implemented (terminal)
pub async fn implement_insight(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    match state.scanner.db().implement_insight(&id) {
        Ok(()) => Ok(Json(SuccessResponse { success: true })),
        Err(Error::NotFound(msg)) => Err(AppError::not_found(&msg)),
        Err(Error::Lifecycle(msg)) => Err(AppError::conflict(&msg)),
        Err(e) => Err(e.into()),
    }
}
