//! Hearth Web Server
//!
//! Axum-based REST API forming the host boundary of the insight engine:
//! event ingestion, entity snapshots, insight retrieval, and the three
//! lifecycle operations (generate-now, dismiss, mark-implemented). Every
//! operation returns explicit success/failure; unknown insight ids fail
//! distinctly with 404.

use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Serialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

use hearth_core::InsightScanner;

mod handlers;
mod scheduler;

pub use scheduler::start_scan_scheduler;

/// Shared application state
pub struct AppState {
    /// The scan engine; holds the database handle and configuration and
    /// serializes scans across the scheduler and manual triggers.
    pub scanner: InsightScanner,
}

/// Generic success body for lifecycle operations
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Build the API router.
pub fn create_router(scanner: InsightScanner) -> Router {
    let state = Arc::new(AppState { scanner });

    let api_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/status", get(handlers::get_status))
        .route("/events", post(handlers::ingest_events))
        .route("/entities", put(handlers::upsert_entities))
        .route("/insights", get(handlers::list_insights))
        .route("/insights/summary", get(handlers::get_summary))
        .route("/insights/generate", post(handlers::generate_insights))
        .route("/insights/:id", get(handlers::get_insight))
        .route("/insights/:id/dismiss", post(handlers::dismiss_insight))
        .route("/insights/:id/implement", post(handlers::implement_insight));

    Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve the API and run the background scan scheduler.
pub async fn serve(scanner: InsightScanner, host: &str, port: u16) -> anyhow::Result<()> {
    start_scan_scheduler(scanner.clone());

    let app = create_router(scanner);
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Hearth server listening on {}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
pub struct AppError {
    status: StatusCode,
    message: String,
    internal: Option<anyhow::Error>,
}

impl AppError {
    pub fn bad_request(msg: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn not_found(msg: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn conflict(msg: &str) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            message: msg.to_string(),
            internal: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full internal error if present
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = Json(serde_json::json!({
            "error": self.message
        }));

        (self.status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        let err = err.into();
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            // Return generic message to client
            message: "An internal error occurred".to_string(),
            // Keep full error for logging
            internal: Some(err),
        }
    }
}
