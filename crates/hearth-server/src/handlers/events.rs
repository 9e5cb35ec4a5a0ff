//! Event ingestion and entity snapshot handlers

use std::sync::Arc;

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{AppError, AppState};
use hearth_core::{EntityMeta, IngestOutcome, StateEvent};

/// One state-change notification from the host's event feed
#[derive(Debug, Deserialize)]
pub struct EventPayload {
    pub entity_id: String,
    pub old_value: String,
    pub new_value: String,
    /// Defaults to arrival time when the host omits it
    pub timestamp: Option<DateTime<Utc>>,
}

/// Ingest outcome counts for one batch
#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub recorded: usize,
    pub filtered: usize,
    pub dropped: usize,
}

/// POST /api/events - Ingest a batch of state-change events
///
/// Each element is decoded independently so one malformed event (bad
/// timestamp, missing field, unqualified entity id) is dropped and counted,
/// never fatal to the batch.
pub async fn ingest_events(
    State(state): State<Arc<AppState>>,
    Json(batch): Json<Vec<serde_json::Value>>,
) -> Result<Json<IngestResponse>, AppError> {
    let mut response = IngestResponse {
        recorded: 0,
        filtered: 0,
        dropped: 0,
    };

    let now = Utc::now();
    for raw in batch {
        let payload: EventPayload = match serde_json::from_value(raw) {
            Ok(payload) => payload,
            Err(e) => {
                debug!(error = %e, "Dropping undecodable event");
                response.dropped += 1;
                continue;
            }
        };
        let event = match StateEvent::from_wire(
            &payload.entity_id,
            &payload.old_value,
            &payload.new_value,
            payload.timestamp.unwrap_or(now),
        ) {
            Ok(event) => event,
            Err(e) => {
                debug!(error = %e, "Dropping malformed event");
                response.dropped += 1;
                continue;
            }
        };

        match state
            .scanner
            .db()
            .record_event(&event, state.scanner.config())?
        {
            IngestOutcome::Recorded => response.recorded += 1,
            IngestOutcome::Filtered => response.filtered += 1,
        }
    }

    Ok(Json(response))
}

/// One entity description from the host's state snapshot
#[derive(Debug, Deserialize)]
pub struct EntityPayload {
    pub entity_id: String,
    pub device_class: Option<String>,
    pub friendly_name: Option<String>,
}

/// Entity snapshot outcome counts
#[derive(Debug, Serialize)]
pub struct EntitiesResponse {
    pub updated: usize,
    pub dropped: usize,
}

/// PUT /api/entities - Upsert entity snapshot metadata for classification
pub async fn upsert_entities(
    State(state): State<Arc<AppState>>,
    Json(batch): Json<Vec<EntityPayload>>,
) -> Result<Json<EntitiesResponse>, AppError> {
    let mut response = EntitiesResponse {
        updated: 0,
        dropped: 0,
    };

    let now = Utc::now();
    for payload in batch {
        let Some(mut meta) = EntityMeta::from_entity_id(&payload.entity_id, now) else {
            debug!(entity = %payload.entity_id, "Dropping malformed entity id");
            response.dropped += 1;
            continue;
        };
        meta.device_class = payload.device_class;
        meta.friendly_name = payload.friendly_name;

        state.scanner.db().upsert_entity(&meta)?;
        response.updated += 1;
    }

    Ok(Json(response))
}
