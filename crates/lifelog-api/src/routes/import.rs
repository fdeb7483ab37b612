use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use chrono::{Duration, Utc};
use lifelog_runtime::{insights, CalendarIngestService, NoteIngestService};
use serde_json::{json, Value};

use crate::auth::{self, EndpointClass};
use crate::error::ApiError;
use crate::models::ImportRequest;
use crate::state::AppState;

pub async fn calendar(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<ImportRequest>,
) -> Result<Json<Value>, ApiError> {
    auth::guard(&state, &headers, EndpointClass::Import)?;
    request.validate()?;

    let source = state
        .context
        .calendar
        .as_ref()
        .ok_or_else(|| ApiError::Unavailable("calendar provider not configured".to_string()))?;

    let end = Utc::now().date_naive();
    let days_back = (request.hours_since_last_update + 23) / 24;
    let start = end - Duration::days(days_back);

    let service = CalendarIngestService::new(&state.context.store, source.as_ref());
    let outcome = service
        .ingest_window(
            &start.format("%Y-%m-%d").to_string(),
            &end.format("%Y-%m-%d").to_string(),
            &[],
            |_| {},
        )
        .await?;

    Ok(Json(json!({
        "status": "success",
        "inserted": outcome.inserted,
        "updated": outcome.updated,
        "skipped": outcome.skipped,
        "calendars_failed": outcome.calendars_failed,
    })))
}

pub async fn notion(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<ImportRequest>,
) -> Result<Json<Value>, ApiError> {
    auth::guard(&state, &headers, EndpointClass::Import)?;
    request.validate()?;

    let source = state
        .context
        .notes
        .as_ref()
        .ok_or_else(|| ApiError::Unavailable("notes provider not configured".to_string()))?;

    let service = NoteIngestService::new(&state.context.store, source.as_ref());
    let outcome = service.ingest(None, None, |_| {}).await?;

    Ok(Json(json!({
        "status": "success",
        "pages_processed": outcome.pages_processed,
        "pages_failed": outcome.pages_failed,
        "blocks_processed": outcome.blocks_processed,
    })))
}

pub async fn status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<insights::ImportStatus>, ApiError> {
    auth::guard(&state, &headers, EndpointClass::Default)?;
    Ok(Json(insights::import_status(&state.context.store)?))
}
