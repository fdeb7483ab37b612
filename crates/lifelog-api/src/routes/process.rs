use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use lifelog_engine::{CleanupOptions, CleanupSummary, TagCleaner};
use lifelog_runtime::ProcessingOptions;
use lifelog_types::JobSnapshot;
use serde_json::{json, Value};

use crate::auth::{self, EndpointClass};
use crate::error::ApiError;
use crate::models::{validate_date_param, CleanupRequest, HistoryQuery, ProcessRequest};
use crate::state::AppState;

/// Kick off a processing job on a worker task; the job id is the handle
/// for everything that follows.
pub async fn daily(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<ProcessRequest>,
) -> Result<Json<Value>, ApiError> {
    auth::guard(&state, &headers, EndpointClass::Processing)?;
    validate_date_param("date_start", request.date_start.as_deref())?;
    validate_date_param("date_end", request.date_end.as_deref())?;
    if !request.use_database {
        return Err(ApiError::Validation(
            "file-based processing is not supported; use_database must be true".to_string(),
        ));
    }

    let snapshot = state.context.processor().spawn(ProcessingOptions {
        date_start: request.date_start,
        date_end: request.date_end,
        regenerate_taxonomy: request.regenerate_system_tags,
        enable_matching: request.enable_matching,
    });

    Ok(Json(json!({
        "status": snapshot.status.as_str(),
        "job_id": snapshot.job_id,
        "processed_counts": Value::Null,
        "tag_analysis": Value::Null,
    })))
}

/// Two-phase tag cleanup; runs inline and returns the full summary
pub async fn cleanup(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<CleanupRequest>,
) -> Result<Json<CleanupSummary>, ApiError> {
    auth::guard(&state, &headers, EndpointClass::Processing)?;
    validate_date_param("date_start", request.date_start.as_deref())?;
    validate_date_param("date_end", request.date_end.as_deref())?;
    for (name, value) in [
        ("removal_threshold", request.removal_threshold),
        ("merge_threshold", request.merge_threshold),
    ] {
        if !(0.0..=1.0).contains(&value) {
            return Err(ApiError::Validation(format!(
                "{} must be between 0.0 and 1.0",
                name
            )));
        }
    }

    let cleaner = TagCleaner::new(state.context.chat.as_ref());
    let summary = cleaner
        .clean(
            &state.context.store,
            &CleanupOptions {
                dry_run: request.dry_run,
                removal_threshold: request.removal_threshold,
                merge_threshold: request.merge_threshold,
                date_start: request.date_start,
                date_end: request.date_end,
            },
        )
        .await?;
    Ok(Json(summary))
}

pub async fn status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(job_id): Path<String>,
) -> Result<Json<JobSnapshot>, ApiError> {
    auth::guard(&state, &headers, EndpointClass::Default)?;
    state
        .context
        .jobs
        .snapshot(&job_id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("job {} not found", job_id)))
}

pub async fn history(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<JobSnapshot>>, ApiError> {
    auth::guard(&state, &headers, EndpointClass::Default)?;
    let limit = query.limit.unwrap_or(10).min(50);
    Ok(Json(state.context.jobs.recent(limit)))
}
