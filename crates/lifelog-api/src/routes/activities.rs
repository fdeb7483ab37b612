use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use lifelog_store::queries::{activities, processed};
use lifelog_store::{ActivityFilter, ProcessedFilter};
use lifelog_types::{ActivitySource, RawActivity};

use crate::auth::{self, EndpointClass};
use crate::error::ApiError;
use crate::models::{
    paginated, validate_date_param, validate_pagination, Paginated, ProcessedActivitiesQuery,
    ProcessedActivityResponse, RawActivitiesQuery, TagWithConfidence,
};
use crate::state::AppState;

pub async fn raw(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<RawActivitiesQuery>,
) -> Result<Json<Paginated<RawActivity>>, ApiError> {
    auth::guard(&state, &headers, EndpointClass::Default)?;
    validate_date_param("date_start", query.date_start.as_deref())?;
    validate_date_param("date_end", query.date_end.as_deref())?;
    let (limit, offset) = validate_pagination(query.limit, query.offset)?;

    let source = match query.source.as_deref() {
        Some(raw) => Some(ActivitySource::parse(raw).ok_or_else(|| {
            ApiError::Validation("source must be one of: calendar, notes".to_string())
        })?),
        None => None,
    };

    let conn = state.context.store.conn()?;
    let (items, total_count) = activities::list(
        &conn,
        &ActivityFilter {
            source,
            date_start: query.date_start,
            date_end: query.date_end,
            limit,
            offset,
        },
    )?;
    Ok(Json(paginated(items, total_count, limit, offset)))
}

pub async fn processed(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ProcessedActivitiesQuery>,
) -> Result<Json<Paginated<ProcessedActivityResponse>>, ApiError> {
    auth::guard(&state, &headers, EndpointClass::Default)?;
    validate_date_param("date_start", query.date_start.as_deref())?;
    validate_date_param("date_end", query.date_end.as_deref())?;
    let (limit, offset) = validate_pagination(query.limit, query.offset)?;

    let tags: Vec<String> = query
        .tags
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect();

    let conn = state.context.store.conn()?;
    let (activities, total_count) = processed::list(
        &conn,
        &ProcessedFilter {
            date_start: query.date_start,
            date_end: query.date_end,
            tags,
            limit,
            offset,
        },
    )?;

    let mut items = Vec::with_capacity(activities.len());
    for activity in activities {
        let tags = processed::tags_for(&conn, activity.id)?
            .into_iter()
            .map(|(tag, confidence)| TagWithConfidence { tag, confidence })
            .collect();
        items.push(ProcessedActivityResponse { activity, tags });
    }
    Ok(Json(paginated(items, total_count, limit, offset)))
}
