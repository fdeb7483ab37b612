use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use lifelog_runtime::{insights, GroupBy};

use crate::auth::{self, EndpointClass};
use crate::error::ApiError;
use crate::models::{validate_date_param, InsightsQuery, TimeDistributionQuery};
use crate::state::AppState;

pub async fn overview(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<InsightsQuery>,
) -> Result<Json<insights::OverviewInsights>, ApiError> {
    auth::guard(&state, &headers, EndpointClass::Default)?;
    validate_date_param("date_start", query.date_start.as_deref())?;
    validate_date_param("date_end", query.date_end.as_deref())?;

    let result = insights::overview(
        &state.context.store,
        query.date_start.as_deref(),
        query.date_end.as_deref(),
    )?;
    Ok(Json(result))
}

pub async fn time_distribution(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<TimeDistributionQuery>,
) -> Result<Json<insights::TimeDistribution>, ApiError> {
    auth::guard(&state, &headers, EndpointClass::Default)?;
    validate_date_param("date_start", query.date_start.as_deref())?;
    validate_date_param("date_end", query.date_end.as_deref())?;
    let group_by = match query.group_by.as_deref() {
        None => GroupBy::Day,
        Some(raw) => GroupBy::parse(raw).ok_or_else(|| {
            ApiError::Validation("group_by must be one of: day, week, month".to_string())
        })?,
    };

    let result = insights::time_distribution(
        &state.context.store,
        query.date_start.as_deref(),
        query.date_end.as_deref(),
        group_by,
    )?;
    Ok(Json(result))
}
