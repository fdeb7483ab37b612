use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use lifelog_store::queries::tags;
use lifelog_store::{NewTag, TagSort};
use lifelog_types::Tag;

use crate::auth::{self, EndpointClass};
use crate::error::ApiError;
use crate::models::{
    paginated, validate_pagination, validate_tag_fields, CreateTagRequest, Paginated, TagsQuery,
    UpdateTagRequest,
};
use crate::state::AppState;

pub async fn list(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<TagsQuery>,
) -> Result<Json<Paginated<Tag>>, ApiError> {
    auth::guard(&state, &headers, EndpointClass::Default)?;
    let (limit, offset) = validate_pagination(query.limit, query.offset)?;
    let sort = match query.sort_by.as_deref() {
        None => TagSort::default(),
        Some(raw) => TagSort::parse(raw).ok_or_else(|| {
            ApiError::Validation("sort_by must be one of: name, usage_count, created_at".to_string())
        })?,
    };

    let conn = state.context.store.conn()?;
    let (items, total_count) = tags::list(&conn, sort, limit, offset)?;
    Ok(Json(paginated(items, total_count, limit, offset)))
}

pub async fn get_by_id(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<Tag>, ApiError> {
    auth::guard(&state, &headers, EndpointClass::Default)?;
    let conn = state.context.store.conn()?;
    let tag = tags::get_by_id(&conn, id)?
        .ok_or_else(|| ApiError::NotFound(format!("tag {} not found", id)))?;
    Ok(Json(tag))
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<CreateTagRequest>,
) -> Result<(StatusCode, Json<Tag>), ApiError> {
    auth::guard(&state, &headers, EndpointClass::Default)?;
    let fields = validate_tag_fields(&request.name, request.description, request.color)?;

    let conn = state.context.store.conn()?;
    let id = tags::create(
        &conn,
        &NewTag {
            name: fields.name,
            description: fields.description,
            color: fields.color,
        },
    )?;
    let tag = tags::get_by_id(&conn, id)?
        .ok_or_else(|| ApiError::Internal("created tag vanished".to_string()))?;
    Ok((StatusCode::CREATED, Json(tag)))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(request): Json<UpdateTagRequest>,
) -> Result<Json<Tag>, ApiError> {
    auth::guard(&state, &headers, EndpointClass::Default)?;

    let conn = state.context.store.conn()?;
    let existing = tags::get_by_id(&conn, id)?
        .ok_or_else(|| ApiError::NotFound(format!("tag {} not found", id)))?;

    let fields = validate_tag_fields(
        request.name.as_deref().unwrap_or(&existing.name),
        request.description.or(existing.description),
        request.color.or(existing.color),
    )?;
    tags::update(
        &conn,
        id,
        &fields.name,
        fields.description.as_deref(),
        fields.color.as_deref(),
    )?;

    let tag = tags::get_by_id(&conn, id)?
        .ok_or_else(|| ApiError::Internal("updated tag vanished".to_string()))?;
    Ok(Json(tag))
}

pub async fn delete(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    auth::guard(&state, &headers, EndpointClass::Default)?;
    let conn = state.context.store.conn()?;
    let deleted = tags::delete(&conn, id)?;
    if deleted == 0 {
        return Err(ApiError::NotFound(format!("tag {} not found", id)));
    }
    Ok(StatusCode::NO_CONTENT)
}
