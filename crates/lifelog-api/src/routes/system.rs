use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use lifelog_runtime::insights;
use serde_json::{json, Value};

use crate::auth::{self, EndpointClass};
use crate::error::ApiError;
use crate::state::AppState;

/// Aggregate health: the store must answer; providers report whether they
/// are configured at all. The API stays up degraded when they are not.
pub async fn health(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    auth::guard(&state, &headers, EndpointClass::Default)?;

    let store_healthy = state.context.store.ping().is_ok();
    let status = if store_healthy { "healthy" } else { "degraded" };
    Ok(Json(json!({
        "status": status,
        "database": { "reachable": store_healthy },
        "providers": {
            "calendar": { "configured": state.context.calendar.is_some() },
            "notes": { "configured": state.context.notes.is_some() },
        },
    })))
}

pub async fn stats(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<insights::SystemStats>, ApiError> {
    auth::guard(&state, &headers, EndpointClass::Default)?;
    Ok(Json(insights::system_stats(&state.context.store)?))
}
