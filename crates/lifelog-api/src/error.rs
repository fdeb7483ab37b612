use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// API-facing error. Everything not explicitly classified collapses to a
/// generic 500 so internals never leak.
#[derive(Debug)]
pub enum ApiError {
    Validation(String),
    NotFound(String),
    Conflict(String),
    Auth(String),
    RateLimited { retry_after_secs: u64 },
    Unavailable(String),
    Internal(String),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Auth(_) => StatusCode::UNAUTHORIZED,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn public_message(&self) -> String {
        match self {
            ApiError::Validation(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg)
            | ApiError::Auth(msg)
            | ApiError::Unavailable(msg) => msg.clone(),
            ApiError::RateLimited { .. } => "rate limit exceeded".to_string(),
            // Internal details go to the log, not the wire
            ApiError::Internal(_) => "internal server error".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(detail) = &self {
            tracing::error!("internal error: {}", detail);
        }
        let status = self.status_code();
        let body = Json(json!({
            "error": status.canonical_reason().unwrap_or("error"),
            "message": self.public_message(),
            "status_code": status.as_u16(),
        }));
        let mut response = (status, body).into_response();
        if let ApiError::RateLimited { retry_after_secs } = self {
            if let Ok(value) = retry_after_secs.to_string().parse() {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

impl From<lifelog_store::Error> for ApiError {
    fn from(err: lifelog_store::Error) -> Self {
        if err.is_unique_violation() {
            ApiError::Conflict("resource already exists".to_string())
        } else {
            ApiError::Internal(err.to_string())
        }
    }
}

impl From<lifelog_runtime::Error> for ApiError {
    fn from(err: lifelog_runtime::Error) -> Self {
        match err {
            lifelog_runtime::Error::NotFound(msg) => ApiError::NotFound(msg),
            lifelog_runtime::Error::NotConfigured(msg) => ApiError::Unavailable(msg),
            lifelog_runtime::Error::InvalidOperation(msg) => ApiError::Validation(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<lifelog_engine::Error> for ApiError {
    fn from(err: lifelog_engine::Error) -> Self {
        ApiError::Internal(err.to_string())
    }
}
