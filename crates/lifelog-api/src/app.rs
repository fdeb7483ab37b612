use std::sync::Arc;

use axum::http::{HeaderValue, Method};
use axum::Router;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::routes;
use crate::state::AppState;

/// Assemble the full application router with the configured version
/// prefix, CORS policy, and request tracing.
pub fn build_app(state: Arc<AppState>) -> Router {
    let config = &state.context.config;
    let prefix = config.api_v1_prefix.clone();

    let cors = cors_layer(&config.cors);

    Router::new()
        .nest(&prefix, routes::api_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(config: &lifelog_runtime::CorsConfig) -> CorsLayer {
    let wildcard = config.origins.iter().any(|o| o == "*");
    let origins = if wildcard {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(
            config
                .origins
                .iter()
                .filter_map(|o| o.parse::<HeaderValue>().ok()),
        )
    };
    let methods: Vec<Method> = config
        .methods
        .iter()
        .filter_map(|m| m.parse().ok())
        .collect();
    let headers = if config.headers.iter().any(|h| h == "*") {
        AllowHeaders::any()
    } else {
        AllowHeaders::list(
            config
                .headers
                .iter()
                .filter_map(|h| h.parse().ok()),
        )
    };

    let mut layer = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(methods)
        .allow_headers(headers);
    // Credentials cannot combine with a wildcard origin
    if config.allow_credentials && !wildcard {
        layer = layer.allow_credentials(true);
    }
    layer
}
