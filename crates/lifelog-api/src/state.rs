use lifelog_runtime::ServiceContext;

use crate::auth::RateLimiter;

/// Shared application state behind every handler
pub struct AppState {
    pub context: ServiceContext,
    pub rate_limiter: RateLimiter,
}

impl AppState {
    pub fn new(context: ServiceContext) -> Self {
        Self {
            context,
            rate_limiter: RateLimiter::new(),
        }
    }
}
