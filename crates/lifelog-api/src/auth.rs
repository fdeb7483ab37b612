//! Bearer auth and per-key token-bucket rate limiting

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use axum::http::header;
use axum::http::HeaderMap;

use crate::error::ApiError;
use crate::state::AppState;

/// Endpoint classes with separate budgets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointClass {
    Default,
    Processing,
    Import,
}

impl EndpointClass {
    /// (capacity, window) per class
    fn budget(&self) -> (u32, Duration) {
        match self {
            EndpointClass::Default => (100, Duration::from_secs(60)),
            EndpointClass::Processing => (5, Duration::from_secs(60)),
            EndpointClass::Import => (2, Duration::from_secs(60)),
        }
    }
}

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Token buckets keyed by (api key, endpoint class)
pub struct RateLimiter {
    buckets: Mutex<HashMap<(String, EndpointClass), Bucket>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
        }
    }

    pub fn check(&self, api_key: &str, class: EndpointClass) -> Result<(), ApiError> {
        let (capacity, window) = class.budget();
        let refill_per_sec = capacity as f64 / window.as_secs_f64();

        let mut buckets = self.buckets.lock().unwrap();
        let bucket = buckets
            .entry((api_key.to_string(), class))
            .or_insert_with(|| Bucket {
                tokens: capacity as f64,
                last_refill: Instant::now(),
            });

        let elapsed = bucket.last_refill.elapsed().as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * refill_per_sec).min(capacity as f64);
        bucket.last_refill = Instant::now();

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            Ok(())
        } else {
            Err(ApiError::RateLimited {
                retry_after_secs: window.as_secs(),
            })
        }
    }
}

/// Validate the bearer token and spend one rate-limit token.
/// Development environment with no configured keys bypasses auth but
/// still rate-limits under a shared anonymous key.
pub fn guard(
    state: &AppState,
    headers: &HeaderMap,
    class: EndpointClass,
) -> Result<String, ApiError> {
    let token = bearer_token(headers);
    let config = &state.context.config;

    let key = match token {
        Some(token) if config.api_keys.iter().any(|k| k == token) => token.to_string(),
        Some(_) => return Err(ApiError::Auth("invalid API key".to_string())),
        None => {
            if config.api_keys.is_empty() && config.environment.allows_auth_bypass() {
                "anonymous".to_string()
            } else {
                return Err(ApiError::Auth("missing bearer token".to_string()));
            }
        }
    };

    state.rate_limiter.check(&key, class)?;
    Ok(key)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}
