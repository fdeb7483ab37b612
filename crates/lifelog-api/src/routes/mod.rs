use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

pub mod activities;
pub mod import;
pub mod insights;
pub mod process;
pub mod system;
pub mod tags;

/// All /api/v1 routes; the version prefix is nested in by the app builder
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        // Read models
        .route("/activities/raw", get(activities::raw))
        .route("/activities/processed", get(activities::processed))
        .route("/tags", get(tags::list).post(tags::create))
        .route(
            "/tags/{id}",
            get(tags::get_by_id).put(tags::update).delete(tags::delete),
        )
        .route("/insights/overview", get(insights::overview))
        .route("/insights/time-distribution", get(insights::time_distribution))
        .route("/system/health", get(system::health))
        .route("/system/stats", get(system::stats))
        // Commands
        .route("/process/daily", post(process::daily))
        .route("/process/cleanup", post(process::cleanup))
        .route("/process/status/{job_id}", get(process::status))
        .route("/process/history", get(process::history))
        .route("/import/calendar", post(import::calendar))
        .route("/import/notion", post(import::notion))
        .route("/import/status", get(import::status))
}
