//! HTTP surface tests driven through the router with fake collaborators

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use lifelog_api::{build_app, AppState};
use lifelog_runtime::{Config, Environment, ServiceContext};
use lifelog_testing::fixtures::{calendar_event_json, memory_store, seed_processed_activity};
use lifelog_testing::{FakeCalendarSource, FakeChatModel, FakeEmbedder};
use serde_json::{json, Value};
use tower::ServiceExt;

struct TestApp {
    router: Router,
    state: Arc<AppState>,
    _resources: tempfile::TempDir,
}

fn test_app(config: Config) -> TestApp {
    let resources = tempfile::tempdir().unwrap();
    let store = memory_store();
    let context = ServiceContext::with_collaborators(
        config,
        store,
        Arc::new(FakeChatModel::failing("offline")),
        Arc::new(FakeEmbedder::failing()),
        Some(Arc::new(FakeCalendarSource::with_events(vec![
            calendar_event_json("a", "2025-08-01T09:00:00Z", "2025-08-01T10:00:00Z", "Standup"),
        ]))),
        None,
        resources.path().to_path_buf(),
    );
    let state = Arc::new(AppState::new(context));
    TestApp {
        router: build_app(state.clone()),
        state,
        _resources: resources,
    }
}

fn default_app() -> TestApp {
    test_app(Config::default())
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(path: &str) -> Request<Body> {
    Request::builder().uri(path).body(Body::empty()).unwrap()
}

fn post(path: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn health_reports_store_and_providers() {
    let app = default_app();
    let (status, body) = send(&app.router, get("/api/v1/system/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["providers"]["calendar"]["configured"], true);
    assert_eq!(body["providers"]["notes"]["configured"], false);
}

#[tokio::test]
async fn pagination_envelope_reports_has_more() {
    let app = default_app();
    seed_processed_activity(&app.state.context.store, "2025-08-01", 30, "one", &["work"]);
    seed_processed_activity(&app.state.context.store, "2025-08-02", 30, "two", &["meeting"]);

    let (status, body) = send(&app.router, get("/api/v1/tags?limit=1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"].as_array().unwrap().len(), 1);
    assert_eq!(body["total_count"], 2);
    assert_eq!(body["page_info"]["has_more"], true);

    let (_, body) = send(&app.router, get("/api/v1/tags?limit=1&offset=1")).await;
    assert_eq!(body["page_info"]["has_more"], false);
}

#[tokio::test]
async fn processed_listing_embeds_tags_with_confidence() {
    let app = default_app();
    seed_processed_activity(&app.state.context.store, "2025-08-01", 45, "standup", &["work"]);

    let (status, body) = send(&app.router, get("/api/v1/activities/processed")).await;
    assert_eq!(status, StatusCode::OK);
    let item = &body["items"][0];
    assert_eq!(item["combined_details"], "standup");
    assert_eq!(item["tags"][0]["name"], "work");
    assert_eq!(item["tags"][0]["confidence"], 0.8);
}

#[tokio::test]
async fn invalid_parameters_return_422() {
    let app = default_app();

    let (status, _) = send(&app.router, get("/api/v1/activities/raw?date_start=08-01-2025")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = send(&app.router, get("/api/v1/activities/raw?source=email")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = send(&app.router, get("/api/v1/activities/raw?limit=5000")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = send(&app.router, get("/api/v1/tags?sort_by=color")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = send(
        &app.router,
        get("/api/v1/insights/time-distribution?group_by=year"),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn inverted_date_window_is_empty_not_an_error() {
    let app = default_app();
    seed_processed_activity(&app.state.context.store, "2025-08-01", 30, "x", &["work"]);
    let (status, body) = send(
        &app.router,
        get("/api/v1/activities/processed?date_start=2025-09-01&date_end=2025-08-01"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_count"], 0);
}

#[tokio::test]
async fn tag_crud_round_trip() {
    let app = default_app();

    // Create normalizes the name to lowercase
    let (status, created) = send(
        &app.router,
        post("/api/v1/tags", json!({"name": "Deep Work", "color": "#a1B2c3"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["name"], "deep work");
    let id = created["id"].as_i64().unwrap();

    // Names differing only in case cannot coexist
    let (status, _) = send(&app.router, post("/api/v1/tags", json!({"name": "DEEP WORK"}))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Bad color is a validation error
    let (status, _) = send(
        &app.router,
        post("/api/v1/tags", json!({"name": "other", "color": "red"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, fetched) = send(&app.router, get(&format!("/api/v1/tags/{}", id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["id"], id);

    let update = Request::builder()
        .method("PUT")
        .uri(format!("/api/v1/tags/{}", id))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({"description": "focused time"}).to_string()))
        .unwrap();
    let (status, updated) = send(&app.router, update).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["description"], "focused time");

    let delete = Request::builder()
        .method("DELETE")
        .uri(format!("/api/v1/tags/{}", id))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app.router, delete).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app.router, get(&format!("/api/v1/tags/{}", id))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_tag_is_404() {
    let app = default_app();
    let (status, body) = send(&app.router, get("/api/v1/tags/9999")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status_code"], 404);
}

#[tokio::test]
async fn process_daily_returns_a_pollable_job() {
    let app = default_app();
    let (status, body) = send(&app.router, post("/api/v1/process/daily", json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    let job_id = body["job_id"].as_str().unwrap().to_string();
    assert_eq!(body["status"], "running");

    // The worker runs on its own task; poll until it settles
    let mut final_status = String::new();
    for _ in 0..50 {
        let (status, snapshot) =
            send(&app.router, get(&format!("/api/v1/process/status/{}", job_id))).await;
        assert_eq!(status, StatusCode::OK);
        final_status = snapshot["status"].as_str().unwrap().to_string();
        if final_status != "running" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(final_status, "completed");

    let (status, history) = send(&app.router, get("/api/v1/process/history?limit=5")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history.as_array().unwrap().len(), 1);

    let (status, _) = send(&app.router, get("/api/v1/process/status/not-a-job")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cleanup_endpoint_returns_a_summary() {
    let app = default_app();
    seed_processed_activity(
        &app.state.context.store,
        "2025-08-01",
        30,
        "planning",
        &["scheduled_activity"],
    );

    let (status, body) = send(
        &app.router,
        post("/api/v1/process/cleanup", json!({"dry_run": true})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["dry_run"], true);
    assert!(body["marked_for_removal"].as_u64().unwrap() >= 1);
}

#[tokio::test]
async fn import_calendar_ingests_and_rate_limits() {
    let app = default_app();

    let (status, body) = send(
        &app.router,
        post("/api/v1/import/calendar", json!({"hours_since_last_update": 24})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");

    let (status, _) = send(
        &app.router,
        post("/api/v1/import/calendar", json!({"hours_since_last_update": 0})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    // The import class allows two calls per window; the third 429s with
    // Retry-After
    let response = app
        .router
        .clone()
        .oneshot(post(
            "/api/v1/import/calendar",
            json!({"hours_since_last_update": 24}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key(header::RETRY_AFTER));
}

#[tokio::test]
async fn import_notion_without_provider_is_unavailable() {
    let app = default_app();
    let (status, _) = send(
        &app.router,
        post("/api/v1/import/notion", json!({"hours_since_last_update": 24})),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn production_requires_a_bearer_token() {
    let mut config = Config::default();
    config.environment = Environment::Production;
    config.api_keys = vec!["secret-token".to_string()];
    let app = test_app(config);

    let (status, _) = send(&app.router, get("/api/v1/tags")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let authed = Request::builder()
        .uri("/api/v1/tags")
        .header(header::AUTHORIZATION, "Bearer wrong")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app.router, authed).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let authed = Request::builder()
        .uri("/api/v1/tags")
        .header(header::AUTHORIZATION, "Bearer secret-token")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app.router, authed).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn insights_overview_aggregates_time_by_tag() {
    let app = default_app();
    seed_processed_activity(&app.state.context.store, "2025-08-01", 60, "a", &["work"]);
    seed_processed_activity(&app.state.context.store, "2025-08-01", 30, "b", &["work", "meeting"]);

    let (status, body) = send(&app.router, get("/api/v1/insights/overview")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_tracked_hours"], 1.5);
    assert_eq!(body["activity_count"], 2);
    assert_eq!(body["tag_time_distribution"]["work"], 90);
    assert_eq!(body["top_5_activities"][0]["tag"], "work");

    let (status, body) = send(
        &app.router,
        get("/api/v1/insights/time-distribution?group_by=day"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["time_series"][0]["total_minutes"], 90);
    assert_eq!(body["summary"]["most_productive_day"], "2025-08-01");
}
