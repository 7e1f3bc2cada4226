//! Daily task API tests.

mod common;

use axum::http::StatusCode;
use uuid::Uuid;

use common::fixtures;
use common::TestContext;
use murajaah_backend::models::SourceType;

/// Test today is empty before any generation.
#[tokio::test]
async fn test_today_empty() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let user = Uuid::new_v4();

    let response = server
        .get("/api/daily-tasks/today")
        .add_header(
            axum::http::header::AUTHORIZATION,
            TestContext::auth_header_value(user),
        )
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["tasks"].as_array().unwrap().len(), 0);
    assert_eq!(body["pending"], 0);
    assert_eq!(body["estimated_seconds"], 0);
}

/// Test generate, list and complete a task.
#[tokio::test]
async fn test_daily_task_flow() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let user = Uuid::new_v4();
    let mut item = fixtures::fsrs_item(user, SourceType::Personal, 3);
    item.estimated_review_seconds = 60;
    let item = ctx.insert(item).await;

    let response = server
        .post("/api/daily-tasks/generate")
        .add_header(
            axum::http::header::AUTHORIZATION,
            TestContext::auth_header_value(user),
        )
        .await;
    response.assert_status_ok();
    let tasks: serde_json::Value = response.json();
    assert_eq!(tasks.as_array().unwrap().len(), 1);
    assert_eq!(tasks[0]["source"], "fsrs");
    assert_eq!(tasks[0]["state"], "pending");

    let response = server
        .get("/api/daily-tasks/today")
        .add_header(
            axum::http::header::AUTHORIZATION,
            TestContext::auth_header_value(user),
        )
        .await;
    response.assert_status_ok();
    let today: serde_json::Value = response.json();
    assert_eq!(today["pending"], 1);
    assert_eq!(today["estimated_seconds"], 60);
    assert_eq!(today["tasks"][0]["item_id"], item.id.to_string());
    assert_eq!(today["tasks"][0]["content_ref"], "surah:78:1-16");

    let response = server
        .post(&format!("/api/daily-tasks/{}/done", item.id))
        .add_header(
            axum::http::header::AUTHORIZATION,
            TestContext::auth_header_value(user),
        )
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["state"], "done");

    let response = server
        .post(&format!("/api/daily-tasks/{}/done", item.id))
        .add_header(
            axum::http::header::AUTHORIZATION,
            TestContext::auth_header_value(user),
        )
        .await;
    response.assert_status(StatusCode::CONFLICT);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"], "conflict");
}

/// Test generation honours the limit query parameter.
#[tokio::test]
async fn test_generate_with_limit() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let user = Uuid::new_v4();
    for fsrs_days in 1..=4 {
        ctx.insert(fixtures::fsrs_item(user, SourceType::Personal, fsrs_days))
            .await;
    }

    let response = server
        .post("/api/daily-tasks/generate?limit=3")
        .add_header(
            axum::http::header::AUTHORIZATION,
            TestContext::auth_header_value(user),
        )
        .await;
    response.assert_status_ok();
    let tasks: serde_json::Value = response.json();
    assert_eq!(tasks.as_array().unwrap().len(), 3);
}

/// Test skipping a task that is not in today's snapshot.
#[tokio::test]
async fn test_skip_unknown_task() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let response = server
        .post(&format!("/api/daily-tasks/{}/skipped", Uuid::new_v4()))
        .add_header(
            axum::http::header::AUTHORIZATION,
            TestContext::auth_header_value(Uuid::new_v4()),
        )
        .await;
    response.assert_status(StatusCode::CONFLICT);
}
