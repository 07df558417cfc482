//! Integration tests for the bouquet-feedback HTTP API
//!
//! Tests cover:
//! - Health endpoint
//! - Submitting drafts in canonical and legacy layouts
//! - Validation (422) and schema (400) rejections
//! - History listing and the export gate
//! - CSV download, including the empty-history case

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use bouquet_feedback::export::parse_csv;
use bouquet_feedback::history::HistoryStore;
use bouquet_feedback::relay::NoopRelay;
use bouquet_feedback::storage::MemoryKeyValueStore;
use bouquet_feedback::{build_router, AppState, SubmissionPipeline};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::util::ServiceExt; // for `oneshot` method

/// Test helper: app over an in-memory history
async fn setup_app() -> axum::Router {
    let history = HistoryStore::open(Arc::new(MemoryKeyValueStore::new()), "clientFeedback")
        .await
        .expect("Should open history");
    let pipeline = SubmissionPipeline::new(Arc::new(history), Arc::new(NoopRelay));
    build_router(AppState::new(Arc::new(pipeline), "opinie"))
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_bytes(body: Body) -> Vec<u8> {
    axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body")
        .to_vec()
}

async fn extract_json(body: Body) -> Value {
    serde_json::from_slice(&body_bytes(body).await).expect("Should parse JSON")
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let app = setup_app().await;

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "bouquet-feedback");
    assert!(body["version"].is_string());
}

// =============================================================================
// Submission
// =============================================================================

#[tokio::test]
async fn test_submit_canonical_draft() {
    let app = setup_app().await;

    let draft = json!({
        "subjectName": "Spring Mix",
        "satisfied": "yes",
        "rating": 5,
        "comment": "Lovely"
    });
    let response = app
        .clone()
        .oneshot(post_json("/api/feedback", &draft))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["accepted"], true);
    assert_eq!(body["historyLen"], 1);
    assert_eq!(body["record"]["rating"], 5);
    assert_eq!(body["record"]["satisfied"], "yes");
    assert!(body["record"]["submittedAt"].is_string());

    let response = app.oneshot(get("/api/history")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["hasHistory"], true);
    assert_eq!(body["records"][0]["subjectName"], "Spring Mix");
}

#[tokio::test]
async fn test_submit_polish_layout() {
    let app = setup_app().await;

    let draft = json!({
        "Nazwa_bukietu": "Róże",
        "Zadowolon": "Tak",
        "Ocena": 4,
        "Komentarz": "Piękne"
    });
    let response = app.oneshot(post_json("/api/feedback", &draft)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["record"]["subjectName"], "Róże");
    assert_eq!(body["record"]["satisfied"], "yes");
}

#[tokio::test]
async fn test_submit_invalid_draft_is_422() {
    let app = setup_app().await;

    let draft = json!({
        "subjectName": "Spring Mix",
        "satisfied": "",
        "rating": 0,
        "comment": "Lovely"
    });
    let response = app
        .clone()
        .oneshot(post_json("/api/feedback", &draft))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = extract_json(response.into_body()).await;
    let fields: Vec<_> = body["issues"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["field"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(fields, vec!["satisfied", "rating"]);

    let response = app.oneshot(get("/api/history")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["count"], 0);
    assert_eq!(body["hasHistory"], false);
}

#[tokio::test]
async fn test_submit_unknown_shape_is_400() {
    let app = setup_app().await;

    let draft = json!({
        "subjectName": "Spring Mix",
        "satisfied": "yes",
        "stars": 5,
        "comment": "Lovely"
    });
    let response = app.oneshot(post_json("/api/feedback", &draft)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = extract_json(response.into_body()).await;
    assert!(body["error"].as_str().unwrap().contains("stars"));
}

#[tokio::test]
async fn test_submit_non_object_is_400() {
    let app = setup_app().await;

    let response = app
        .oneshot(post_json("/api/feedback", &json!(["Spring Mix", "yes"])))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// =============================================================================
// Export
// =============================================================================

#[tokio::test]
async fn test_export_empty_history_is_no_content() {
    let app = setup_app().await;

    let response = app.oneshot(get("/api/export")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(body_bytes(response.into_body()).await.is_empty());
}

#[tokio::test]
async fn test_export_download() {
    let app = setup_app().await;

    for (name, rating) in [("Tulips", 3), ("Spring Mix", 5)] {
        let draft = json!({
            "subjectName": name,
            "satisfied": "yes",
            "rating": rating,
            "comment": "Lovely"
        });
        let response = app
            .clone()
            .oneshot(post_json("/api/feedback", &draft))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app.oneshot(get("/api/export")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/csv; charset=utf-8"
    );
    let disposition = response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment; filename=\"opinie_"));
    assert!(disposition.ends_with(".csv\""));

    let bytes = body_bytes(response.into_body()).await;
    let records = parse_csv(&bytes).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].subject_name, "Tulips");
    assert_eq!(records[1].subject_name, "Spring Mix");
    assert_eq!(records[1].rating.value(), 5);
    assert!(records[1].submitted_at.is_some());
}
