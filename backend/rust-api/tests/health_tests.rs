use axum::http::StatusCode;

mod common;

use common::{create_test_app, sample_questions, send, send_json};

#[tokio::test]
async fn test_health_reports_dependencies() {
    let app = create_test_app(sample_questions(), 20);

    let (status, json) = send_json(&app.router, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["service"], "annotation-api");
    assert_eq!(json["dependencies"]["question_store"]["backend"], "memory");
    assert_eq!(json["dependencies"]["session_registry"]["status"], "healthy");
}

#[tokio::test]
async fn test_metrics_require_basic_auth() {
    let app = create_test_app(sample_questions(), 20);

    let (status, _) = send(&app.router, "GET", "/metrics", None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
