use std::collections::HashSet;
use std::time::Duration;

use axum::http::StatusCode;
use serde_json::json;

use annotation_api::models::Question;

mod common;

use common::{
    create_session, create_slow_write_app, create_test_app, sample_questions, send, send_json,
};

#[tokio::test]
async fn test_create_session_enters_gate_with_default_participant() {
    let app = create_test_app(sample_questions(), 20);

    let (_, json) = create_session(&app.router, None).await;

    assert_eq!(json["participant_id"], "Annotator_Guest");
    assert_eq!(json["view"]["state"], "gating");
    assert_eq!(json["view"]["proceed_enabled"], false);
    assert_eq!(json["view"]["instructions"]["title"], "Identify the Demographic");
    let remaining = json["view"]["remaining_seconds"].as_u64().unwrap();
    assert!(remaining > 0 && remaining <= 20);
}

#[tokio::test]
async fn test_create_session_without_body_uses_default_participant() {
    let app = create_test_app(sample_questions(), 20);

    let (status, body) = send(&app.router, "POST", "/api/v1/sessions", None).await;

    assert_eq!(status, StatusCode::CREATED);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["participant_id"], "Annotator_Guest");
    assert_eq!(json["view"]["state"], "gating");
}

#[tokio::test]
async fn test_empty_participant_id_is_rejected() {
    let app = create_test_app(sample_questions(), 20);

    let (status, _) = send(
        &app.router,
        "POST",
        "/api/v1/sessions",
        Some(json!({ "participant_id": "" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_proceed_is_rejected_while_counting_down() {
    let app = create_test_app(sample_questions(), 20);
    let (id, _) = create_session(&app.router, Some("p1")).await;

    let (status, body) = send(
        &app.router,
        "POST",
        &format!("/api/v1/sessions/{}/start", id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(String::from_utf8_lossy(&body).contains("remaining"));

    let (status, _) = send(
        &app.router,
        "POST",
        &format!("/api/v1/sessions/{}/answers", id),
        Some(json!({ "label": "Male" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(app.store.responses().is_empty());
}

#[tokio::test]
async fn test_full_session_flow() {
    let app = create_test_app(sample_questions(), 0);
    let (id, _) = create_session(&app.router, Some("tester")).await;

    let (status, json) = send_json(
        &app.router,
        "POST",
        &format!("/api/v1/sessions/{}/start", id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["view"]["state"], "answering");
    assert_eq!(json["view"]["position"], 1);
    assert_eq!(json["view"]["total"], 3);
    assert_eq!(json["view"]["progress"], "1/3");

    for expected_position in 1..=3 {
        let (_, current) =
            send_json(&app.router, "GET", &format!("/api/v1/sessions/{}", id), None).await;
        assert_eq!(current["view"]["position"], expected_position);

        let options = current["view"]["options"].as_array().unwrap();
        assert_eq!(options.len(), 3);
        assert_eq!(options.iter().filter(|o| *o == "Don't know/Neutral").count(), 1);

        let label = options[0].as_str().unwrap().to_string();
        let (status, answered) = send_json(
            &app.router,
            "POST",
            &format!("/api/v1/sessions/{}/answers", id),
            Some(json!({ "label": label })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(answered["persistence"], "stored");
    }

    let (_, done) = send_json(&app.router, "GET", &format!("/api/v1/sessions/{}", id), None).await;
    assert_eq!(done["view"]["state"], "done");
    assert_eq!(done["view"]["answered"], 3);
    assert_eq!(done["view"]["can_restart"], true);

    let responses = app.store.responses();
    assert_eq!(responses.len(), 3);
    assert!(responses.iter().all(|r| r.participant_id == "tester"));
    let mut ids: Vec<_> = responses.iter().map(|r| r.question_id.clone()).collect();
    ids.sort();
    assert_eq!(ids, vec!["q1", "q2", "q3"]);
}

#[tokio::test]
async fn test_submit_after_done_is_a_noop() {
    let app = create_test_app(
        vec![Question::new("q1", "Person A is tall.", "Male", vec!["Female".into()])],
        0,
    );
    let (id, _) = create_session(&app.router, None).await;
    send(&app.router, "POST", &format!("/api/v1/sessions/{}/start", id), None).await;

    let answer = |label: &'static str| {
        let router = app.router.clone();
        let uri = format!("/api/v1/sessions/{}/answers", id);
        async move { send_json(&router, "POST", &uri, Some(json!({ "label": label }))).await }
    };

    let (_, first) = answer("Female").await;
    assert_eq!(first["persistence"], "stored");
    assert_eq!(first["session"]["view"]["state"], "done");

    let (status, second) = answer("Male").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["persistence"], "skipped");
    assert_eq!(app.store.responses().len(), 1);
}

#[tokio::test]
async fn test_invalid_label_does_not_advance() {
    let app = create_test_app(
        vec![Question::new("q1", "Person A is tall.", "Male", vec!["Female".into()])],
        0,
    );
    let (id, _) = create_session(&app.router, None).await;
    send(&app.router, "POST", &format!("/api/v1/sessions/{}/start", id), None).await;

    let (status, _) = send(
        &app.router,
        "POST",
        &format!("/api/v1/sessions/{}/answers", id),
        Some(json!({ "label": "Purple" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, current) =
        send_json(&app.router, "GET", &format!("/api/v1/sessions/{}", id), None).await;
    assert_eq!(current["view"]["state"], "answering");
    assert_eq!(current["view"]["position"], 1);
    assert!(app.store.responses().is_empty());
}

#[tokio::test]
async fn test_store_failure_still_advances() {
    let app = create_test_app(sample_questions(), 0);
    app.store.set_fail_writes(true);

    let (id, _) = create_session(&app.router, None).await;
    send(&app.router, "POST", &format!("/api/v1/sessions/{}/start", id), None).await;

    let (status, json) = send_json(
        &app.router,
        "POST",
        &format!("/api/v1/sessions/{}/answers", id),
        Some(json!({ "label": "Don't know/Neutral" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["persistence"], "store_failed");
    assert_eq!(json["session"]["view"]["position"], 2);
    assert!(app.store.responses().is_empty());
}

#[tokio::test]
async fn test_empty_store_shows_no_questions() {
    let app = create_test_app(vec![], 0);
    let (id, _) = create_session(&app.router, None).await;

    let (_, json) = send_json(
        &app.router,
        "POST",
        &format!("/api/v1/sessions/{}/start", id),
        None,
    )
    .await;
    assert_eq!(json["view"]["state"], "no_questions");

    let (status, json) = send_json(
        &app.router,
        "POST",
        &format!("/api/v1/sessions/{}/answers", id),
        Some(json!({ "label": "Male" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["persistence"], "skipped");
    assert_eq!(json["session"]["view"]["state"], "no_questions");
}

#[tokio::test]
async fn test_reset_keeps_handle_and_restarts_gate() {
    let app = create_test_app(sample_questions(), 0);
    let (id, _) = create_session(&app.router, Some("p7")).await;
    send(&app.router, "POST", &format!("/api/v1/sessions/{}/start", id), None).await;
    send(
        &app.router,
        "POST",
        &format!("/api/v1/sessions/{}/answers", id),
        Some(json!({ "label": "Don't know/Neutral" })),
    )
    .await;

    let (status, json) = send_json(
        &app.router,
        "POST",
        &format!("/api/v1/sessions/{}/reset", id),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["session_id"], id.as_str());
    assert_eq!(json["participant_id"], "p7");
    assert_eq!(json["view"]["state"], "gating");

    let (_, started) = send_json(
        &app.router,
        "POST",
        &format!("/api/v1/sessions/{}/start", id),
        None,
    )
    .await;
    assert_eq!(started["view"]["position"], 1);
}

#[tokio::test]
async fn test_unknown_session_returns_404() {
    let app = create_test_app(sample_questions(), 0);
    let missing = "/api/v1/sessions/00000000-0000-0000-0000-000000000000";

    let (status, _) = send(&app.router, "GET", missing, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app.router, "POST", &format!("{}/start", missing), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app.router, "GET", &format!("{}/gate", missing), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_gate_stream_ends_with_gate_open() {
    let app = create_test_app(sample_questions(), 0);
    let (id, _) = create_session(&app.router, None).await;

    let (status, body) = send(
        &app.router,
        "GET",
        &format!("/api/v1/sessions/{}/gate", id),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8(body).unwrap();
    assert!(text.contains("event: gate-open"));
    assert!(!text.contains("event: gate-tick"));
}

#[tokio::test]
async fn test_trace_id_is_echoed() {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    let app = create_test_app(sample_questions(), 0);
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-trace-id", "trace-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.headers()["x-trace-id"], "trace-123");
}

fn either_gender_questions() -> Vec<Question> {
    vec![
        Question::new("q1", "Person A is tall.", "Male", vec!["Female".into()]),
        Question::new("q2", "Person A is short.", "Female", vec!["Male".into()]),
    ]
}

#[tokio::test]
async fn test_concurrent_answers_record_distinct_questions() {
    let app = create_slow_write_app(either_gender_questions(), 0, Duration::from_millis(50));
    let (id, _) = create_session(&app.router, None).await;
    send(&app.router, "POST", &format!("/api/v1/sessions/{}/start", id), None).await;

    let uri = format!("/api/v1/sessions/{}/answers", id);
    let (first, second) = tokio::join!(
        send_json(&app.router, "POST", &uri, Some(json!({ "label": "Male" }))),
        send_json(&app.router, "POST", &uri, Some(json!({ "label": "Female" }))),
    );
    assert_eq!(first.0, StatusCode::OK);
    assert_eq!(second.0, StatusCode::OK);
    assert_eq!(first.1["persistence"], "stored");
    assert_eq!(second.1["persistence"], "stored");

    let ids: HashSet<String> = app
        .store
        .responses()
        .into_iter()
        .map(|r| r.question_id)
        .collect();
    assert_eq!(ids, HashSet::from(["q1".to_string(), "q2".to_string()]));

    let (_, done) = send_json(&app.router, "GET", &format!("/api/v1/sessions/{}", id), None).await;
    assert_eq!(done["view"]["state"], "done");
    assert_eq!(done["view"]["answered"], 2);
}

#[tokio::test]
async fn test_answer_for_a_passed_question_is_rejected() {
    let app = create_test_app(either_gender_questions(), 0);
    let (id, _) = create_session(&app.router, None).await;
    let (_, started) =
        send_json(&app.router, "POST", &format!("/api/v1/sessions/{}/start", id), None).await;
    let first_id = started["view"]["question_id"].as_str().unwrap().to_string();

    let uri = format!("/api/v1/sessions/{}/answers", id);
    let (status, _) = send_json(
        &app.router,
        "POST",
        &uri,
        Some(json!({ "label": "Male", "question_id": first_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app.router,
        "POST",
        &uri,
        Some(json!({ "label": "Female", "question_id": first_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, current) = send_json(&app.router, "GET", &format!("/api/v1/sessions/{}", id), None).await;
    assert_eq!(current["view"]["position"], 2);
    assert_eq!(app.store.responses().len(), 1);
}
