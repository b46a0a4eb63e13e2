#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use annotation_api::{
    config::{Config, StoreBackend},
    create_router,
    models::{Question, ResponseRecord},
    services::{
        question_store::{MemoryQuestionStore, QuestionStore, StoreError},
        session_registry::InMemorySessionRegistry,
        AppState,
    },
};

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryQuestionStore>,
}

pub fn sample_questions() -> Vec<Question> {
    vec![
        Question::new(
            "q1",
            "Person A wore a saree to the wedding.",
            "Female",
            vec!["Male".to_string()],
        ),
        Question::new(
            "q2",
            "Person A grew a beard for the festival.",
            "Male",
            vec!["Female".to_string()],
        ),
        Question::new(
            "q3",
            "Person A retired from teaching last spring.",
            "Old",
            vec![],
        ),
    ]
}

/// Memory store whose writes take a while, so concurrent requests overlap.
pub struct SlowWriteStore {
    inner: Arc<MemoryQuestionStore>,
    delay: Duration,
}

#[async_trait]
impl QuestionStore for SlowWriteStore {
    async fn sample_questions(&self, n: usize) -> Result<Vec<Question>, StoreError> {
        self.inner.sample_questions(n).await
    }

    async fn append_response(&self, response: &ResponseRecord) -> Result<(), StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.append_response(response).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "slow-memory"
    }
}

pub fn create_test_app(questions: Vec<Question>, gate_duration_secs: u64) -> TestApp {
    let store = Arc::new(MemoryQuestionStore::new(questions));
    build_app(store.clone(), store, gate_duration_secs)
}

pub fn create_slow_write_app(
    questions: Vec<Question>,
    gate_duration_secs: u64,
    delay: Duration,
) -> TestApp {
    let inner = Arc::new(MemoryQuestionStore::new(questions));
    let slow = Arc::new(SlowWriteStore {
        inner: inner.clone(),
        delay,
    });
    build_app(slow, inner, gate_duration_secs)
}

fn build_app(
    state_store: Arc<dyn QuestionStore>,
    store: Arc<MemoryQuestionStore>,
    gate_duration_secs: u64,
) -> TestApp {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    let config = Config {
        store_backend: StoreBackend::Memory,
        gate_duration_secs,
        gate_tick_ms: 10,
        ..Config::default()
    };

    let app_state = Arc::new(AppState::from_parts(
        config,
        state_store,
        Arc::new(InMemorySessionRegistry::new()),
    ));

    TestApp {
        router: create_router(app_state),
        store,
    }
}

/// Sends a request and returns the status plus the raw body.
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, Vec<u8>) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

pub async fn send_json(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let (status, bytes) = send(app, method, uri, body).await;
    let json = serde_json::from_slice(&bytes).unwrap_or_else(|_| {
        panic!(
            "expected JSON, got status {} body {}",
            status,
            String::from_utf8_lossy(&bytes)
        )
    });
    (status, json)
}

/// Creates a session and returns its id along with the initial view.
pub async fn create_session(
    app: &Router,
    participant_id: Option<&str>,
) -> (String, serde_json::Value) {
    let body = match participant_id {
        Some(p) => serde_json::json!({ "participant_id": p }),
        None => serde_json::json!({}),
    };
    let (status, json) = send_json(app, "POST", "/api/v1/sessions", Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "body: {}", json);
    let id = json["session_id"].as_str().unwrap().to_string();
    (id, json)
}
