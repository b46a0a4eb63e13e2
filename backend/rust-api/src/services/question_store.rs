use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use rand::seq::IndexedRandom;
use thiserror::Error;

use crate::models::{question::Question, response::ResponseRecord};

/// Errors surfaced by question store adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("query failed: {0}")]
    Query(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Read/append capability every storage backend provides.
#[async_trait]
pub trait QuestionStore: Send + Sync {
    /// Up to `n` distinct questions chosen uniformly at random. An empty
    /// store yields an empty vector, not an error.
    async fn sample_questions(&self, n: usize) -> Result<Vec<Question>, StoreError>;

    /// Durably record one response. Single attempt, no retry.
    async fn append_response(&self, response: &ResponseRecord) -> Result<(), StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;

    fn backend_name(&self) -> &'static str;
}

/// Drops repeated question ids, keeping the first occurrence.
pub fn dedup_by_id(questions: Vec<Question>) -> Vec<Question> {
    let mut seen = HashSet::new();
    questions
        .into_iter()
        .filter(|question| seen.insert(question.id.clone()))
        .collect()
}

/// Process-local store, used by tests and the `memory` backend.
#[derive(Default)]
pub struct MemoryQuestionStore {
    questions: Mutex<Vec<Question>>,
    responses: Mutex<Vec<ResponseRecord>>,
    fail_writes: AtomicBool,
}

impl MemoryQuestionStore {
    pub fn new(questions: Vec<Question>) -> Self {
        Self {
            questions: Mutex::new(questions),
            ..Self::default()
        }
    }

    pub fn responses(&self) -> Vec<ResponseRecord> {
        self.responses
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    /// Make every subsequent `append_response` fail, to simulate an unreachable store.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl QuestionStore for MemoryQuestionStore {
    async fn sample_questions(&self, n: usize) -> Result<Vec<Question>, StoreError> {
        let questions = self
            .questions
            .lock()
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        let mut rng = rand::rng();
        let sample = questions
            .choose_multiple(&mut rng, n)
            .cloned()
            .collect::<Vec<_>>();
        Ok(dedup_by_id(sample))
    }

    async fn append_response(&self, response: &ResponseRecord) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Connection("store unavailable".to_string()));
        }
        self.responses
            .lock()
            .map_err(|e| StoreError::Connection(e.to_string()))?
            .push(response.clone());
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
