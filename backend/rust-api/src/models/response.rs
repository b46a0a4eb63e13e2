use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Append-only record of one participant choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub participant_id: String,
    pub question_id: String,
    pub chosen_label: String,
    pub timestamp: DateTime<Utc>,
}

impl ResponseRecord {
    pub fn new(participant_id: &str, question_id: &str, chosen_label: &str) -> Self {
        Self {
            participant_id: participant_id.to_string(),
            question_id: question_id.to_string(),
            chosen_label: chosen_label.to_string(),
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct SubmitAnswerRequest {
    #[validate(length(min = 1, max = 256))]
    pub label: String,
    /// Question the client rendered; checked against the cursor when present.
    #[serde(default)]
    #[validate(length(min = 1, max = 256))]
    pub question_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistenceStatus {
    Stored,
    StoreFailed,
    /// Nothing was written because the session was already exhausted.
    Skipped,
}

#[derive(Debug, Serialize)]
pub struct SubmitAnswerResponse {
    pub persistence: PersistenceStatus,
    pub session: super::session::SessionResponse,
}
