use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::question::Question;

/// One participant's run through a sampled question sequence.
///
/// The sequence is fixed when the session is created; only `cursor`,
/// `gate_passed` and `responses` change afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub participant_id: String,
    pub questions: Vec<Question>,
    pub cursor: usize,
    pub gate_started_at: DateTime<Utc>,
    pub gate_duration_secs: u64,
    pub gate_passed: bool,
    /// question id -> chosen label
    pub responses: HashMap<String, String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Gating,
    Answering,
    Done,
}

impl Session {
    pub fn new(
        id: String,
        participant_id: String,
        questions: Vec<Question>,
        gate_duration_secs: u64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            participant_id,
            questions,
            cursor: 0,
            gate_started_at: now,
            gate_duration_secs,
            gate_passed: false,
            responses: HashMap::new(),
            created_at: now,
        }
    }

    /// Saturates at the latest representable instant instead of overflowing.
    pub fn gate_deadline(&self) -> DateTime<Utc> {
        i64::try_from(self.gate_duration_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|duration| self.gate_started_at.checked_add_signed(duration))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Time left on the countdown, never negative.
    pub fn gate_remaining(&self, now: DateTime<Utc>) -> Duration {
        let remaining = self.gate_deadline() - now;
        if remaining < Duration::zero() {
            Duration::zero()
        } else {
            remaining
        }
    }

    /// Whole seconds left, rounded up so the display only shows 0 once the gate is open.
    pub fn gate_remaining_seconds(&self, now: DateTime<Utc>) -> u64 {
        let millis = self.gate_remaining(now).num_milliseconds().max(0) as u64;
        millis.div_ceil(1000)
    }

    pub fn gate_open(&self, now: DateTime<Utc>) -> bool {
        now >= self.gate_deadline()
    }

    pub fn phase(&self) -> SessionPhase {
        if !self.gate_passed {
            SessionPhase::Gating
        } else if !self.questions.is_empty() && self.cursor >= self.questions.len() {
            SessionPhase::Done
        } else {
            SessionPhase::Answering
        }
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.cursor)
    }

    pub fn answered_count(&self) -> usize {
        self.cursor.min(self.questions.len())
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct CreateSessionRequest {
    #[validate(length(min = 1, max = 128))]
    pub participant_id: Option<String>,
}

/// The render surface for a session, as returned to clients.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: String,
    pub participant_id: String,
    pub view: SessionView,
}

#[derive(Debug, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionView {
    Gating(GateView),
    Answering(QuestionView),
    NoQuestions { message: String },
    Done(CompletionView),
}

#[derive(Debug, Serialize)]
pub struct Instructions {
    pub title: &'static str,
    pub body: &'static str,
    pub categories: &'static [&'static str],
}

#[derive(Debug, Serialize)]
pub struct GateView {
    pub instructions: Instructions,
    pub status: String,
    pub remaining_seconds: u64,
    pub proceed_enabled: bool,
    pub deadline: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct QuestionView {
    pub question_id: String,
    /// 1-based position of the question in the session.
    pub position: usize,
    pub total: usize,
    pub progress: String,
    pub statement: String,
    pub prompt: &'static str,
    pub options: [String; 3],
}

#[derive(Debug, Serialize)]
pub struct CompletionView {
    pub message: String,
    pub answered: usize,
    pub can_restart: bool,
}
