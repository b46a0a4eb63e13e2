use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::Rng;
use thiserror::Error;
use uuid::Uuid;

use crate::config::Config;
use crate::metrics::{ANSWERS_SUBMITTED_TOTAL, SESSIONS_TOTAL};
use crate::models::{
    question::Question,
    response::{PersistenceStatus, ResponseRecord},
    session::{
        CompletionView, GateView, Instructions, QuestionView, Session, SessionPhase,
        SessionResponse, SessionView,
    },
};
use crate::services::options::{derive_options, is_offerable};
use crate::services::question_store::QuestionStore;

pub const TITLE: &str = "Identify the Demographic";

pub const INSTRUCTIONS: &str = "All the statements are regarding Person A. Your task is to \
assign a demographic to Person A based on the statement. Sentences regarding Person A can be \
from different demographics. For each statement you will see three options: two demographic \
labels that Person A could belong to, and \"Don't know/Neutral\". Choose the label that best \
represents the demographic you infer from the statement. Choose \"Don't know/Neutral\" if the \
statement is ambiguous or you do not wish to assign a demographic. If you are unfamiliar with a \
word or its context, feel free to look it up before answering.";

pub const CATEGORIES: &[&str] = &[
    "Gender",
    "Religion",
    "Region",
    "Caste",
    "Age",
    "Socio-economic status",
    "Race",
    "Disability",
];

pub const QUESTION_PROMPT: &str = "Which demographic category best describes Person A?";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session not found")]
    NotFound,

    #[error("Assessment has not been started")]
    GateNotPassed,

    #[error("Instructions countdown still running: {0}s remaining")]
    GateCounting(u64),

    #[error("Invalid choice: {0}")]
    InvalidChoice(String),

    #[error("Answer targets question {received} but the session is at {expected}")]
    StaleAnswer { expected: String, received: String },

    #[error(transparent)]
    Registry(#[from] anyhow::Error),
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub sample_size: usize,
    pub gate_duration_secs: u64,
    pub default_participant: String,
}

impl From<&Config> for SessionSettings {
    fn from(config: &Config) -> Self {
        Self {
            sample_size: config.sample_size,
            gate_duration_secs: config.gate_duration_secs,
            default_participant: config.default_participant.clone(),
        }
    }
}

/// Drives one session through Gating -> Answering -> Done.
///
/// Holds no per-session state itself; every operation takes the `Session`
/// it acts on.
pub struct SessionService {
    store: Arc<dyn QuestionStore>,
    settings: SessionSettings,
}

impl SessionService {
    pub fn new(store: Arc<dyn QuestionStore>, settings: SessionSettings) -> Self {
        Self { store, settings }
    }

    pub async fn start_session(
        &self,
        participant_id: Option<String>,
        now: DateTime<Utc>,
    ) -> Session {
        let participant_id = participant_id
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| self.settings.default_participant.clone());

        let questions = self.sample().await;
        let session = Session::new(
            Uuid::new_v4().to_string(),
            participant_id,
            questions,
            self.settings.gate_duration_secs,
            now,
        );

        SESSIONS_TOTAL.with_label_values(&["created"]).inc();

        tracing::info!(
            "Session created: {} for participant: {} ({} questions)",
            session.id,
            session.participant_id,
            session.questions.len()
        );

        session
    }

    /// Fresh sample, cursor back to zero, countdown restarted. The session
    /// handle and participant are kept.
    pub async fn reset(&self, session: &Session, now: DateTime<Utc>) -> Session {
        let questions = self.sample().await;
        let fresh = Session::new(
            session.id.clone(),
            session.participant_id.clone(),
            questions,
            self.settings.gate_duration_secs,
            now,
        );

        SESSIONS_TOTAL.with_label_values(&["reset"]).inc();
        tracing::info!(
            "Session reset: {} ({} questions)",
            fresh.id,
            fresh.questions.len()
        );

        fresh
    }

    /// The "start assessment" action. Allowed only once the countdown has elapsed.
    pub fn proceed(&self, session: &mut Session, now: DateTime<Utc>) -> Result<(), SessionError> {
        if session.gate_passed {
            return Ok(());
        }
        if !session.gate_open(now) {
            return Err(SessionError::GateCounting(
                session.gate_remaining_seconds(now),
            ));
        }

        session.gate_passed = true;
        tracing::info!("Session {} passed the instructions gate", session.id);
        Ok(())
    }

    /// Rejects an answer aimed at a question other than the one at the cursor.
    ///
    /// Clients echo the question id they rendered; a mismatch means another
    /// request already moved the session on.
    pub fn ensure_current_question(
        &self,
        session: &Session,
        question_id: Option<&str>,
    ) -> Result<(), SessionError> {
        let (Some(received), Some(current)) = (question_id, session.current_question()) else {
            return Ok(());
        };
        if received != current.id {
            return Err(SessionError::StaleAnswer {
                expected: current.id.clone(),
                received: received.to_string(),
            });
        }
        Ok(())
    }

    /// Records the choice for the question at the cursor and advances.
    ///
    /// A failed store write is logged and reported but the cursor still moves.
    /// Submitting past the end is a no-op.
    pub async fn submit_answer(
        &self,
        session: &mut Session,
        label: &str,
    ) -> Result<PersistenceStatus, SessionError> {
        if !session.gate_passed {
            return Err(SessionError::GateNotPassed);
        }

        let Some(question) = session.current_question() else {
            tracing::debug!("Session {} has no question at cursor, ignoring answer", session.id);
            return Ok(PersistenceStatus::Skipped);
        };

        if !is_offerable(question, label) {
            return Err(SessionError::InvalidChoice(label.to_string()));
        }

        let question_id = question.id.clone();
        let record = ResponseRecord::new(&session.participant_id, &question_id, label);

        let status = match self.store.append_response(&record).await {
            Ok(()) => PersistenceStatus::Stored,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    session = %session.id,
                    question = %question_id,
                    "Failed to persist response, advancing anyway"
                );
                PersistenceStatus::StoreFailed
            }
        };

        let outcome = match status {
            PersistenceStatus::Stored => "stored",
            _ => "store_failed",
        };
        ANSWERS_SUBMITTED_TOTAL.with_label_values(&[outcome]).inc();

        session.responses.insert(question_id, label.to_string());
        session.cursor += 1;

        if session.phase() == SessionPhase::Done {
            SESSIONS_TOTAL.with_label_values(&["completed"]).inc();
            tracing::info!(
                "Session completed: {} ({} answers)",
                session.id,
                session.responses.len()
            );
        }

        Ok(status)
    }

    /// Produces the current render surface. Options are reshuffled on every call.
    pub fn render<R: Rng + ?Sized>(
        &self,
        session: &Session,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> SessionResponse {
        let view = match session.phase() {
            SessionPhase::Gating => SessionView::Gating(gate_view(session, now)),
            SessionPhase::Answering => match session.current_question() {
                Some(question) => {
                    SessionView::Answering(question_view(session, question, rng))
                }
                None => SessionView::NoQuestions {
                    message: "No questions are available. Please check the questions store."
                        .to_string(),
                },
            },
            SessionPhase::Done => SessionView::Done(CompletionView {
                message: "Assessment complete! Thank you for your participation.".to_string(),
                answered: session.answered_count(),
                can_restart: true,
            }),
        };

        SessionResponse {
            session_id: session.id.clone(),
            participant_id: session.participant_id.clone(),
            view,
        }
    }

    async fn sample(&self) -> Vec<Question> {
        match self.store.sample_questions(self.settings.sample_size).await {
            Ok(questions) => questions,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    backend = self.store.backend_name(),
                    "Failed to sample questions, starting with an empty sequence"
                );
                Vec::new()
            }
        }
    }
}

fn gate_view(session: &Session, now: DateTime<Utc>) -> GateView {
    let remaining_seconds = session.gate_remaining_seconds(now);
    let proceed_enabled = session.gate_open(now);
    let status = if proceed_enabled {
        "Instructions read time complete. You may now start the assessment.".to_string()
    } else {
        format!(
            "Please take a moment to read the instructions. Assessment is enabled in: {} seconds",
            remaining_seconds
        )
    };

    GateView {
        instructions: Instructions {
            title: TITLE,
            body: INSTRUCTIONS,
            categories: CATEGORIES,
        },
        status,
        remaining_seconds,
        proceed_enabled,
        deadline: session.gate_deadline(),
    }
}

fn question_view<R: Rng + ?Sized>(
    session: &Session,
    question: &Question,
    rng: &mut R,
) -> QuestionView {
    let position = session.cursor + 1;
    let total = session.questions.len();

    QuestionView {
        question_id: question.id.clone(),
        position,
        total,
        progress: format!("{}/{}", position, total),
        statement: question.statement.clone(),
        prompt: QUESTION_PROMPT,
        options: derive_options(question, rng),
    }
}
