use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use std::sync::Arc;

use crate::{
    extractors::AppJson,
    models::{CreateSessionRequest, Session, SubmitAnswerRequest, SubmitAnswerResponse},
    services::{session_service::SessionError, AppState},
};

type HandlerError = (StatusCode, String);

fn error_response(err: SessionError) -> HandlerError {
    let status = match &err {
        SessionError::NotFound => StatusCode::NOT_FOUND,
        SessionError::GateNotPassed
        | SessionError::GateCounting(_)
        | SessionError::StaleAnswer { .. } => StatusCode::CONFLICT,
        SessionError::InvalidChoice(_) => StatusCode::BAD_REQUEST,
        SessionError::Registry(e) => {
            tracing::error!("Session registry failure: {:#}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, err.to_string())
}

async fn load_session(state: &AppState, session_id: &str) -> Result<Session, SessionError> {
    state
        .sessions
        .load(session_id)
        .await?
        .ok_or(SessionError::NotFound)
}

/// POST /api/v1/sessions - sample questions and enter the instructions gate
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    body: Option<AppJson<CreateSessionRequest>>,
) -> Result<impl IntoResponse, HandlerError> {
    let req = body.map(|AppJson(req)| req).unwrap_or_default();
    let service = state.session_service();
    let session = service.start_session(req.participant_id, Utc::now()).await;

    state
        .sessions
        .save(&session)
        .await
        .map_err(|e| error_response(e.into()))?;

    let response = service.render(&session, Utc::now(), &mut rand::rng());
    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /api/v1/sessions/{id} - current render surface
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, HandlerError> {
    let session = load_session(&state, &session_id)
        .await
        .map_err(error_response)?;

    let response = state
        .session_service()
        .render(&session, Utc::now(), &mut rand::rng());
    Ok((StatusCode::OK, Json(response)))
}

/// POST /api/v1/sessions/{id}/start - leave the gate once the countdown is over
pub async fn start_assessment(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, HandlerError> {
    tracing::info!("Starting assessment for session: {}", session_id);

    let service = state.session_service();
    let _guard = state.session_locks.acquire(&session_id).await;
    let mut session = load_session(&state, &session_id)
        .await
        .map_err(error_response)?;

    service
        .proceed(&mut session, Utc::now())
        .map_err(error_response)?;

    state
        .sessions
        .save(&session)
        .await
        .map_err(|e| error_response(e.into()))?;

    let response = service.render(&session, Utc::now(), &mut rand::rng());
    Ok((StatusCode::OK, Json(response)))
}

/// POST /api/v1/sessions/{id}/answers - record the choice for the current question
pub async fn submit_answer(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    AppJson(req): AppJson<SubmitAnswerRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    tracing::info!("Submitting answer for session: {}", session_id);

    let service = state.session_service();
    let _guard = state.session_locks.acquire(&session_id).await;
    let mut session = load_session(&state, &session_id)
        .await
        .map_err(error_response)?;

    service
        .ensure_current_question(&session, req.question_id.as_deref())
        .map_err(error_response)?;

    let persistence = service
        .submit_answer(&mut session, &req.label)
        .await
        .map_err(error_response)?;

    state
        .sessions
        .save(&session)
        .await
        .map_err(|e| error_response(e.into()))?;

    let response = SubmitAnswerResponse {
        persistence,
        session: service.render(&session, Utc::now(), &mut rand::rng()),
    };
    Ok((StatusCode::OK, Json(response)))
}

/// POST /api/v1/sessions/{id}/reset - start over with a fresh sample
pub async fn reset_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, HandlerError> {
    tracing::info!("Resetting session: {}", session_id);

    let service = state.session_service();
    let _guard = state.session_locks.acquire(&session_id).await;
    let session = load_session(&state, &session_id)
        .await
        .map_err(error_response)?;

    let fresh = service.reset(&session, Utc::now()).await;

    state
        .sessions
        .save(&fresh)
        .await
        .map_err(|e| error_response(e.into()))?;

    let response = service.render(&fresh, Utc::now(), &mut rand::rng());
    Ok((StatusCode::OK, Json(response)))
}
