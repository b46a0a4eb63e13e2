use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
};
use chrono::{DateTime, Utc};
use futures::stream::{self, Stream};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

use crate::{
    metrics::SSE_CONNECTIONS_ACTIVE,
    models::{
        timer::{GateEvent, GateOpen, GateTick},
        Session,
    },
    services::AppState,
};

/// SSE endpoint for the instructions countdown
/// GET /api/v1/sessions/{id}/gate
pub async fn gate_stream(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    tracing::info!("Client connected to gate stream: session={}", session_id);

    let session = state
        .sessions
        .load(&session_id)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Session not found".to_string()))?;

    let tick_interval = Duration::from_millis(state.config.gate_tick_ms);
    let stream = create_gate_stream(session, tick_interval);

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// Decrements the active stream gauge when the client goes away.
struct ConnectionGuard;

impl ConnectionGuard {
    fn new() -> Self {
        SSE_CONNECTIONS_ACTIVE.inc();
        Self
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        SSE_CONNECTIONS_ACTIVE.dec();
    }
}

struct GateStreamState {
    session: Session,
    tick_interval: Duration,
    first: bool,
    done: bool,
    _guard: ConnectionGuard,
}

/// Emits `gate-tick` events until the deadline passes, then a single `gate-open`.
///
/// Remaining time is recomputed from the deadline on every tick, so a slow
/// tick never drifts the countdown.
fn create_gate_stream(
    session: Session,
    tick_interval: Duration,
) -> impl Stream<Item = Result<Event, Infallible>> {
    let initial = GateStreamState {
        session,
        tick_interval,
        first: true,
        done: false,
        _guard: ConnectionGuard::new(),
    };

    stream::unfold(initial, |mut st| async move {
        if st.done {
            return None;
        }
        if !st.first {
            sleep(st.tick_interval).await;
        }
        st.first = false;

        let event = next_gate_event(&st.session, Utc::now());
        if matches!(event, GateEvent::GateOpen(_)) {
            tracing::info!("Gate open: session={}", st.session.id);
            st.done = true;
        }

        let sse = Event::default()
            .event(event.event_name())
            .data(event.to_sse_data());
        Some((Ok(sse), st))
    })
}

fn next_gate_event(session: &Session, now: DateTime<Utc>) -> GateEvent {
    if session.gate_passed || session.gate_open(now) {
        return GateEvent::GateOpen(GateOpen {
            session_id: session.id.clone(),
            timestamp: now,
            message: "Instructions read time complete. You may now start the assessment."
                .to_string(),
        });
    }

    GateEvent::GateTick(GateTick {
        session_id: session.id.clone(),
        remaining_seconds: session.gate_remaining_seconds(now),
        total_seconds: session.gate_duration_secs,
        deadline: session.gate_deadline(),
        timestamp: now,
    })
}
