use super::state::AppState;
use crate::error::SessionError;
use crate::session::{session_id_for, SessionConfig, SessionController, SessionState, SessionView};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct JoinSessionRequest {
    pub appointment_ref: String,

    /// Display name used to build the local identity
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StartRecordingBody {
    /// Overrides the configured minimum participant count
    pub min_participants: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(ErrorResponse { error: message })).into_response()
}

fn session_error_response(err: &SessionError) -> Response {
    let status = match err {
        SessionError::Precondition(_) => StatusCode::PRECONDITION_FAILED,
        SessionError::InvalidState(_)
        | SessionError::RecordingAlreadyActive(_)
        | SessionError::NoActiveRecording(_)
        | SessionError::Cancelled => StatusCode::CONFLICT,
        SessionError::TokenRequest { .. }
        | SessionError::TransportConnect(_)
        | SessionError::RecordingService { .. } => StatusCode::BAD_GATEWAY,
        SessionError::MediaAcquisition(_) => StatusCode::SERVICE_UNAVAILABLE,
    };
    error_response(status, err.to_string())
}

fn session_not_found(session_id: &str) -> Response {
    error_response(StatusCode::NOT_FOUND, format!("Session {} not found", session_id))
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /sessions
/// Join the call for an appointment
pub async fn join_session(
    State(state): State<AppState>,
    Json(req): Json<JoinSessionRequest>,
) -> Response {
    let session_id = session_id_for(&req.appointment_ref);

    info!("Join requested for {}", session_id);

    let session = {
        let mut sessions = state.sessions.write().await;
        if let Some(existing) = sessions.get(&session_id) {
            let current = existing.state();
            if !matches!(current, SessionState::Terminated | SessionState::Failed) {
                return error_response(
                    StatusCode::CONFLICT,
                    format!("Session {} is already {:?}", session_id, current),
                );
            }
        }

        let display_name = req.display_name.as_deref().unwrap_or("participant");
        let config = SessionConfig::for_appointment(&req.appointment_ref, display_name)
            .with_constraints(state.defaults.constraints.clone())
            .with_token_retry(state.defaults.token_attempts, state.defaults.token_retry_backoff);

        let session = Arc::new(SessionController::new(config, state.deps.clone()));
        sessions.insert(session_id.clone(), Arc::clone(&session));
        session
    };

    if let Err(e) = session.join().await {
        error!("Failed to join {}: {}", session_id, e);
        session.leave().await;

        let mut sessions = state.sessions.write().await;
        if sessions
            .get(&session_id)
            .is_some_and(|s| Arc::ptr_eq(s, &session))
        {
            sessions.remove(&session_id);
        }
        return session_error_response(&e);
    }

    (StatusCode::OK, Json(session.snapshot())).into_response()
}

/// GET /sessions/:session_id
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Response {
    match state.session(&session_id).await {
        Some(session) => (StatusCode::OK, Json(session.snapshot())).into_response(),
        None => session_not_found(&session_id),
    }
}

/// POST /sessions/:session_id/leave
pub async fn leave_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Response {
    info!("Leave requested for {}", session_id);

    let session = {
        let mut sessions = state.sessions.write().await;
        sessions.remove(&session_id)
    };

    match session {
        Some(session) => {
            session.leave().await;
            (StatusCode::OK, Json(session.snapshot())).into_response()
        }
        None => session_not_found(&session_id),
    }
}

/// POST /sessions/:session_id/recording/start
pub async fn start_recording(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    body: Option<Json<StartRecordingBody>>,
) -> Response {
    let Some(session) = state.session(&session_id).await else {
        return session_not_found(&session_id);
    };

    let min_participants = body
        .and_then(|Json(b)| b.min_participants)
        .unwrap_or(state.defaults.min_participants);

    match state.recordings.start(&*session, min_participants).await {
        Ok(recording) => (StatusCode::OK, Json(recording)).into_response(),
        Err(e) => {
            warn!("Recording start rejected for {}: {}", session_id, e);
            session_error_response(&e)
        }
    }
}

/// POST /sessions/:session_id/recording/stop
pub async fn stop_recording(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Response {
    let Some(recording) = state.recordings.current(&session_id) else {
        return error_response(
            StatusCode::NOT_FOUND,
            format!("No recording for session {}", session_id),
        );
    };

    match state.recordings.stop(&recording).await {
        Ok(recording) => (StatusCode::OK, Json(recording)).into_response(),
        Err(e) => {
            warn!("Recording stop failed for {}: {}", session_id, e);
            session_error_response(&e)
        }
    }
}

/// GET /sessions/:session_id/recording
pub async fn get_recording(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Response {
    match state.recordings.current(&session_id) {
        Some(recording) => (StatusCode::OK, Json(recording)).into_response(),
        None => error_response(
            StatusCode::NOT_FOUND,
            format!("No recording for session {}", session_id),
        ),
    }
}

/// GET /appointments/:appointment_ref/join-link
pub async fn issue_join_link(
    State(state): State<AppState>,
    Path(appointment_ref): Path<String>,
) -> Response {
    match state.links.issue(&appointment_ref) {
        Ok(link) => (StatusCode::OK, Json(link)).into_response(),
        Err(e) => {
            error!("Failed to issue join link: {:#}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
