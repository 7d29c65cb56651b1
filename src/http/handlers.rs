use super::state::AppState;
use crate::capture::{create_device, TrackKind};
use crate::error::EngineError;
use crate::recognition::{NatsRecognizer, TranscriptionEngine};
use crate::session::{
    new_session_id, session_channel, SessionCommand, SessionEngine, SessionOptions,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct NotesRequest {
    pub notes: String,
}

#[derive(Debug, Deserialize)]
pub struct TrackRequest {
    pub kind: TrackKind,
    pub enabled: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn engine_error_response(e: EngineError) -> Response {
    let status = match &e {
        EngineError::InvalidCommand { .. } => StatusCode::CONFLICT,
        EngineError::InterviewNotFound(_) | EngineError::SessionNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        EngineError::PermissionDenied => StatusCode::FORBIDDEN,
        EngineError::DeviceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        EngineError::PersistenceFailure(_) => StatusCode::BAD_GATEWAY,
        EngineError::SessionClosed => StatusCode::GONE,
        EngineError::TrackUnsupported(_) => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
        .into_response()
}

fn session_not_found(session_id: &str) -> Response {
    engine_error_response(EngineError::SessionNotFound(session_id.to_string()))
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /interviews/:interview_id/sessions
/// Open a recording session for an interview definition
pub async fn open_session(
    State(state): State<AppState>,
    Path(interview_id): Path<i64>,
) -> impl IntoResponse {
    let session_id = new_session_id();
    info!(
        "Opening session {} for interview {}",
        session_id, interview_id
    );

    let (sink, events) = session_channel();

    let capture = match create_device(
        state.capture.kind,
        state.capture.to_capture_config(),
        sink.clone(),
    ) {
        Ok(device) => device,
        Err(e) => {
            error!("Failed to create capture device: {}", e);
            return engine_error_response(e);
        }
    };

    // A missing recognizer is not fatal: the session records without
    // transcription and reports recognition_disabled in status.
    let recognizer: Option<Arc<dyn TranscriptionEngine>> = if state.recognition.enabled {
        match NatsRecognizer::connect(
            &state.recognition.url,
            session_id.clone(),
            state.recognition.language.clone(),
            sink.clone(),
        )
        .await
        {
            Ok(recognizer) => Some(Arc::new(recognizer)),
            Err(e) => {
                warn!("Recognition unavailable for session {}: {}", session_id, e);
                None
            }
        }
    } else {
        None
    };

    let options = SessionOptions {
        artifact_dir: state.capture.artifact_dir.clone().map(PathBuf::from),
        ..SessionOptions::default()
    };

    match SessionEngine::open(
        session_id.clone(),
        interview_id,
        capture,
        recognizer,
        Arc::clone(&state.store),
        sink,
        events,
        options,
    )
    .await
    {
        Ok(handle) => {
            let snapshot = match handle.status().await {
                Ok(snapshot) => snapshot,
                Err(e) => return engine_error_response(e),
            };
            state
                .sessions
                .write()
                .await
                .insert(session_id.clone(), handle);
            info!("Session {} open", session_id);
            (StatusCode::CREATED, Json(snapshot)).into_response()
        }
        Err(e) => {
            error!("Failed to open session {}: {}", session_id, e);
            engine_error_response(e)
        }
    }
}

/// Send one command to a session and reply with the resulting snapshot.
/// Sessions that reach a terminal state are dropped from the registry.
async fn run_command(state: &AppState, session_id: &str, command: SessionCommand) -> Response {
    let handle = { state.sessions.read().await.get(session_id).cloned() };
    let Some(handle) = handle else {
        return session_not_found(session_id);
    };

    match handle.command(command).await {
        Ok(snapshot) => {
            if snapshot.state == "complete" || snapshot.state == "abandoned" {
                state.sessions.write().await.remove(session_id);
            }
            (StatusCode::OK, Json(snapshot)).into_response()
        }
        Err(e) => engine_error_response(e),
    }
}

/// POST /sessions/:session_id/test/start
pub async fn device_test_start(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    run_command(&state, &session_id, SessionCommand::DeviceTestStart).await
}

/// POST /sessions/:session_id/test/stop
pub async fn device_test_stop(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    run_command(&state, &session_id, SessionCommand::DeviceTestStop).await
}

/// POST /sessions/:session_id/start
pub async fn start_interview(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    run_command(&state, &session_id, SessionCommand::StartInterview).await
}

/// POST /sessions/:session_id/record/start
pub async fn start_recording(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    run_command(&state, &session_id, SessionCommand::StartRecording).await
}

/// POST /sessions/:session_id/record/stop
pub async fn stop_recording(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    run_command(&state, &session_id, SessionCommand::StopRecording).await
}

/// POST /sessions/:session_id/next
pub async fn next_question(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    run_command(&state, &session_id, SessionCommand::Next).await
}

/// POST /sessions/:session_id/retest
pub async fn retest(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    run_command(&state, &session_id, SessionCommand::Retest).await
}

/// POST /sessions/:session_id/finish
pub async fn finish(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    run_command(&state, &session_id, SessionCommand::Finish).await
}

/// POST /sessions/:session_id/abandon
pub async fn abandon(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    run_command(&state, &session_id, SessionCommand::Abandon).await
}

/// PUT /sessions/:session_id/notes
pub async fn update_notes(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(req): Json<NotesRequest>,
) -> impl IntoResponse {
    run_command(&state, &session_id, SessionCommand::UpdateNotes(req.notes)).await
}

/// PUT /sessions/:session_id/tracks
pub async fn set_track(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(req): Json<TrackRequest>,
) -> impl IntoResponse {
    run_command(
        &state,
        &session_id,
        SessionCommand::SetTrackEnabled(req.kind, req.enabled),
    )
    .await
}

/// GET /sessions/:session_id/status
pub async fn get_status(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    let handle = { state.sessions.read().await.get(&session_id).cloned() };
    match handle {
        Some(handle) => match handle.status().await {
            Ok(snapshot) => (StatusCode::OK, Json(snapshot)).into_response(),
            Err(e) => engine_error_response(e),
        },
        None => session_not_found(&session_id),
    }
}

/// GET /sessions/:session_id/transcript
pub async fn get_transcript(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    let handle = { state.sessions.read().await.get(&session_id).cloned() };
    match handle {
        Some(handle) => match handle.transcript().await {
            Ok(transcript) => (StatusCode::OK, Json(transcript)).into_response(),
            Err(e) => engine_error_response(e),
        },
        None => session_not_found(&session_id),
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
