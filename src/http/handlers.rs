use super::state::AppState;
use crate::attendance::{export_filename, records_to_csv, AttendanceStore};
use crate::error::Error;
use crate::gemini::GeminiClient;
use crate::session::{AttendanceSession, SessionConfig, SessionStatus};
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct StartSessionRequest {
    /// Optional session ID (if not provided, generate one)
    pub session_id: Option<String>,

    /// Reference date for the attendance records (default: today)
    pub date: Option<chrono::NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct StartSessionResponse {
    pub session_id: String,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct TranscriptResponse {
    pub session_id: String,
    pub transcript: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(e: &Error) -> (StatusCode, Json<ErrorResponse>) {
    let status = match e {
        Error::IllegalTransition { .. } => StatusCode::CONFLICT,
        Error::PermissionDenied => StatusCode::FORBIDDEN,
        Error::EmptyTranscription => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /sessions/start
/// Create a session and begin recording
pub async fn start_session(
    State(state): State<AppState>,
    Json(req): Json<StartSessionRequest>,
) -> impl IntoResponse {
    let session_id = req
        .session_id
        .unwrap_or_else(|| format!("lista-{}", uuid::Uuid::new_v4()));

    info!("Starting attendance session: {session_id}");

    {
        let sessions = state.sessions.read().await;
        if sessions.contains_key(&session_id) {
            return (
                StatusCode::CONFLICT,
                Json(ErrorResponse {
                    error: format!("Session {session_id} already exists"),
                }),
            )
                .into_response();
        }
    }

    let client = match GeminiClient::from_config(&state.config.gemini) {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to create Gemini client: {e}");
            return error_response(&e).into_response();
        }
    };

    let config = SessionConfig {
        session_id: session_id.clone(),
        reference_date: req.date.unwrap_or_else(|| chrono::Local::now().date_naive()),
        ..SessionConfig::default()
    };

    let store = AttendanceStore::new(&state.config.storage.snapshot_path);
    let session = Arc::new(AttendanceSession::new(config, client, store));

    if let Err(e) = session.start_recording().await {
        error!("Failed to start recording: {e}");
        return error_response(&e).into_response();
    }

    {
        let mut sessions = state.sessions.write().await;
        sessions.insert(session_id.clone(), session);
    }

    (
        StatusCode::OK,
        Json(StartSessionResponse {
            session_id,
            status: "recording".to_string(),
        }),
    )
        .into_response()
}

/// POST /sessions/:session_id/stop
/// Stop recording (the session stays available for transcription)
pub async fn stop_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    with_session(&state, &session_id, |session| async move {
        session.stop_recording().await?;
        Ok(Json(session.status().await).into_response())
    })
    .await
}

/// POST /sessions/:session_id/transcribe
pub async fn transcribe_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    with_session(&state, &session_id, |session| async move {
        let transcript = session.transcribe().await?;
        Ok(Json(TranscriptResponse {
            session_id: session.session_id().to_string(),
            transcript: Some(transcript),
        })
        .into_response())
    })
    .await
}

/// POST /sessions/:session_id/extract
pub async fn extract_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    with_session(&state, &session_id, |session| async move {
        let records = session.extract().await?;
        Ok(Json(records).into_response())
    })
    .await
}

/// POST /sessions/:session_id/reset
pub async fn reset_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    with_session(&state, &session_id, |session| async move {
        session.reset().await?;
        Ok(Json(session.status().await).into_response())
    })
    .await
}

/// GET /sessions/:session_id/status
pub async fn session_status(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    with_session(&state, &session_id, |session| async move {
        let status: SessionStatus = session.status().await;
        Ok(Json(status).into_response())
    })
    .await
}

/// GET /sessions/:session_id/transcript
pub async fn session_transcript(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    with_session(&state, &session_id, |session| async move {
        Ok(Json(TranscriptResponse {
            session_id: session.session_id().to_string(),
            transcript: session.transcript().await,
        })
        .into_response())
    })
    .await
}

/// GET /attendance
/// The persisted attendance list (empty when no snapshot exists)
pub async fn get_attendance(State(state): State<AppState>) -> impl IntoResponse {
    let store = AttendanceStore::new(&state.config.storage.snapshot_path);
    Json(store.load())
}

/// GET /attendance/export
/// CSV download of the persisted attendance list
pub async fn export_attendance(State(state): State<AppState>) -> impl IntoResponse {
    let store = AttendanceStore::new(&state.config.storage.snapshot_path);
    let records = store.load();

    let filename = export_filename(chrono::Local::now().date_naive());
    let csv = records_to_csv(&records);

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        csv,
    )
}

/// GET /health
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

// ============================================================================
// Helpers
// ============================================================================

async fn with_session<F, Fut>(state: &AppState, session_id: &str, f: F) -> axum::response::Response
where
    F: FnOnce(Arc<AttendanceSession>) -> Fut,
    Fut: std::future::Future<Output = Result<axum::response::Response, Error>>,
{
    let session = {
        let sessions = state.sessions.read().await;
        sessions.get(session_id).cloned()
    };

    match session {
        Some(session) => match f(session).await {
            Ok(response) => response,
            Err(e) => {
                error!("Session {session_id}: {e}");
                error_response(&e).into_response()
            }
        },
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("Session {session_id} not found"),
            }),
        )
            .into_response(),
    }
}
