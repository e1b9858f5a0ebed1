use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Session control (staged pipeline)
        .route("/sessions/start", post(handlers::start_session))
        .route("/sessions/:session_id/stop", post(handlers::stop_session))
        .route(
            "/sessions/:session_id/transcribe",
            post(handlers::transcribe_session),
        )
        .route(
            "/sessions/:session_id/extract",
            post(handlers::extract_session),
        )
        .route("/sessions/:session_id/reset", post(handlers::reset_session))
        // Session queries
        .route(
            "/sessions/:session_id/status",
            get(handlers::session_status),
        )
        .route(
            "/sessions/:session_id/transcript",
            get(handlers::session_transcript),
        )
        // Attendance list and CSV export
        .route("/attendance", get(handlers::get_attendance))
        .route("/attendance/export", get(handlers::export_attendance))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
