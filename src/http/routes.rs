use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Session lifecycle
        .route(
            "/interviews/:interview_id/sessions",
            post(handlers::open_session),
        )
        .route(
            "/sessions/:session_id/test/start",
            post(handlers::device_test_start),
        )
        .route(
            "/sessions/:session_id/test/stop",
            post(handlers::device_test_stop),
        )
        .route("/sessions/:session_id/start", post(handlers::start_interview))
        .route(
            "/sessions/:session_id/record/start",
            post(handlers::start_recording),
        )
        .route(
            "/sessions/:session_id/record/stop",
            post(handlers::stop_recording),
        )
        .route("/sessions/:session_id/next", post(handlers::next_question))
        .route("/sessions/:session_id/retest", post(handlers::retest))
        .route("/sessions/:session_id/finish", post(handlers::finish))
        .route("/sessions/:session_id/abandon", post(handlers::abandon))
        // Session mutation
        .route("/sessions/:session_id/notes", put(handlers::update_notes))
        .route("/sessions/:session_id/tracks", put(handlers::set_track))
        // Session queries
        .route("/sessions/:session_id/status", get(handlers::get_status))
        .route(
            "/sessions/:session_id/transcript",
            get(handlers::get_transcript),
        )
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
