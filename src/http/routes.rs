use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Session lifecycle
        .route("/sessions", post(handlers::join_session))
        .route("/sessions/:session_id", get(handlers::get_session))
        .route("/sessions/:session_id/leave", post(handlers::leave_session))
        // Recording control
        .route(
            "/sessions/:session_id/recording/start",
            post(handlers::start_recording),
        )
        .route(
            "/sessions/:session_id/recording/stop",
            post(handlers::stop_recording),
        )
        .route(
            "/sessions/:session_id/recording",
            get(handlers::get_recording),
        )
        // Join links
        .route(
            "/appointments/:appointment_ref/join-link",
            get(handlers::issue_join_link),
        )
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
