//! HTTP API used by the portal UI
//!
//! - POST /sessions - Join an appointment's call
//! - GET /sessions/:id - Session snapshot
//! - POST /sessions/:id/leave - Leave the call
//! - POST /sessions/:id/recording/start - Start recording
//! - POST /sessions/:id/recording/stop - Stop recording
//! - GET /sessions/:id/recording - Latest recording attempt
//! - GET /appointments/:ref/join-link - Issue a join link
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::{AppState, SessionDefaults};
