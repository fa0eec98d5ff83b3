//! Error types for the media session subsystem

use thiserror::Error;

use crate::recording::RecordingStatus;
use crate::session::SessionState;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Token request failed: {message}")]
    TokenRequest {
        message: String,
        /// Network failure or 5xx; the controller may try again
        retryable: bool,
    },

    #[error("Media acquisition failed: {0}")]
    MediaAcquisition(String),

    #[error("Transport connect failed: {0}")]
    TransportConnect(String),

    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("A recording is already active for session {0}")]
    RecordingAlreadyActive(String),

    #[error("No active recording (status: {0:?})")]
    NoActiveRecording(RecordingStatus),

    #[error("Recording service error ({status}): {body}")]
    RecordingService {
        /// HTTP status, or 0 when the request never got a response
        status: u16,
        body: String,
    },

    #[error("Operation not allowed in state {0:?}")]
    InvalidState(SessionState),

    #[error("Join cancelled by leave")]
    Cancelled,
}

impl SessionError {
    pub fn token(message: impl Into<String>, retryable: bool) -> Self {
        Self::TokenRequest {
            message: message.into(),
            retryable,
        }
    }

    pub fn is_retryable_token_error(&self) -> bool {
        matches!(self, Self::TokenRequest { retryable: true, .. })
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
