use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::media::MediaConstraints;

/// Configuration for one media session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Appointment this call belongs to
    pub appointment_ref: String,

    /// Room / session identifier, derived from the appointment
    pub session_id: String,

    /// Local participant identity, unique per participant per session
    pub local_identity: String,

    /// Constraints passed to the local media factory
    pub constraints: MediaConstraints,

    /// Token request attempts per join (minimum 1)
    pub token_attempts: u32,

    /// Pause between token attempts
    pub token_retry_backoff: Duration,
}

impl SessionConfig {
    pub fn for_appointment(appointment_ref: &str, display_name: &str) -> Self {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        Self {
            appointment_ref: appointment_ref.to_string(),
            session_id: session_id_for(appointment_ref),
            local_identity: format!("{}-{}", display_name, &suffix[..8]),
            constraints: MediaConstraints::default(),
            token_attempts: 1,
            token_retry_backoff: Duration::from_millis(250),
        }
    }

    pub fn with_constraints(mut self, constraints: MediaConstraints) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn with_token_retry(mut self, attempts: u32, backoff: Duration) -> Self {
        self.token_attempts = attempts;
        self.token_retry_backoff = backoff;
        self
    }
}

/// Room name used for an appointment
pub fn session_id_for(appointment_ref: &str) -> String {
    format!("appointment-{}", appointment_ref)
}
