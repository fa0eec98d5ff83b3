use serde::{Deserialize, Serialize};

use crate::participants::Participant;

/// Lifecycle state of a media session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Idle,
    Connecting,
    Active,
    Disconnecting,
    Terminated,
    Failed,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::Idle
    }
}

/// Notifications broadcast by a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionNotice {
    StateChanged {
        from: SessionState,
        to: SessionState,
    },
    ParticipantJoined {
        participant_id: String,
        identity: String,
    },
    ParticipantLeft {
        participant_id: String,
    },
    /// The room ended on the remote side. Not an application error.
    RemoteDisconnected {
        reason: String,
    },
    /// The transport dropped with an error; the session has been torn down.
    TransportFailed {
        reason: String,
        error: String,
    },
}

/// Point-in-time view of a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub appointment_ref: String,
    pub local_identity: String,
    pub state: SessionState,
    pub participant_count: usize,
    pub participants: Vec<Participant>,
}

/// What the recording coordinator needs to know about a session
pub trait SessionView {
    fn session_id(&self) -> &str;
    fn appointment_ref(&self) -> &str;
    fn local_identity(&self) -> &str;
    fn state(&self) -> SessionState;
    fn participant_count(&self) -> usize;
}

impl SessionView for SessionSnapshot {
    fn session_id(&self) -> &str {
        &self.session_id
    }

    fn appointment_ref(&self) -> &str {
        &self.appointment_ref
    }

    fn local_identity(&self) -> &str {
        &self.local_identity
    }

    fn state(&self) -> SessionState {
        self.state
    }

    fn participant_count(&self) -> usize {
        self.participant_count
    }
}
