use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::messages::{StartRecordingRequest, StopRecordingRequest};
use super::service::RecordingService;
use crate::error::{Result, SessionError};
use crate::session::{SessionState, SessionView};

/// Lifecycle of one recording attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordingStatus {
    NotStarted,
    Starting,
    Active,
    Stopping,
    Stopped,
    Failed,
}

/// One start-to-stop recording attempt, tied to exactly one session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recording {
    /// Local id for this attempt
    pub id: String,
    pub session_id: String,
    pub recording_ref: Option<String>,
    pub composition_ref: Option<String>,
    /// Room the service recorded; the session id until the service reports one
    pub room_ref: String,
    pub status: RecordingStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub stopped_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl Recording {
    fn new(session_id: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            recording_ref: None,
            composition_ref: None,
            room_ref: session_id.to_string(),
            status: RecordingStatus::NotStarted,
            started_at: None,
            stopped_at: None,
            last_error: None,
        }
    }

    /// Starting or Active
    pub fn is_in_progress(&self) -> bool {
        matches!(self.status, RecordingStatus::Starting | RecordingStatus::Active)
    }

    /// Active, or Failed while stopping (refs are kept so stop can be retried)
    pub fn can_stop(&self) -> bool {
        match self.status {
            RecordingStatus::Active => true,
            RecordingStatus::Failed => self.recording_ref.is_some() && self.composition_ref.is_some(),
            _ => false,
        }
    }

    /// The service may still be recording: in progress, stopping, or a
    /// failed stop that still has to be retried
    pub fn blocks_new_start(&self) -> bool {
        self.is_in_progress() || self.status == RecordingStatus::Stopping || self.can_stop()
    }
}

/// Drives recording start/stop against the orchestration service.
///
/// Recordings are keyed by session id; at most one per session is Starting or
/// Active. The coordinator does not poll for completion.
pub struct RecordingCoordinator {
    service: Arc<dyn RecordingService>,
    recordings: Mutex<HashMap<String, Recording>>,
}

impl RecordingCoordinator {
    pub fn new(service: Arc<dyn RecordingService>) -> Self {
        Self {
            service,
            recordings: Mutex::new(HashMap::new()),
        }
    }

    /// Latest recording attempt for a session
    pub fn current(&self, session_id: &str) -> Option<Recording> {
        self.recordings.lock().get(session_id).cloned()
    }

    pub async fn start(&self, session: &(dyn SessionView + Sync), min_participants: usize) -> Result<Recording> {
        let session_id = session.session_id();

        if session.state() != SessionState::Active {
            return Err(SessionError::Precondition(format!(
                "session {} is {:?}, not active",
                session_id,
                session.state()
            )));
        }
        let count = session.participant_count();
        if count < min_participants {
            return Err(SessionError::Precondition(format!(
                "{} participant(s) present, {} required",
                count, min_participants
            )));
        }

        let pending = {
            let mut recordings = self.recordings.lock();
            if recordings.get(session_id).is_some_and(Recording::blocks_new_start) {
                warn!("Recording for {} has not been stopped", session_id);
                return Err(SessionError::RecordingAlreadyActive(session_id.to_string()));
            }
            let mut recording = Recording::new(session_id);
            recording.status = RecordingStatus::Starting;
            recordings.insert(session_id.to_string(), recording.clone());
            recording
        };

        info!("Starting recording {} for {}", pending.id, session_id);

        let request = StartRecordingRequest {
            room_ref: session_id.to_string(),
            identity: session.local_identity().to_string(),
            appointment_ref: session.appointment_ref().to_string(),
        };

        match self.service.start(request).await {
            Ok(response) => {
                info!(
                    "Recording {} active (recording={}, composition={}, service status={})",
                    pending.id, response.recording_ref, response.composition_ref, response.status
                );
                Ok(self.update(&pending, |r| {
                    r.status = RecordingStatus::Active;
                    r.recording_ref = Some(response.recording_ref);
                    r.composition_ref = Some(response.composition_ref);
                    if let Some(room_ref) = response.room_ref {
                        r.room_ref = room_ref;
                    }
                    r.started_at = Some(Utc::now());
                }))
            }
            Err(e) => {
                error!("Recording start failed for {}: {}", session_id, e);
                self.update(&pending, |r| {
                    r.status = RecordingStatus::Failed;
                    r.last_error = Some(e.to_string());
                });
                Err(e)
            }
        }
    }

    pub async fn stop(&self, recording: &Recording) -> Result<Recording> {
        let current = {
            let mut recordings = self.recordings.lock();
            let entry = recordings
                .get_mut(&recording.session_id)
                .filter(|r| r.id == recording.id);

            match entry {
                Some(r) if r.can_stop() => {
                    r.status = RecordingStatus::Stopping;
                    r.clone()
                }
                Some(r) => return Err(SessionError::NoActiveRecording(r.status)),
                None => return Err(SessionError::NoActiveRecording(recording.status)),
            }
        };

        // can_stop guarantees both refs
        let (Some(recording_ref), Some(composition_ref)) =
            (current.recording_ref.clone(), current.composition_ref.clone())
        else {
            return Err(SessionError::NoActiveRecording(current.status));
        };

        info!("Stopping recording {} ({})", current.id, recording_ref);

        let request = StopRecordingRequest {
            composition_ref,
            recording_ref,
            room_ref: current.room_ref.clone(),
        };

        match self.service.stop(request).await {
            Ok(response) => {
                info!("Recording {} stopped (service status={})", current.id, response.status);
                Ok(self.update(&current, |r| {
                    r.status = RecordingStatus::Stopped;
                    r.stopped_at = Some(Utc::now());
                    r.last_error = None;
                }))
            }
            Err(e) => {
                error!("Recording stop failed for {}: {}", current.id, e);
                self.update(&current, |r| {
                    r.status = RecordingStatus::Failed;
                    r.last_error = Some(e.to_string());
                });
                Err(e)
            }
        }
    }

    /// Apply `f` to the stored attempt if it is still `target`
    fn update(&self, target: &Recording, f: impl FnOnce(&mut Recording)) -> Recording {
        let mut recordings = self.recordings.lock();
        match recordings.get_mut(&target.session_id) {
            Some(r) if r.id == target.id => {
                f(r);
                r.clone()
            }
            _ => {
                let mut detached = target.clone();
                f(&mut detached);
                detached
            }
        }
    }
}
