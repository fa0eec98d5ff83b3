use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::config::SessionConfig;
use super::state::{SessionNotice, SessionSnapshot, SessionState, SessionView};
use crate::error::{Result, SessionError};
use crate::media::{LocalTracks, MediaFactory};
use crate::participants::ParticipantRegistry;
use crate::token::{Credential, TokenClient};
use crate::transport::{MediaTransport, TransportConnection, TransportEvent};

const NOTICE_BUFFER: usize = 64;

/// External collaborators of a session, injected per session
#[derive(Clone)]
pub struct SessionDeps {
    pub token_client: Arc<dyn TokenClient>,
    pub media: Arc<dyn MediaFactory>,
    pub transport: Arc<dyn MediaTransport>,
}

/// Owns the join/leave lifecycle of one media session.
///
/// Every join bumps a generation counter and so does every teardown. Work
/// that resumes after an await (a join step, a transport event) first checks
/// that its generation is still current; if not, it releases what it holds
/// and stops instead of touching session state.
pub struct SessionController {
    shared: Arc<Shared>,
}

struct Shared {
    config: SessionConfig,
    deps: SessionDeps,
    inner: Mutex<Inner>,
    registry: Mutex<ParticipantRegistry>,
    notices: broadcast::Sender<SessionNotice>,
}

#[derive(Default)]
struct Inner {
    state: SessionState,
    generation: u64,
    tracks: Option<LocalTracks>,
    connection: Option<Arc<dyn TransportConnection>>,
    event_task: Option<JoinHandle<()>>,
}

impl SessionController {
    pub fn new(config: SessionConfig, deps: SessionDeps) -> Self {
        info!("Creating media session: {}", config.session_id);

        let (notices, _) = broadcast::channel(NOTICE_BUFFER);
        Self {
            shared: Arc::new(Shared {
                config,
                deps,
                inner: Mutex::new(Inner::default()),
                registry: Mutex::new(ParticipantRegistry::new()),
                notices,
            }),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.shared.config
    }

    /// Subscribe to session notices
    pub fn subscribe(&self) -> broadcast::Receiver<SessionNotice> {
        self.shared.notices.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.shared.inner.lock().state;
        let participants = self.shared.registry.lock().participants();
        SessionSnapshot {
            session_id: self.shared.config.session_id.clone(),
            appointment_ref: self.shared.config.appointment_ref.clone(),
            local_identity: self.shared.config.local_identity.clone(),
            state,
            participant_count: participants.len(),
            participants,
        }
    }

    /// Join the room.
    ///
    /// Allowed from `Idle` and `Terminated`. A failed step leaves the session
    /// in `Failed` with nothing held; a concurrent `leave()` makes this return
    /// `SessionError::Cancelled` after releasing whatever was acquired.
    pub async fn join(&self) -> Result<()> {
        let shared = &self.shared;
        let config = &shared.config;

        let generation = {
            let mut inner = shared.inner.lock();
            match inner.state {
                SessionState::Idle | SessionState::Terminated => {}
                other => {
                    warn!("Join rejected for {} in state {:?}", config.session_id, other);
                    return Err(SessionError::InvalidState(other));
                }
            }
            inner.generation += 1;
            shared.transition(&mut inner, SessionState::Connecting);
            shared.registry.lock().clear();
            inner.generation
        };

        info!("Joining {} as {}", config.session_id, config.local_identity);

        let credential = match self.request_token(generation).await {
            Ok(credential) => credential,
            Err(e) => {
                shared.fail(generation, &e);
                return Err(e);
            }
        };
        shared.ensure_current(generation)?;

        debug!("Acquiring local tracks via {} factory", shared.deps.media.name());
        let tracks = match shared.deps.media.acquire_tracks(&config.constraints).await {
            Ok(tracks) => tracks,
            Err(e) => {
                drop(credential);
                shared.fail(generation, &e);
                return Err(e);
            }
        };
        if !shared.is_current(generation) {
            tracks.release_all();
            return Err(SessionError::Cancelled);
        }

        let connection = match shared
            .deps
            .transport
            .connect(&credential, &tracks, &config.session_id)
            .await
        {
            Ok(connection) => connection,
            Err(e) => {
                tracks.release_all();
                shared.fail(generation, &e);
                return Err(e);
            }
        };
        if !shared.is_current(generation) {
            Shared::teardown(shared, Some(connection), Some(tracks)).await;
            return Err(SessionError::Cancelled);
        }

        // Listener first, then whoever was already in the room. Both feed the
        // same idempotent path so nobody is missed or counted twice.
        let events = connection.subscribe();
        for participant in connection.participants() {
            shared.apply_event(generation, TransportEvent::ParticipantConnected { participant });
        }

        let leftover = {
            let mut inner = shared.inner.lock();
            if inner.generation == generation && inner.state == SessionState::Connecting {
                inner.tracks = Some(tracks);
                inner.connection = Some(Arc::clone(&connection));
                inner.event_task = Some(tokio::spawn(Shared::run_events(
                    Arc::clone(shared),
                    generation,
                    events,
                )));
                shared.transition(&mut inner, SessionState::Active);
                None
            } else {
                Some(tracks)
            }
        };

        if let Some(tracks) = leftover {
            Shared::teardown(shared, Some(connection), Some(tracks)).await;
            return Err(SessionError::Cancelled);
        }

        info!("Session {} active", config.session_id);
        Ok(())
    }

    /// Leave the room. Idempotent and infallible; always ends in `Terminated`
    /// unless a teardown is already under way.
    pub async fn leave(&self) {
        let shared = &self.shared;

        let (connection, tracks, event_task) = {
            let mut inner = shared.inner.lock();
            match inner.state {
                SessionState::Disconnecting | SessionState::Terminated => {
                    debug!("Leave ignored for {}: {:?}", shared.config.session_id, inner.state);
                    return;
                }
                _ => {}
            }
            inner.generation += 1;
            shared.transition(&mut inner, SessionState::Disconnecting);
            (inner.connection.take(), inner.tracks.take(), inner.event_task.take())
        };

        info!("Leaving session {}", shared.config.session_id);

        Shared::teardown(shared, connection, tracks).await;
        if let Some(task) = event_task {
            task.abort();
        }

        // Still Disconnecting here, so no newer join can own the registry yet
        let mut inner = shared.inner.lock();
        shared.registry.lock().clear();
        shared.transition(&mut inner, SessionState::Terminated);
    }

    async fn request_token(&self, generation: u64) -> Result<Credential> {
        let shared = &self.shared;
        let config = &shared.config;
        let attempts = config.token_attempts.max(1);
        let mut attempt = 1;

        loop {
            match shared
                .deps
                .token_client
                .request_token(&config.local_identity, &config.session_id)
                .await
            {
                Ok(credential) => return Ok(credential),
                Err(e)
                    if e.is_retryable_token_error()
                        && attempt < attempts
                        && shared.is_current(generation) =>
                {
                    warn!("Token attempt {}/{} failed: {}", attempt, attempts, e);
                    tokio::time::sleep(config.token_retry_backoff).await;
                    attempt += 1;
                }
                Err(e) => {
                    error!("Token request failed for {}: {}", config.session_id, e);
                    return Err(e);
                }
            }
        }
    }
}

impl Shared {
    fn transition(&self, inner: &mut Inner, to: SessionState) {
        let from = inner.state;
        if from == to {
            return;
        }
        inner.state = to;
        info!("Session {}: {:?} -> {:?}", self.config.session_id, from, to);
        let _ = self.notices.send(SessionNotice::StateChanged { from, to });
    }

    fn is_current(&self, generation: u64) -> bool {
        self.inner.lock().generation == generation
    }

    fn ensure_current(&self, generation: u64) -> Result<()> {
        if self.is_current(generation) {
            Ok(())
        } else {
            info!("Join for {} superseded by leave", self.config.session_id);
            Err(SessionError::Cancelled)
        }
    }

    /// Mark a join step failure, unless the join was already superseded
    fn fail(&self, generation: u64, err: &SessionError) {
        let mut inner = self.inner.lock();
        if inner.generation == generation && inner.state == SessionState::Connecting {
            error!("Join failed for {}: {}", self.config.session_id, err);
            self.transition(&mut inner, SessionState::Failed);
        }
    }

    /// Disconnect and release tracks.
    ///
    /// Tracks are owned here, so they are released on every exit path,
    /// including a panicking disconnect. The registry is left alone: a
    /// superseded join tears down through here and must not touch the
    /// participants of the join that replaced it.
    async fn teardown(
        shared: &Arc<Shared>,
        connection: Option<Arc<dyn TransportConnection>>,
        tracks: Option<LocalTracks>,
    ) {
        if let Some(connection) = connection {
            if let Err(e) = connection.disconnect().await {
                warn!("Disconnect failed for {}: {}", shared.config.session_id, e);
            }
        }
        if let Some(tracks) = tracks {
            tracks.release_all();
        }
    }

    fn apply_event(&self, generation: u64, event: TransportEvent) {
        let notice = {
            // Lock order: inner, then registry. Holding inner keeps a leave or
            // rejoin from slipping in between the check and the update.
            let inner = self.inner.lock();
            if inner.generation != generation {
                debug!("Discarding stale transport event: {:?}", event);
                return;
            }
            let mut registry = self.registry.lock();
            match event {
                TransportEvent::ParticipantConnected { participant } => {
                    let notice = SessionNotice::ParticipantJoined {
                        participant_id: participant.participant_id.clone(),
                        identity: participant.identity.clone(),
                    };
                    registry.on_participant_connected(participant).then_some(notice)
                }
                TransportEvent::ParticipantDisconnected { participant_id } => registry
                    .on_participant_disconnected(&participant_id)
                    .then_some(SessionNotice::ParticipantLeft { participant_id }),
                TransportEvent::TrackSubscribed {
                    participant_id,
                    kind,
                    track_id,
                } => {
                    registry.on_track_subscribed(&participant_id, kind, &track_id);
                    None
                }
                TransportEvent::TrackUnsubscribed { participant_id, kind } => {
                    registry.on_track_unsubscribed(&participant_id, kind);
                    None
                }
                TransportEvent::Disconnected { .. } => None,
            }
        };

        if let Some(notice) = notice {
            debug!("Session {}: {:?}", self.config.session_id, notice);
            let _ = self.notices.send(notice);
        }
    }

    async fn run_events(shared: Arc<Shared>, generation: u64, mut events: mpsc::Receiver<TransportEvent>) {
        debug!("Event task started for {}", shared.config.session_id);

        while let Some(event) = events.recv().await {
            if !shared.is_current(generation) {
                debug!("Session generation moved on, dropping transport events");
                break;
            }
            match event {
                TransportEvent::Disconnected { reason, error } => {
                    Shared::remote_teardown(&shared, generation, reason, error).await;
                    break;
                }
                other => shared.apply_event(generation, other),
            }
        }

        debug!("Event task stopped for {}", shared.config.session_id);
    }

    /// Teardown triggered by the transport reporting `disconnected`
    async fn remote_teardown(shared: &Arc<Shared>, generation: u64, reason: String, error: Option<String>) {
        let (connection, tracks) = {
            let mut inner = shared.inner.lock();
            if inner.generation != generation || inner.state != SessionState::Active {
                return;
            }
            inner.generation += 1;
            shared.transition(&mut inner, SessionState::Disconnecting);
            // This task is the event task; dropping its handle detaches it
            inner.event_task.take();
            (inner.connection.take(), inner.tracks.take())
        };

        match &error {
            Some(err) => error!("Transport failed for {}: {} ({})", shared.config.session_id, reason, err),
            None => info!("Remote ended session {}: {}", shared.config.session_id, reason),
        }

        Shared::teardown(shared, connection, tracks).await;

        {
            let mut inner = shared.inner.lock();
            shared.registry.lock().clear();
            shared.transition(&mut inner, SessionState::Terminated);
        }

        let notice = match error {
            Some(error) => SessionNotice::TransportFailed { reason, error },
            None => SessionNotice::RemoteDisconnected { reason },
        };
        let _ = shared.notices.send(notice);
    }
}

impl SessionView for SessionController {
    fn session_id(&self) -> &str {
        &self.shared.config.session_id
    }

    fn appointment_ref(&self) -> &str {
        &self.shared.config.appointment_ref
    }

    fn local_identity(&self) -> &str {
        &self.shared.config.local_identity
    }

    fn state(&self) -> SessionState {
        self.shared.inner.lock().state
    }

    fn participant_count(&self) -> usize {
        self.shared.registry.lock().count()
    }
}
