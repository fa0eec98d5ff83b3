// Test doubles for the session's external collaborators
//
// Each fake counts its calls so tests can assert which steps ran.

#![allow(dead_code)]

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use telehealth_session::recording::{
    StartRecordingRequest, StartRecordingResponse, StopRecordingRequest, StopRecordingResponse,
};
use telehealth_session::{
    Credential, DeviceHandle, LocalTrack, LocalTracks, MediaConstraints, MediaFactory,
    MediaTransport, RecordingService, RemoteParticipant, SessionConfig, SessionDeps, SessionError,
    SessionNotice, TokenClient, TrackKind, TransportConnection, TransportEvent,
};
use tokio::sync::{broadcast, mpsc, Notify};

// ============================================================================
// Token client
// ============================================================================

#[derive(Debug, Clone, Copy)]
pub enum TokenMode {
    Ok,
    /// HTTP 500 from the token service
    ServerError,
    /// HTTP 403 from the token service
    Rejected,
}

pub struct FakeTokenClient {
    pub calls: AtomicUsize,
    mode: TokenMode,
    /// When set, each request waits for a permit before answering
    gate: Option<Arc<Notify>>,
}

impl FakeTokenClient {
    pub fn new(mode: TokenMode) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            mode,
            gate: None,
        }
    }

    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl TokenClient for FakeTokenClient {
    async fn request_token(&self, identity: &str, session_id: &str) -> telehealth_session::Result<Credential> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        match self.mode {
            TokenMode::Ok => Ok(Credential {
                token: "jwt-token".to_string(),
                identity: identity.to_string(),
                room_name: session_id.to_string(),
                expires_at: None,
            }),
            TokenMode::ServerError => Err(SessionError::token("internal error", true)),
            TokenMode::Rejected => Err(SessionError::token("not allowed", false)),
        }
    }
}

// ============================================================================
// Media factory
// ============================================================================

struct CountingHandle(Arc<AtomicUsize>);

impl DeviceHandle for CountingHandle {
    fn close(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct FakeMediaFactory {
    pub calls: AtomicUsize,
    fail: bool,
    /// Close counter per handed-out track
    handles: Mutex<Vec<Arc<AtomicUsize>>>,
    /// When set, acquisition waits for a permit after opening the tracks
    gate: Option<Arc<Notify>>,
}

impl FakeMediaFactory {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: false,
            handles: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn tracks_acquired(&self) -> usize {
        self.handles.lock().len()
    }

    pub fn close_counts(&self) -> Vec<usize> {
        self.handles
            .lock()
            .iter()
            .map(|c| c.load(Ordering::SeqCst))
            .collect()
    }

    /// Every acquired track has been released exactly once
    pub fn all_released_once(&self) -> bool {
        self.close_counts().iter().all(|&c| c == 1)
    }

    /// No acquired track has been released yet
    pub fn none_released(&self) -> bool {
        self.close_counts().iter().all(|&c| c == 0)
    }

    fn track(&self, kind: TrackKind) -> LocalTrack {
        let counter = Arc::new(AtomicUsize::new(0));
        self.handles.lock().push(Arc::clone(&counter));
        LocalTrack::new(kind, format!("fake {}", kind), Box::new(CountingHandle(counter)))
    }
}

#[async_trait::async_trait]
impl MediaFactory for FakeMediaFactory {
    async fn acquire_tracks(&self, _constraints: &MediaConstraints) -> telehealth_session::Result<LocalTracks> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(SessionError::MediaAcquisition("permission denied".to_string()));
        }
        let tracks = LocalTracks {
            audio: self.track(TrackKind::Audio),
            video: self.track(TrackKind::Video),
        };
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        Ok(tracks)
    }

    fn name(&self) -> &str {
        "fake"
    }
}

// ============================================================================
// Transport
// ============================================================================

pub struct FakeConnection {
    listeners: Mutex<Vec<mpsc::Sender<TransportEvent>>>,
    present: Vec<RemoteParticipant>,
    /// Delivered to each listener as soon as it subscribes
    queued: Vec<TransportEvent>,
    pub disconnects: AtomicUsize,
    /// Order in which the controller touched the connection
    pub calls: Mutex<Vec<&'static str>>,
}

impl FakeConnection {
    pub async fn emit(&self, event: TransportEvent) {
        let listeners: Vec<_> = self.listeners.lock().clone();
        for listener in listeners {
            let _ = listener.send(event.clone()).await;
        }
    }

    pub fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl TransportConnection for FakeConnection {
    fn subscribe(&self) -> mpsc::Receiver<TransportEvent> {
        self.calls.lock().push("subscribe");
        let (tx, rx) = mpsc::channel(100);
        for event in &self.queued {
            let _ = tx.try_send(event.clone());
        }
        self.listeners.lock().push(tx);
        rx
    }

    fn participants(&self) -> Vec<RemoteParticipant> {
        self.calls.lock().push("participants");
        self.present.clone()
    }

    async fn disconnect(&self) -> telehealth_session::Result<()> {
        self.calls.lock().push("disconnect");
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        self.listeners.lock().clear();
        Ok(())
    }
}

pub struct FakeTransport {
    pub connects: AtomicUsize,
    fail: bool,
    present: Vec<RemoteParticipant>,
    queued: Vec<TransportEvent>,
    /// When set, connect waits for a permit before completing
    gate: Option<Arc<Notify>>,
    /// Number of leading connects that wait on the gate
    gated_connects: usize,
    opened: Mutex<Vec<Arc<FakeConnection>>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self {
            connects: AtomicUsize::new(0),
            fail: false,
            present: Vec::new(),
            queued: Vec::new(),
            gate: None,
            gated_connects: 0,
            opened: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn with_participants(mut self, ids: &[&str]) -> Self {
        self.present = ids.iter().map(|id| remote(id)).collect();
        self
    }

    pub fn with_queued_events(mut self, events: Vec<TransportEvent>) -> Self {
        self.queued = events;
        self
    }

    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self.gated_connects = usize::MAX;
        self
    }

    /// Only the first connect waits on the gate
    pub fn gated_first(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self.gated_connects = 1;
        self
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Most recently opened connection
    pub fn connection(&self) -> Arc<FakeConnection> {
        self.opened.lock().last().cloned().expect("no connection opened")
    }

    /// Connections in the order they were opened
    pub fn connections(&self) -> Vec<Arc<FakeConnection>> {
        self.opened.lock().clone()
    }
}

#[async_trait::async_trait]
impl MediaTransport for FakeTransport {
    async fn connect(
        &self,
        _credential: &Credential,
        _tracks: &LocalTracks,
        _room_name: &str,
    ) -> telehealth_session::Result<Arc<dyn TransportConnection>> {
        let previous = self.connects.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            if previous < self.gated_connects {
                gate.notified().await;
            }
        }
        if self.fail {
            return Err(SessionError::TransportConnect("room not found".to_string()));
        }

        let connection = Arc::new(FakeConnection {
            listeners: Mutex::new(Vec::new()),
            present: self.present.clone(),
            queued: self.queued.clone(),
            disconnects: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        });
        self.opened.lock().push(Arc::clone(&connection));
        Ok(connection)
    }
}

// ============================================================================
// Recording service
// ============================================================================

pub struct FakeRecordingService {
    pub starts: AtomicUsize,
    pub stops: AtomicUsize,
    start_results: Mutex<VecDeque<telehealth_session::Result<StartRecordingResponse>>>,
    stop_results: Mutex<VecDeque<telehealth_session::Result<StopRecordingResponse>>>,
    gate: Option<Arc<Notify>>,
    pub last_start: Mutex<Option<StartRecordingRequest>>,
    pub last_stop: Mutex<Option<StopRecordingRequest>>,
}

impl FakeRecordingService {
    pub fn new() -> Self {
        Self {
            starts: AtomicUsize::new(0),
            stops: AtomicUsize::new(0),
            start_results: Mutex::new(VecDeque::new()),
            stop_results: Mutex::new(VecDeque::new()),
            gate: None,
            last_start: Mutex::new(None),
            last_stop: Mutex::new(None),
        }
    }

    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn push_start(&self, result: telehealth_session::Result<StartRecordingResponse>) {
        self.start_results.lock().push_back(result);
    }

    pub fn push_stop(&self, result: telehealth_session::Result<StopRecordingResponse>) {
        self.stop_results.lock().push_back(result);
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

pub fn active_response() -> StartRecordingResponse {
    StartRecordingResponse {
        composition_ref: "C1".to_string(),
        recording_ref: "R1".to_string(),
        status: "Active".to_string(),
        room_ref: Some("appointment-A1".to_string()),
    }
}

pub fn stopped_response() -> StopRecordingResponse {
    StopRecordingResponse {
        status: "stopped".to_string(),
        extra: serde_json::Map::new(),
    }
}

pub fn service_error(status: u16) -> SessionError {
    SessionError::RecordingService {
        status,
        body: "upstream failure".to_string(),
    }
}

#[async_trait::async_trait]
impl RecordingService for FakeRecordingService {
    async fn start(&self, request: StartRecordingRequest) -> telehealth_session::Result<StartRecordingResponse> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        *self.last_start.lock() = Some(request);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        let next = self.start_results.lock().pop_front();
        next.unwrap_or_else(|| Ok(active_response()))
    }

    async fn stop(&self, request: StopRecordingRequest) -> telehealth_session::Result<StopRecordingResponse> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        *self.last_stop.lock() = Some(request);
        let next = self.stop_results.lock().pop_front();
        next.unwrap_or_else(|| Ok(stopped_response()))
    }
}

// ============================================================================
// Helpers
// ============================================================================

pub fn remote(id: &str) -> RemoteParticipant {
    RemoteParticipant {
        participant_id: id.to_string(),
        identity: format!("{}-identity", id),
    }
}

pub struct Harness {
    pub tokens: Arc<FakeTokenClient>,
    pub media: Arc<FakeMediaFactory>,
    pub transport: Arc<FakeTransport>,
}

impl Harness {
    pub fn new(tokens: FakeTokenClient, media: FakeMediaFactory, transport: FakeTransport) -> Self {
        Self {
            tokens: Arc::new(tokens),
            media: Arc::new(media),
            transport: Arc::new(transport),
        }
    }

    pub fn ok() -> Self {
        Self::new(FakeTokenClient::new(TokenMode::Ok), FakeMediaFactory::new(), FakeTransport::new())
    }

    pub fn deps(&self) -> SessionDeps {
        SessionDeps {
            token_client: self.tokens.clone(),
            media: self.media.clone(),
            transport: self.transport.clone(),
        }
    }
}

pub fn session_config() -> SessionConfig {
    SessionConfig::for_appointment("A1", "dr-smith").with_token_retry(1, Duration::from_millis(1))
}

/// Wait for the first notice matching `pred`
pub async fn wait_for_notice<F>(rx: &mut broadcast::Receiver<SessionNotice>, pred: F) -> SessionNotice
where
    F: Fn(&SessionNotice) -> bool,
{
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            match rx.recv().await {
                Ok(notice) if pred(&notice) => return notice,
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(e) => panic!("notice channel closed: {}", e),
            }
        }
    })
    .await
    .expect("timed out waiting for notice")
}

/// Poll until `cond` holds
pub async fn wait_until<F: Fn() -> bool>(cond: F) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}
