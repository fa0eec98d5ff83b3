use crate::link::JoinLinkIssuer;
use crate::media::MediaConstraints;
use crate::recording::RecordingCoordinator;
use crate::session::{SessionController, SessionDeps};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Defaults applied to sessions created over HTTP
#[derive(Debug, Clone)]
pub struct SessionDefaults {
    pub constraints: MediaConstraints,
    pub token_attempts: u32,
    pub token_retry_backoff: Duration,
    pub min_participants: usize,
}

impl Default for SessionDefaults {
    fn default() -> Self {
        Self {
            constraints: MediaConstraints::default(),
            token_attempts: 1,
            token_retry_backoff: Duration::from_millis(250),
            min_participants: 2,
        }
    }
}

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Media sessions (session_id → session)
    pub sessions: Arc<RwLock<HashMap<String, Arc<SessionController>>>>,
    pub deps: SessionDeps,
    pub recordings: Arc<RecordingCoordinator>,
    pub links: Arc<JoinLinkIssuer>,
    pub defaults: SessionDefaults,
}

impl AppState {
    pub fn new(
        deps: SessionDeps,
        recordings: Arc<RecordingCoordinator>,
        links: Arc<JoinLinkIssuer>,
        defaults: SessionDefaults,
    ) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            deps,
            recordings,
            links,
            defaults,
        }
    }

    pub async fn session(&self, session_id: &str) -> Option<Arc<SessionController>> {
        self.sessions.read().await.get(session_id).cloned()
    }
}
