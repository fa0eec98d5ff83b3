use anyhow::Context;
use async_nats::Client;
use futures::stream::StreamExt;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::events::{
    JoinAnnouncement, LeaveAnnouncement, PublishedTrack, RosterReply, RosterRequest, TransportEvent,
};
use super::{MediaTransport, TransportConnection};
use crate::error::{Result, SessionError};
use crate::media::LocalTracks;
use crate::participants::RemoteParticipant;
use crate::token::Credential;

const LISTENER_BUFFER: usize = 100;

/// Media transport reached through a NATS relay.
///
/// Per room `R` the relay uses:
/// - `{prefix}.R.join` / `{prefix}.R.leave` for our announcements
/// - `{prefix}.R.roster` (request/reply) for participants already present
/// - `{prefix}.R.events` for participant and connection events
pub struct NatsTransport {
    client: Client,
    subject_prefix: String,
}

impl NatsTransport {
    /// Connect to NATS server
    pub async fn connect(url: &str, subject_prefix: &str) -> anyhow::Result<Self> {
        info!("Connecting to NATS at {}", url);

        let client = async_nats::connect(url)
            .await
            .context("Failed to connect to NATS")?;

        info!("Connected to NATS successfully");

        Ok(Self {
            client,
            subject_prefix: subject_prefix.to_string(),
        })
    }

    fn subject(&self, room_name: &str, leaf: &str) -> String {
        format!("{}.{}.{}", self.subject_prefix, room_name, leaf)
    }

    /// Ask the relay who is already in the room, excluding ourselves
    async fn fetch_roster(&self, credential: &Credential, room_name: &str) -> Result<Vec<RemoteParticipant>> {
        let request = RosterRequest {
            identity: credential.identity.clone(),
            token: credential.token.clone(),
        };
        let payload = serde_json::to_vec(&request)
            .map_err(|e| SessionError::TransportConnect(e.to_string()))?;

        let reply = self
            .client
            .request(self.subject(room_name, "roster"), payload.into())
            .await
            .map_err(|e| SessionError::TransportConnect(format!("roster request failed: {}", e)))?;

        let roster: RosterReply = serde_json::from_slice(&reply.payload)
            .map_err(|e| SessionError::TransportConnect(format!("malformed roster: {}", e)))?;

        Ok(roster
            .participants
            .into_iter()
            .filter(|p| p.identity != credential.identity)
            .collect())
    }
}

#[async_trait::async_trait]
impl MediaTransport for NatsTransport {
    async fn connect(
        &self,
        credential: &Credential,
        tracks: &LocalTracks,
        room_name: &str,
    ) -> Result<Arc<dyn TransportConnection>> {
        let events_subject = self.subject(room_name, "events");

        // Subscribe before announcing so no event from the relay is missed
        let mut subscriber = self
            .client
            .subscribe(events_subject.clone())
            .await
            .map_err(|e| SessionError::TransportConnect(format!("subscribe failed: {}", e)))?;

        // Roster before announcing, so a failure leaves nothing to undo.
        // Events published meanwhile stay buffered in `subscriber` and are
        // applied on top of the roster once the forward task starts.
        let roster = self.fetch_roster(credential, room_name).await?;

        let announcement = JoinAnnouncement {
            identity: credential.identity.clone(),
            token: credential.token.clone(),
            tracks: tracks
                .iter()
                .map(|t| PublishedTrack {
                    track_id: t.id().to_string(),
                    kind: t.kind(),
                    label: t.label().to_string(),
                })
                .collect(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        let payload = serde_json::to_vec(&announcement)
            .map_err(|e| SessionError::TransportConnect(e.to_string()))?;

        self.client
            .publish(self.subject(room_name, "join"), payload.into())
            .await
            .map_err(|e| SessionError::TransportConnect(format!("join announce failed: {}", e)))?;
        self.client
            .flush()
            .await
            .map_err(|e| SessionError::TransportConnect(format!("flush failed: {}", e)))?;

        info!(
            "Joined room {} as {} ({} already present)",
            room_name,
            credential.identity,
            roster.len()
        );

        let shared = Arc::new(ConnectionShared::default());
        shared.seed_presence(roster);
        let forward_shared = Arc::clone(&shared);
        let room = room_name.to_string();

        let forward_task = tokio::spawn(async move {
            debug!("Relay event task started for {}", room);

            while let Some(msg) = subscriber.next().await {
                let event = match serde_json::from_slice::<TransportEvent>(&msg.payload) {
                    Ok(event) => event,
                    Err(e) => {
                        warn!("Failed to parse relay event: {}", e);
                        continue;
                    }
                };

                let done = matches!(event, TransportEvent::Disconnected { .. });
                forward_shared.track_presence(&event);
                forward_shared.dispatch(event).await;
                if done {
                    break;
                }
            }

            debug!("Relay event task stopped for {}", room);
        });

        *shared.forward_task.lock() = Some(forward_task);

        Ok(Arc::new(NatsConnection {
            client: self.client.clone(),
            leave_subject: self.subject(room_name, "leave"),
            identity: credential.identity.clone(),
            shared,
        }))
    }
}

#[derive(Default)]
struct ConnectionShared {
    listeners: Mutex<Vec<mpsc::Sender<TransportEvent>>>,
    present: Mutex<HashMap<String, RemoteParticipant>>,
    forward_task: Mutex<Option<JoinHandle<()>>>,
}

impl ConnectionShared {
    fn seed_presence(&self, roster: Vec<RemoteParticipant>) {
        let mut present = self.present.lock();
        for participant in roster {
            present.insert(participant.participant_id.clone(), participant);
        }
    }

    fn track_presence(&self, event: &TransportEvent) {
        let mut present = self.present.lock();
        match event {
            TransportEvent::ParticipantConnected { participant } => {
                present.insert(participant.participant_id.clone(), participant.clone());
            }
            TransportEvent::ParticipantDisconnected { participant_id } => {
                present.remove(participant_id);
            }
            TransportEvent::Disconnected { .. } => present.clear(),
            _ => {}
        }
    }

    async fn dispatch(&self, event: TransportEvent) {
        let listeners: Vec<_> = self.listeners.lock().clone();
        for listener in listeners {
            if listener.send(event.clone()).await.is_err() {
                debug!("Listener dropped");
            }
        }
        self.listeners.lock().retain(|l| !l.is_closed());
    }
}

struct NatsConnection {
    client: Client,
    leave_subject: String,
    identity: String,
    shared: Arc<ConnectionShared>,
}

#[async_trait::async_trait]
impl TransportConnection for NatsConnection {
    fn subscribe(&self) -> mpsc::Receiver<TransportEvent> {
        let (tx, rx) = mpsc::channel(LISTENER_BUFFER);
        self.shared.listeners.lock().push(tx);
        rx
    }

    fn participants(&self) -> Vec<RemoteParticipant> {
        self.shared.present.lock().values().cloned().collect()
    }

    async fn disconnect(&self) -> Result<()> {
        let task = self.shared.forward_task.lock().take();
        let Some(task) = task else {
            debug!("Connection for {} already closed", self.identity);
            return Ok(());
        };
        task.abort();
        self.shared.listeners.lock().clear();
        self.shared.present.lock().clear();

        let leave = LeaveAnnouncement {
            identity: self.identity.clone(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        let payload = serde_json::to_vec(&leave)
            .map_err(|e| SessionError::TransportConnect(e.to_string()))?;

        if let Err(e) = self.client.publish(self.leave_subject.clone(), payload.into()).await {
            error!("Failed to publish leave announcement: {}", e);
            return Err(SessionError::TransportConnect(format!("leave announce failed: {}", e)));
        }

        info!("Left room via {}", self.leave_subject);
        Ok(())
    }
}
