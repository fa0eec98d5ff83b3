use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::media::TrackKind;

/// Subscription state of one remote track slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionState {
    Pending,
    Subscribed,
    Unsubscribed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackSlot {
    pub state: SubscriptionState,
    /// Transport-assigned track id once subscribed
    pub track_id: Option<String>,
}

impl TrackSlot {
    fn pending() -> Self {
        Self {
            state: SubscriptionState::Pending,
            track_id: None,
        }
    }
}

/// Remote party as announced by the transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteParticipant {
    pub participant_id: String,
    pub identity: String,
}

/// Remote party tracked by the registry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub participant_id: String,
    pub identity: String,
    pub tracks: HashMap<TrackKind, TrackSlot>,
}

impl Participant {
    fn new(remote: RemoteParticipant) -> Self {
        let tracks = [TrackKind::Audio, TrackKind::Video]
            .into_iter()
            .map(|kind| (kind, TrackSlot::pending()))
            .collect();

        Self {
            participant_id: remote.participant_id,
            identity: remote.identity,
            tracks,
        }
    }

    pub fn track_state(&self, kind: TrackKind) -> SubscriptionState {
        self.tracks
            .get(&kind)
            .map(|slot| slot.state)
            .unwrap_or(SubscriptionState::Pending)
    }
}

/// Remote participants of one session.
///
/// Only mutated from transport events. Every operation tolerates duplicates
/// and events for unknown participants; the return value tells whether
/// anything changed.
#[derive(Debug, Default)]
pub struct ParticipantRegistry {
    participants: HashMap<String, Participant>,
}

impl ParticipantRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_participant_connected(&mut self, remote: RemoteParticipant) -> bool {
        if self.participants.contains_key(&remote.participant_id) {
            debug!("Participant {} already registered", remote.participant_id);
            return false;
        }
        self.participants
            .insert(remote.participant_id.clone(), Participant::new(remote));
        true
    }

    pub fn on_participant_disconnected(&mut self, participant_id: &str) -> bool {
        self.participants.remove(participant_id).is_some()
    }

    pub fn on_track_subscribed(&mut self, participant_id: &str, kind: TrackKind, track_id: &str) -> bool {
        self.set_track(participant_id, kind, SubscriptionState::Subscribed, Some(track_id))
    }

    pub fn on_track_unsubscribed(&mut self, participant_id: &str, kind: TrackKind) -> bool {
        self.set_track(participant_id, kind, SubscriptionState::Unsubscribed, None)
    }

    fn set_track(
        &mut self,
        participant_id: &str,
        kind: TrackKind,
        state: SubscriptionState,
        track_id: Option<&str>,
    ) -> bool {
        match self.participants.get_mut(participant_id) {
            Some(participant) => {
                participant.tracks.insert(
                    kind,
                    TrackSlot {
                        state,
                        track_id: track_id.map(str::to_string),
                    },
                );
                true
            }
            None => {
                debug!("Ignoring {} track event for unknown participant {}", kind, participant_id);
                false
            }
        }
    }

    pub fn count(&self) -> usize {
        self.participants.len()
    }

    pub fn get(&self, participant_id: &str) -> Option<&Participant> {
        self.participants.get(participant_id)
    }

    /// Snapshot, ordered by participant id
    pub fn participants(&self) -> Vec<Participant> {
        let mut list: Vec<Participant> = self.participants.values().cloned().collect();
        list.sort_by(|a, b| a.participant_id.cmp(&b.participant_id));
        list
    }

    pub fn clear(&mut self) {
        self.participants.clear();
    }
}
