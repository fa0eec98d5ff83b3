use serde::{Deserialize, Serialize};

use crate::media::TrackKind;
use crate::participants::RemoteParticipant;

/// Events emitted by a transport connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum TransportEvent {
    ParticipantConnected {
        participant: RemoteParticipant,
    },
    ParticipantDisconnected {
        participant_id: String,
    },
    TrackSubscribed {
        participant_id: String,
        kind: TrackKind,
        track_id: String,
    },
    TrackUnsubscribed {
        participant_id: String,
        kind: TrackKind,
    },
    /// The connection ended. `error` is set when the transport failed rather
    /// than the room closing normally.
    Disconnected {
        reason: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

/// Local track as announced to the relay on join
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishedTrack {
    pub track_id: String,
    pub kind: TrackKind,
    pub label: String,
}

/// Published on `{prefix}.{room}.join`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinAnnouncement {
    pub identity: String,
    pub token: String,
    pub tracks: Vec<PublishedTrack>,
    pub timestamp: String, // RFC3339
}

/// Published on `{prefix}.{room}.leave`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveAnnouncement {
    pub identity: String,
    pub timestamp: String,
}

/// Request on `{prefix}.{room}.roster` for who is already in the room
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterRequest {
    pub identity: String,
    pub token: String,
}

/// Relay reply to a [`RosterRequest`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterReply {
    #[serde(default)]
    pub participants: Vec<RemoteParticipant>,
}
