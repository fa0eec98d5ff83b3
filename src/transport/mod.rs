//! Media transport provider seam
//!
//! The controller talks to the SFU through these traits only:
//! - `MediaTransport::connect` opens a room connection with local tracks
//! - `TransportConnection::subscribe` registers an event listener
//! - `TransportConnection::participants` lists who is already in the room
//!
//! `NatsTransport` reaches the provider through a NATS relay.

mod events;
mod nats;

pub use events::{
    JoinAnnouncement, LeaveAnnouncement, PublishedTrack, RosterReply, RosterRequest, TransportEvent,
};
pub use nats::NatsTransport;

use std::sync::Arc;
use tokio::sync::mpsc;

use crate::error::Result;
use crate::media::LocalTracks;
use crate::participants::RemoteParticipant;
use crate::token::Credential;

/// Opens connections to the media transport provider
#[async_trait::async_trait]
pub trait MediaTransport: Send + Sync {
    async fn connect(
        &self,
        credential: &Credential,
        tracks: &LocalTracks,
        room_name: &str,
    ) -> Result<Arc<dyn TransportConnection>>;
}

/// A live room connection
#[async_trait::async_trait]
pub trait TransportConnection: Send + Sync {
    /// Register a listener. Events emitted after this call are delivered to
    /// the returned receiver, in order.
    fn subscribe(&self) -> mpsc::Receiver<TransportEvent>;

    /// Remote participants currently in the room
    fn participants(&self) -> Vec<RemoteParticipant>;

    /// Leave the room. Safe to call more than once.
    async fn disconnect(&self) -> Result<()>;
}
