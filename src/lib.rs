pub mod config;
pub mod error;
pub mod http;
pub mod link;
pub mod media;
pub mod participants;
pub mod recording;
pub mod session;
pub mod token;
pub mod transport;

pub use config::Config;
pub use error::{Result, SessionError};
pub use http::{create_router, AppState, SessionDefaults};
pub use link::{JoinLink, JoinLinkIssuer};
pub use media::{
    DeviceHandle, DeviceInfo, DeviceMediaFactory, DeviceOpener, LocalTrack, LocalTracks,
    MediaConstraints, MediaFactory, TrackKind,
};
pub use participants::{Participant, ParticipantRegistry, RemoteParticipant, SubscriptionState};
pub use recording::{
    HttpRecordingService, Recording, RecordingCoordinator, RecordingService, RecordingStatus,
};
pub use session::{
    SessionConfig, SessionController, SessionDeps, SessionNotice, SessionSnapshot, SessionState,
    SessionView,
};
pub use token::{Credential, HttpTokenClient, TokenClient};
pub use transport::{MediaTransport, NatsTransport, TransportConnection, TransportEvent};
