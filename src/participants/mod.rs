//! Remote participant tracking for one media session

mod registry;

pub use registry::{
    Participant, ParticipantRegistry, RemoteParticipant, SubscriptionState, TrackSlot,
};
