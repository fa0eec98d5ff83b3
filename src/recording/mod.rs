//! Session recording through the external orchestration service

mod coordinator;
pub mod messages;
mod service;

pub use coordinator::{Recording, RecordingCoordinator, RecordingStatus};
pub use messages::{
    StartRecordingRequest, StartRecordingResponse, StopRecordingRequest, StopRecordingResponse,
};
pub use service::{HttpRecordingService, RecordingService};
