pub mod factory;
pub mod track;

pub use factory::{DeviceInfo, DeviceMediaFactory, DeviceOpener, MediaConstraints, MediaFactory};
pub use track::{DeviceHandle, LocalTrack, LocalTracks, TrackKind};
