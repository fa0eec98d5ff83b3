use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::track::{DeviceHandle, LocalTrack, LocalTracks, TrackKind};
use crate::error::{Result, SessionError};

/// Capture constraints for one acquisition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConstraints {
    /// Preferred microphone id; first available when unset
    pub audio_device: Option<String>,
    /// Preferred camera id; first available when unset
    pub video_device: Option<String>,
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
}

impl Default for MediaConstraints {
    fn default() -> Self {
        Self {
            audio_device: None,
            video_device: None,
            width: 1280,
            height: 720,
            frame_rate: 24,
        }
    }
}

/// Local capture device known to the factory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub id: String,
    pub label: String,
    pub kind: TrackKind,
}

/// Produces local capture tracks.
///
/// On success the caller owns the returned tracks and must release them.
/// On failure nothing stays open.
#[async_trait::async_trait]
pub trait MediaFactory: Send + Sync {
    async fn acquire_tracks(&self, constraints: &MediaConstraints) -> Result<LocalTracks>;

    /// Factory name for logging
    fn name(&self) -> &str;
}

/// Opens the handle behind one device
pub type DeviceOpener = Box<dyn Fn(&DeviceInfo) -> Box<dyn DeviceHandle> + Send + Sync>;

/// Factory over a fixed device inventory.
///
/// Device selection, permission and partial-failure release are real; the
/// handles are not. By default each track gets a stand-in handle that only
/// logs its open and close, so no camera or microphone is actually locked.
/// Platform capture plugs in through [`DeviceMediaFactory::with_opener`].
pub struct DeviceMediaFactory {
    devices: Vec<DeviceInfo>,
    permission_granted: bool,
    opener: DeviceOpener,
}

impl DeviceMediaFactory {
    pub fn new(devices: Vec<DeviceInfo>, permission_granted: bool) -> Self {
        Self::with_opener(
            devices,
            permission_granted,
            Box::new(|device: &DeviceInfo| -> Box<dyn DeviceHandle> {
                Box::new(InventoryDevice {
                    device_id: device.id.clone(),
                })
            }),
        )
    }

    pub fn with_opener(devices: Vec<DeviceInfo>, permission_granted: bool, opener: DeviceOpener) -> Self {
        Self {
            devices,
            permission_granted,
            opener,
        }
    }

    fn find(&self, kind: TrackKind, preferred: Option<&str>) -> Result<&DeviceInfo> {
        let mut candidates = self.devices.iter().filter(|d| d.kind == kind);
        let found = match preferred {
            Some(id) => candidates.find(|d| d.id == id),
            None => candidates.next(),
        };

        found.ok_or_else(|| match preferred {
            Some(id) => SessionError::MediaAcquisition(format!("{} device {} not found", kind, id)),
            None => SessionError::MediaAcquisition(format!("no {} device available", kind)),
        })
    }

    fn open(&self, device: &DeviceInfo) -> LocalTrack {
        info!("Opening {} device {} ({})", device.kind, device.id, device.label);
        LocalTrack::new(device.kind, device.label.clone(), (self.opener)(device))
    }
}

#[async_trait::async_trait]
impl MediaFactory for DeviceMediaFactory {
    async fn acquire_tracks(&self, constraints: &MediaConstraints) -> Result<LocalTracks> {
        if !self.permission_granted {
            warn!("Media permission denied");
            return Err(SessionError::MediaAcquisition("permission denied".to_string()));
        }

        let mic = self.find(TrackKind::Audio, constraints.audio_device.as_deref())?;
        let audio = self.open(mic);

        // `audio` is dropped (and released) if the camera lookup fails
        let cam = self.find(TrackKind::Video, constraints.video_device.as_deref())?;
        let video = self.open(cam);

        Ok(LocalTracks { audio, video })
    }

    fn name(&self) -> &str {
        "device"
    }
}

/// Stand-in handle for an inventory entry
struct InventoryDevice {
    device_id: String,
}

impl DeviceHandle for InventoryDevice {
    fn close(&self) {
        info!("Closed device {}", self.device_id);
    }
}
