use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// Kind of media carried by a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Audio,
    Video,
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackKind::Audio => write!(f, "audio"),
            TrackKind::Video => write!(f, "video"),
        }
    }
}

/// Operating-system handle behind a capture track (camera or microphone lock)
pub trait DeviceHandle: Send + Sync {
    /// Give the device back to the OS. Called at most once per handle.
    fn close(&self);
}

/// A local capture track.
///
/// Owns its device handle. The handle is closed exactly once: by the first
/// `release()` call, or on drop if nobody released it.
pub struct LocalTrack {
    id: String,
    kind: TrackKind,
    label: String,
    released: AtomicBool,
    handle: Box<dyn DeviceHandle>,
}

impl LocalTrack {
    pub fn new(kind: TrackKind, label: impl Into<String>, handle: Box<dyn DeviceHandle>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            label: label.into(),
            released: AtomicBool::new(false),
            handle,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> TrackKind {
        self.kind
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    /// Release the device. Returns false if it was already released.
    pub fn release(&self) -> bool {
        if self.released.swap(true, Ordering::SeqCst) {
            return false;
        }
        debug!("Releasing {} track {} ({})", self.kind, self.id, self.label);
        self.handle.close();
        true
    }
}

impl Drop for LocalTrack {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for LocalTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalTrack")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("label", &self.label)
            .field("released", &self.is_released())
            .finish()
    }
}

/// The audio/video pair produced by one acquisition
#[derive(Debug)]
pub struct LocalTracks {
    pub audio: LocalTrack,
    pub video: LocalTrack,
}

impl LocalTracks {
    pub fn release_all(&self) {
        self.audio.release();
        self.video.release();
    }

    pub fn all_released(&self) -> bool {
        self.audio.is_released() && self.video.is_released()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LocalTrack> {
        [&self.audio, &self.video].into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    struct CountingHandle(Arc<AtomicUsize>);

    impl DeviceHandle for CountingHandle {
        fn close(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_release_closes_handle_once() {
        let closes = Arc::new(AtomicUsize::new(0));
        let track = LocalTrack::new(TrackKind::Audio, "mic", Box::new(CountingHandle(closes.clone())));

        assert!(track.release());
        assert!(!track.release());
        assert!(track.is_released());
        drop(track);

        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_releases_unreleased_track() {
        let closes = Arc::new(AtomicUsize::new(0));
        {
            let _track = LocalTrack::new(TrackKind::Video, "cam", Box::new(CountingHandle(closes.clone())));
        }
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }
}
