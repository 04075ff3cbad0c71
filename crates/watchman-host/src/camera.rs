//! Video capture seam.
//!
//! A [`CameraDevice`] grants at most one live [`VideoSource`] per `open`;
//! the capture controller owns that source exclusively until it calls
//! [`VideoSource::release`].

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info};
use watchman_core::{Frame, FrameSettings};

/// Camera acquisition failure. Terminal for the attempt; never retried automatically.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CameraAccessError {
    #[error("camera permission denied")]
    PermissionDenied,
    #[error("no camera device available")]
    NoDevice,
    #[error("camera device error: {0}")]
    Device(String),
}

impl CameraAccessError {
    /// Text shown to the operator until the next successful start.
    pub fn banner(&self) -> &'static str {
        match self {
            Self::PermissionDenied => "Camera access denied. Please enable camera permissions.",
            Self::NoDevice => "No camera found. Connect a camera and try again.",
            Self::Device(_) => "Camera could not be started. Please try again.",
        }
    }
}

/// Failure grabbing a still from an already-acquired source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameCaptureError {
    #[error("video source has been released")]
    Released,
    #[error("frame capture failed: {0}")]
    Device(String),
    #[error("frame capture timed out after {0:?}")]
    Timeout(std::time::Duration),
}

/// Something that can be asked for a live video source.
#[async_trait]
pub trait CameraDevice: Send + Sync {
    async fn open(&self, settings: FrameSettings)
    -> Result<Box<dyn VideoSource>, CameraAccessError>;
}

/// A live, exclusively owned video source.
#[async_trait]
pub trait VideoSource: Send {
    /// Grab the current frame at the source's native resolution, JPEG-encoded.
    async fn capture(&mut self) -> Result<Frame, FrameCaptureError>;

    /// Stop every track. Idempotent.
    fn release(&mut self);
}

// ── DirectoryCamera ──

/// Camera that replays `.jpg`/`.jpeg` stills from a directory in name order,
/// wrapping around at the end.
///
/// Stills are passed through undecoded; each frame carries the requested
/// [`FrameSettings`] dimensions.
#[derive(Debug, Clone)]
pub struct DirectoryCamera {
    dir: PathBuf,
}

impl DirectoryCamera {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl CameraDevice for DirectoryCamera {
    async fn open(
        &self,
        settings: FrameSettings,
    ) -> Result<Box<dyn VideoSource>, CameraAccessError> {
        let mut entries = tokio::fs::read_dir(&self.dir).await.map_err(access_error)?;
        let mut stills = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(access_error)? {
            let path = entry.path();
            if is_jpeg(&path) {
                stills.push(path);
            }
        }
        if stills.is_empty() {
            return Err(CameraAccessError::NoDevice);
        }
        stills.sort();

        info!(
            dir = %self.dir.display(),
            frames = stills.len(),
            width = settings.width,
            height = settings.height,
            "directory camera opened"
        );
        Ok(Box::new(DirectorySource {
            stills,
            next: 0,
            settings,
            released: false,
        }))
    }
}

struct DirectorySource {
    stills: Vec<PathBuf>,
    next: usize,
    settings: FrameSettings,
    released: bool,
}

#[async_trait]
impl VideoSource for DirectorySource {
    async fn capture(&mut self) -> Result<Frame, FrameCaptureError> {
        if self.released {
            return Err(FrameCaptureError::Released);
        }
        let path = &self.stills[self.next % self.stills.len()];
        self.next = (self.next + 1) % self.stills.len();

        let jpeg = tokio::fs::read(path)
            .await
            .map_err(|e| FrameCaptureError::Device(format!("{}: {e}", path.display())))?;
        debug!(path = %path.display(), bytes = jpeg.len(), "captured still");
        Ok(Frame::new(jpeg, self.settings.width, self.settings.height))
    }

    fn release(&mut self) {
        self.released = true;
    }
}

fn is_jpeg(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg"))
}

fn access_error(e: std::io::Error) -> CameraAccessError {
    match e.kind() {
        std::io::ErrorKind::PermissionDenied => CameraAccessError::PermissionDenied,
        std::io::ErrorKind::NotFound => CameraAccessError::NoDevice,
        _ => CameraAccessError::Device(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_directory_is_no_device() {
        let camera = DirectoryCamera::new("/nonexistent/watchman/stills");
        let err = camera.open(FrameSettings::default()).await.err().unwrap();
        assert_eq!(err, CameraAccessError::NoDevice);
    }

    #[tokio::test]
    async fn directory_without_jpegs_is_no_device() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();
        let camera = DirectoryCamera::new(dir.path());
        let err = camera.open(FrameSettings::default()).await.err().unwrap();
        assert_eq!(err, CameraAccessError::NoDevice);
    }

    #[tokio::test]
    async fn replays_stills_in_order_and_wraps() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.jpg"), [2u8]).unwrap();
        std::fs::write(dir.path().join("a.JPEG"), [1u8]).unwrap();
        std::fs::write(dir.path().join("skip.png"), [9u8]).unwrap();

        let camera = DirectoryCamera::new(dir.path());
        let mut source = camera.open(FrameSettings::default()).await.unwrap();

        let seq: Vec<u8> = {
            let mut out = Vec::new();
            for _ in 0..3 {
                out.push(source.capture().await.unwrap().jpeg[0]);
            }
            out
        };
        assert_eq!(seq, vec![1, 2, 1]);

        let frame = source.capture().await.unwrap();
        assert_eq!((frame.width, frame.height), (1280, 720));
    }

    #[tokio::test]
    async fn released_source_refuses_capture() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.jpg"), [1u8]).unwrap();
        let mut source = DirectoryCamera::new(dir.path())
            .open(FrameSettings::default())
            .await
            .unwrap();
        source.release();
        source.release();
        assert_eq!(
            source.capture().await.unwrap_err(),
            FrameCaptureError::Released
        );
    }

    #[test]
    fn permission_denied_banner_matches_dashboard_text() {
        assert_eq!(
            CameraAccessError::PermissionDenied.banner(),
            "Camera access denied. Please enable camera permissions."
        );
    }
}
