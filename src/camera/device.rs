/// Device collaborators for the camera session
///
/// The session never talks to hardware directly. It asks a `MediaCapture`
/// for a stream and holds that stream inside a `StreamGuard`, which stops
/// the device exactly once, either explicitly or when dropped.
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::state::data::{messages, ErrorInfo, ErrorKind};

/// Which camera to request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facing {
    /// Environment-facing camera (the one pointed at the label)
    Rear,
}

/// One RGBA8 video frame at the device's native resolution
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    /// Row-major RGBA8, `width * height * 4` bytes
    pub rgba: Vec<u8>,
}

/// Why a camera could not be acquired
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CameraError {
    #[error("camera permission denied")]
    PermissionDenied,
    #[error("no camera available: {0}")]
    Unavailable(String),
}

impl CameraError {
    pub fn to_error_info(&self) -> ErrorInfo {
        let kind = match self {
            CameraError::PermissionDenied => ErrorKind::Permission,
            CameraError::Unavailable(_) => ErrorKind::Device,
        };
        ErrorInfo::new(kind, messages::CAMERA_UNAVAILABLE)
    }
}

/// A live device stream
pub trait DeviceStream: Send {
    /// Current frame, if the device has produced one yet
    fn frame(&mut self) -> Option<Frame>;
    /// Stop all tracks and release the device
    fn stop(&mut self);
}

/// Grants access to camera devices
#[async_trait]
pub trait MediaCapture: Send + Sync {
    async fn acquire(&self, facing: Facing) -> Result<Box<dyn DeviceStream>, CameraError>;
}

/// Exclusive owner of an opened device stream
pub struct StreamGuard {
    stream: Option<Box<dyn DeviceStream>>,
}

impl StreamGuard {
    pub fn new(stream: Box<dyn DeviceStream>) -> Self {
        Self {
            stream: Some(stream),
        }
    }

    pub fn frame(&mut self) -> Option<Frame> {
        self.stream.as_mut().and_then(|stream| stream.frame())
    }

    /// Stop the device; later calls (and the drop) do nothing
    pub fn release(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.stop();
            tracing::debug!("device stream released");
        }
    }
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for StreamGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamGuard")
            .field("live", &self.stream.is_some())
            .finish()
    }
}

/// Single-use carrier moving an opened stream through cloneable messages
///
/// If nobody takes the stream, dropping the last clone releases the device.
#[derive(Clone, Debug)]
pub struct GrantedStream(Arc<Mutex<Option<StreamGuard>>>);

impl GrantedStream {
    pub fn new(guard: StreamGuard) -> Self {
        Self(Arc::new(Mutex::new(Some(guard))))
    }

    pub fn take(&self) -> Option<StreamGuard> {
        self.0.lock().ok().and_then(|mut slot| slot.take())
    }
}

/// Acquire a stream and wrap it so it can never leak
pub async fn acquire_guarded(
    media: &dyn MediaCapture,
    facing: Facing,
) -> Result<StreamGuard, CameraError> {
    media.acquire(facing).await.map(StreamGuard::new)
}

/// Capture backend for builds without camera support
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCamera;

#[async_trait]
impl MediaCapture for NoCamera {
    async fn acquire(&self, _facing: Facing) -> Result<Box<dyn DeviceStream>, CameraError> {
        Err(CameraError::Unavailable("no camera backend".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedCamera;

    #[test]
    fn test_guard_stops_once() {
        let camera = ScriptedCamera::granting(2, 2);
        let mut guard = StreamGuard::new(camera.open_stream());

        guard.release();
        guard.release();
        drop(guard);

        assert_eq!(camera.stops(), 1);
    }

    #[test]
    fn test_guard_stops_on_drop() {
        let camera = ScriptedCamera::granting(2, 2);
        let guard = StreamGuard::new(camera.open_stream());
        drop(guard);
        assert_eq!(camera.stops(), 1);
    }

    #[test]
    fn test_granted_stream_is_single_use() {
        let camera = ScriptedCamera::granting(2, 2);
        let granted = GrantedStream::new(StreamGuard::new(camera.open_stream()));
        let copy = granted.clone();

        assert!(copy.take().is_some());
        assert!(granted.take().is_none());
        assert_eq!(camera.stops(), 1);
    }

    #[test]
    fn test_untaken_grant_releases_on_drop() {
        let camera = ScriptedCamera::granting(2, 2);
        let granted = GrantedStream::new(StreamGuard::new(camera.open_stream()));
        drop(granted);
        assert_eq!(camera.stops(), 1);
    }

    #[tokio::test]
    async fn test_no_camera_reports_device_error() {
        let result = NoCamera.acquire(Facing::Rear).await;
        let err = result.err().unwrap();
        assert_eq!(err.to_error_info().kind, ErrorKind::Device);
    }

    #[test]
    fn test_permission_maps_to_permission_kind() {
        assert_eq!(
            CameraError::PermissionDenied.to_error_info().kind,
            ErrorKind::Permission
        );
    }
}
