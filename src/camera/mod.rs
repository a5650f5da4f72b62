/// Camera session module
///
/// This module handles:
/// - The Closed → Opening → Streaming → Closed session lifecycle
/// - Exclusive ownership of the device stream while Streaming (device.rs)
/// - Turning a captured frame into a JPEG image (encode.rs)
/// - The webcam backend, with the `camera` feature (native.rs)
///
/// Suspension points (permission grant, frame encode) are split into a
/// starting call that returns a token and a completion call that checks it.

pub mod device;
pub mod encode;
#[cfg(feature = "camera")]
pub mod native;

use std::sync::Arc;

use crate::state::data::{CameraStatus, ErrorInfo};
use device::{CameraError, Frame, MediaCapture, NoCamera, StreamGuard};

/// The webcam when one is present, otherwise a backend that always fails
pub fn default_backend() -> Arc<dyn MediaCapture> {
    #[cfg(feature = "camera")]
    if let Some(camera) = native::NokhwaCamera::probe() {
        return Arc::new(camera);
    }
    tracing::info!("camera capture disabled");
    Arc::new(NoCamera)
}

/// Identity of one open attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionId(pub u64);

/// Illegal camera operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("camera session already active")]
    Busy,
    #[error("camera is not streaming")]
    NotStreaming,
}

enum Phase {
    Closed,
    Opening(SessionId),
    Streaming(SessionId, StreamGuard),
}

/// Scoped, exclusive handle to the device camera
pub struct CameraSession {
    phase: Phase,
    next_id: u64,
}

impl Default for CameraSession {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraSession {
    pub fn new() -> Self {
        Self {
            phase: Phase::Closed,
            next_id: 1,
        }
    }

    pub fn status(&self) -> CameraStatus {
        match self.phase {
            Phase::Closed => CameraStatus::Closed,
            Phase::Opening(_) => CameraStatus::Opening,
            Phase::Streaming(..) => CameraStatus::Streaming,
        }
    }

    /// Start opening the camera; only legal from Closed
    pub fn open(&mut self) -> Result<SessionId, SessionError> {
        if !matches!(self.phase, Phase::Closed) {
            tracing::debug!(status = ?self.status(), "camera open rejected");
            return Err(SessionError::Busy);
        }
        let id = SessionId(self.next_id);
        self.next_id += 1;
        self.phase = Phase::Opening(id);
        tracing::info!(session = id.0, "opening camera");
        Ok(id)
    }

    /// Apply the outcome of a device request
    ///
    /// Returns the error to surface when the live attempt was denied. A stream
    /// granted to an attempt that is no longer Opening is released right away.
    pub fn opened(
        &mut self,
        id: SessionId,
        outcome: Result<StreamGuard, CameraError>,
    ) -> Option<ErrorInfo> {
        let live = matches!(self.phase, Phase::Opening(current) if current == id);
        match (live, outcome) {
            (true, Ok(guard)) => {
                tracing::info!(session = id.0, "camera streaming");
                self.phase = Phase::Streaming(id, guard);
                None
            }
            (true, Err(e)) => {
                tracing::warn!(session = id.0, error = %e, "camera unavailable");
                self.phase = Phase::Closed;
                Some(e.to_error_info())
            }
            (false, Ok(mut guard)) => {
                tracing::debug!(session = id.0, "stale camera grant released");
                guard.release();
                None
            }
            (false, Err(_)) => None,
        }
    }

    /// Open and wait for the device in one step
    pub async fn open_with(&mut self, media: &dyn MediaCapture) -> Result<(), ErrorInfo> {
        let Ok(id) = self.open() else {
            return Ok(());
        };
        let outcome = device::acquire_guarded(media, device::Facing::Rear).await;
        match self.opened(id, outcome) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Latest frame for the live preview
    pub fn preview_frame(&mut self) -> Option<Frame> {
        match &mut self.phase {
            Phase::Streaming(_, guard) => guard.frame(),
            _ => None,
        }
    }

    /// Grab the current frame and close the session
    ///
    /// The device is released before the frame is returned. `Ok(None)` means
    /// the device had no frame; the session is closed all the same.
    pub fn capture(&mut self) -> Result<Option<Frame>, SessionError> {
        let phase = std::mem::replace(&mut self.phase, Phase::Closed);
        match phase {
            Phase::Streaming(id, mut guard) => {
                let frame = guard.frame();
                guard.release();
                tracing::info!(session = id.0, has_frame = frame.is_some(), "captured, camera closed");
                Ok(frame)
            }
            other => {
                self.phase = other;
                Err(SessionError::NotStreaming)
            }
        }
    }

    /// Stop the device if any and return to Closed; idempotent
    pub fn close(&mut self) {
        match std::mem::replace(&mut self.phase, Phase::Closed) {
            Phase::Closed => {}
            Phase::Opening(id) => {
                tracing::info!(session = id.0, "camera open cancelled");
            }
            Phase::Streaming(id, mut guard) => {
                guard.release();
                tracing::info!(session = id.0, "camera closed");
            }
        }
    }
}

impl std::fmt::Debug for CameraSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraSession")
            .field("status", &self.status())
            .finish()
    }
}
