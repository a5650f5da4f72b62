/// Scripted collaborators for tests
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::acquire::preview::{PreviewId, PreviewRegistry};
use crate::camera::device::{CameraError, DeviceStream, Facing, Frame, MediaCapture};
use crate::detect::client::{DetectionTransport, RawResponse, TransportError, Upload};

/// Preview registry that only counts
#[derive(Default)]
pub struct CountingPreviews {
    next_id: AtomicU64,
    created: AtomicUsize,
    revoked: Mutex<Vec<PreviewId>>,
}

impl CountingPreviews {
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn revoked(&self) -> usize {
        self.revoked.lock().unwrap().len()
    }

    pub fn revoked_ids(&self) -> Vec<PreviewId> {
        self.revoked.lock().unwrap().clone()
    }

    pub fn live(&self) -> usize {
        self.created() - self.revoked()
    }
}

impl PreviewRegistry for CountingPreviews {
    fn create(&self, _bytes: &[u8]) -> PreviewId {
        self.created.fetch_add(1, Ordering::SeqCst);
        PreviewId(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    fn revoke(&self, id: PreviewId) {
        let mut revoked = self.revoked.lock().unwrap();
        assert!(!revoked.contains(&id), "preview {:?} revoked twice", id);
        revoked.push(id);
    }
}

#[derive(Debug, Clone, Copy)]
enum CameraScript {
    Grant { width: u32, height: u32 },
    Blank,
    Deny,
    Missing,
}

/// Camera that answers from a script and counts device use
#[derive(Clone)]
pub struct ScriptedCamera {
    script: CameraScript,
    acquisitions: Arc<AtomicUsize>,
    stops: Arc<AtomicUsize>,
}

impl ScriptedCamera {
    fn with(script: CameraScript) -> Self {
        Self {
            script,
            acquisitions: Arc::new(AtomicUsize::new(0)),
            stops: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Grants a stream producing gradient frames of the given size
    pub fn granting(width: u32, height: u32) -> Self {
        Self::with(CameraScript::Grant { width, height })
    }

    /// Grants a stream that never produces a frame
    pub fn blank() -> Self {
        Self::with(CameraScript::Blank)
    }

    pub fn denying() -> Self {
        Self::with(CameraScript::Deny)
    }

    pub fn missing() -> Self {
        Self::with(CameraScript::Missing)
    }

    /// A stream from this camera, as if access had been granted
    pub fn open_stream(&self) -> Box<dyn DeviceStream> {
        let frame = match self.script {
            CameraScript::Grant { width, height } => Some(gradient(width, height)),
            _ => None,
        };
        Box::new(ScriptedStream {
            frame,
            stops: Arc::clone(&self.stops),
        })
    }

    pub fn acquisitions(&self) -> usize {
        self.acquisitions.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaCapture for ScriptedCamera {
    async fn acquire(&self, facing: Facing) -> Result<Box<dyn DeviceStream>, CameraError> {
        assert_eq!(facing, Facing::Rear);
        self.acquisitions.fetch_add(1, Ordering::SeqCst);
        match self.script {
            CameraScript::Deny => Err(CameraError::PermissionDenied),
            CameraScript::Missing => Err(CameraError::Unavailable("none attached".to_string())),
            _ => Ok(self.open_stream()),
        }
    }
}

struct ScriptedStream {
    frame: Option<Frame>,
    stops: Arc<AtomicUsize>,
}

impl DeviceStream for ScriptedStream {
    fn frame(&mut self) -> Option<Frame> {
        self.frame.clone()
    }

    fn stop(&mut self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

/// Frame whose pixels differ left to right, so mirroring is observable
fn gradient(width: u32, height: u32) -> Frame {
    let mut rgba = Vec::with_capacity((width * height * 4) as usize);
    for _y in 0..height {
        for x in 0..width {
            let v = ((x * 255) / width.max(1)) as u8;
            rgba.extend_from_slice(&[v, 255 - v, 0, 255]);
        }
    }
    Frame { width, height, rgba }
}

/// Transport that replays one canned answer
pub struct ScriptedTransport {
    answer: Option<RawResponse>,
    calls: AtomicUsize,
    last_upload: Mutex<Option<Upload>>,
}

impl ScriptedTransport {
    pub fn responding(status: u16, body: &str) -> Self {
        Self {
            answer: Some(RawResponse {
                status,
                body: body.to_string(),
            }),
            calls: AtomicUsize::new(0),
            last_upload: Mutex::new(None),
        }
    }

    /// Every request fails before reaching a server
    pub fn unreachable() -> Self {
        Self {
            answer: None,
            calls: AtomicUsize::new(0),
            last_upload: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_upload(&self) -> Option<Upload> {
        self.last_upload.lock().unwrap().clone()
    }
}

#[async_trait]
impl DetectionTransport for ScriptedTransport {
    async fn send(&self, upload: Upload) -> Result<RawResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_upload.lock().unwrap() = Some(upload);
        self.answer
            .clone()
            .ok_or_else(|| TransportError::Network("connection refused".to_string()))
    }
}
