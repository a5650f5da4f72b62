/// Webcam capture through nokhwa
///
/// The device is owned by a worker thread that keeps the latest decoded
/// frame in a shared slot until the stream is stopped.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use async_trait::async_trait;
use nokhwa::pixel_format::RgbAFormat;
use nokhwa::utils::{ApiBackend, CameraIndex, CameraInfo, RequestedFormat, RequestedFormatType};
use nokhwa::{Camera, NokhwaError};
use tokio::sync::oneshot;

use super::device::{CameraError, DeviceStream, Facing, Frame, MediaCapture};

/// Device names that mark an environment-facing camera
const REAR_HINTS: [&str; 3] = ["back", "rear", "environment"];

/// Cameras reported by the platform at start-up
pub struct NokhwaCamera {
    devices: Vec<CameraInfo>,
}

impl NokhwaCamera {
    /// Query the platform for cameras; `None` when there are none
    pub fn probe() -> Option<Self> {
        match nokhwa::query(ApiBackend::Auto) {
            Ok(devices) if !devices.is_empty() => {
                tracing::info!(count = devices.len(), "cameras found");
                Some(Self { devices })
            }
            Ok(_) => {
                tracing::info!("no camera found");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "camera query failed");
                None
            }
        }
    }
}

#[async_trait]
impl MediaCapture for NokhwaCamera {
    async fn acquire(&self, facing: Facing) -> Result<Box<dyn DeviceStream>, CameraError> {
        if !nokhwa::nokhwa_check() {
            return Err(CameraError::PermissionDenied);
        }
        let names: Vec<String> = self.devices.iter().map(CameraInfo::human_name).collect();
        let index = pick_device(&names, facing)
            .and_then(|i| self.devices.get(i))
            .map(|info| info.index().clone())
            .ok_or_else(|| CameraError::Unavailable("no camera found".to_string()))?;

        let stream = NokhwaStream::start(index).await?;
        Ok(Box::new(stream))
    }
}

/// Index of the device to open, preferring one named as rear-facing
fn pick_device(names: &[String], facing: Facing) -> Option<usize> {
    if names.is_empty() {
        return None;
    }
    match facing {
        Facing::Rear => Some(
            names
                .iter()
                .position(|name| {
                    let name = name.to_lowercase();
                    REAR_HINTS.iter().any(|hint| name.contains(hint))
                })
                .unwrap_or(0),
        ),
    }
}

fn camera_error(e: NokhwaError) -> CameraError {
    let message = e.to_string();
    if message.to_lowercase().contains("permission") {
        CameraError::PermissionDenied
    } else {
        CameraError::Unavailable(message)
    }
}

/// An open webcam, streaming on its own thread
struct NokhwaStream {
    latest: Arc<Mutex<Option<Frame>>>,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl NokhwaStream {
    /// Open the device on a worker thread and wait until it streams
    async fn start(index: CameraIndex) -> Result<Self, CameraError> {
        let latest = Arc::new(Mutex::new(None));
        let running = Arc::new(AtomicBool::new(true));
        let (ready_tx, ready_rx) = oneshot::channel();

        let worker = {
            let latest = Arc::clone(&latest);
            let running = Arc::clone(&running);
            std::thread::Builder::new()
                .name("nutriva-camera".to_string())
                .spawn(move || run_device(index, latest, running, ready_tx))
                .map_err(|e| CameraError::Unavailable(e.to_string()))?
        };

        match ready_rx.await {
            Ok(Ok(())) => Ok(Self {
                latest,
                running,
                worker: Some(worker),
            }),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(CameraError::Unavailable("camera worker exited".to_string())),
        }
    }
}

impl DeviceStream for NokhwaStream {
    fn frame(&mut self) -> Option<Frame> {
        self.latest.lock().ok()?.clone()
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::warn!("camera worker panicked");
            }
        }
    }
}

impl Drop for NokhwaStream {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Worker loop: open, report readiness, decode frames until told to stop
fn run_device(
    index: CameraIndex,
    latest: Arc<Mutex<Option<Frame>>>,
    running: Arc<AtomicBool>,
    ready: oneshot::Sender<Result<(), CameraError>>,
) {
    let format = RequestedFormat::new::<RgbAFormat>(RequestedFormatType::AbsoluteHighestFrameRate);
    let opened = Camera::new(index, format).and_then(|mut camera| camera.open_stream().map(|()| camera));
    let mut camera = match opened {
        Ok(camera) => camera,
        Err(e) => {
            let _ = ready.send(Err(camera_error(e)));
            return;
        }
    };

    if ready.send(Ok(())).is_err() {
        tracing::debug!("open request abandoned, closing camera");
        running.store(false, Ordering::Release);
    } else {
        tracing::info!("camera streaming");
    }

    while running.load(Ordering::Acquire) {
        match camera.frame().and_then(|buffer| buffer.decode_image::<RgbAFormat>()) {
            Ok(image) => {
                let frame = Frame {
                    width: image.width(),
                    height: image.height(),
                    rgba: image.into_raw(),
                };
                if let Ok(mut slot) = latest.lock() {
                    *slot = Some(frame);
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "camera frame failed");
                break;
            }
        }
    }

    if let Err(e) = camera.stop_stream() {
        tracing::warn!(error = %e, "camera did not stop cleanly");
    }
    tracing::debug!("camera stopped");
}
