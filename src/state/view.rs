/// Aggregate view state
///
/// ViewState owns the current image, the camera session and the submission
/// controller, and is the only thing the renderer reads. Every event from the
/// UI or from a finished background task becomes one method call here.
use std::sync::Arc;

use crate::acquire::preview::{PreviewId, PreviewRegistry};
use crate::acquire::ImageAcquisition;
use crate::camera::device::{CameraError, Frame, StreamGuard};
use crate::camera::{encode, CameraSession, SessionError, SessionId};
use crate::detect::client::DetectionTransport;
use crate::detect::{self, Completion, PendingSubmission, SubmissionController, SubmitRejected, Ticket};
use crate::state::data::{
    CameraStatus, CandidateFile, ErrorInfo, ImageId, ImageSource, NutritionResult, SelectedImage,
    SubmissionState,
};

/// File name and type given to camera captures
const CAPTURE_NAME: &str = "camera.jpg";
const CAPTURE_MIME: &str = "image/jpeg";

/// Identity of one capture, tied to the image slot at capture time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureId(u64);

/// A frame taken from the camera, waiting to be encoded
#[derive(Debug, Clone)]
pub struct PendingCapture {
    pub id: CaptureId,
    pub frame: Frame,
    pub mirror: bool,
}

/// Read-only picture of the state for rendering
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub preview: Option<PreviewId>,
    pub image_name: Option<String>,
    pub image_source: Option<ImageSource>,
    pub camera: CameraStatus,
    pub submission: SubmissionState,
    pub error: Option<ErrorInfo>,
}

impl Snapshot {
    pub fn is_loading(&self) -> bool {
        self.submission.is_loading()
    }

    pub fn result(&self) -> Option<&NutritionResult> {
        self.submission.result()
    }

    /// Whether there is a result or error the user can dismiss
    pub fn has_outcome(&self) -> bool {
        self.result().is_some() || self.error.is_some()
    }
}

pub struct ViewState {
    acquisition: ImageAcquisition,
    camera: CameraSession,
    submission: SubmissionController,
    /// Last camera or file error; submission errors live in `submission`
    notice: Option<ErrorInfo>,
    /// Bumped whenever the image slot changes or the state is reset
    generation: u64,
    mirror_capture: bool,
}

impl ViewState {
    pub fn new(previews: Arc<dyn PreviewRegistry>, mirror_capture: bool) -> Self {
        Self {
            acquisition: ImageAcquisition::new(previews),
            camera: CameraSession::new(),
            submission: SubmissionController::new(),
            notice: None,
            generation: 0,
            mirror_capture,
        }
    }

    // ========== Reads ==========

    pub fn snapshot(&self) -> Snapshot {
        let image = self.acquisition.current();
        Snapshot {
            preview: image.map(|i| i.preview.id()),
            image_name: image.map(|i| i.file.name.clone()),
            image_source: image.map(|i| i.source),
            camera: self.camera.status(),
            submission: self.submission.state().clone(),
            error: self.error().cloned(),
        }
    }

    pub fn selected(&self) -> Option<&SelectedImage> {
        self.acquisition.current()
    }

    pub fn camera_status(&self) -> CameraStatus {
        self.camera.status()
    }

    pub fn submission(&self) -> &SubmissionState {
        self.submission.state()
    }

    /// The single error to show, submission failures first
    pub fn error(&self) -> Option<&ErrorInfo> {
        self.submission.state().error().or(self.notice.as_ref())
    }

    pub fn result(&self) -> Option<&NutritionResult> {
        self.submission.state().result()
    }

    // ========== Image acquisition ==========

    /// Replace the current image with an upload; `None` is a cancelled pick
    pub fn select_file(&mut self, file: Option<CandidateFile>) -> Option<ImageId> {
        self.install(file, ImageSource::Upload)
    }

    /// Use the first dropped file; an empty drop changes nothing
    pub fn handle_drop(&mut self, files: Vec<CandidateFile>) -> Option<ImageId> {
        let id = self.acquisition.handle_drop(files)?;
        self.after_new_image();
        Some(id)
    }

    /// Release the current image and clear any error or result
    pub fn clear(&mut self) {
        self.acquisition.clear();
        self.generation += 1;
        self.notice = None;
        self.submission.clear_outcome();
    }

    /// Show an error that did not come from a submission
    pub fn surface(&mut self, error: ErrorInfo) {
        tracing::warn!(kind = ?error.kind, message = %error.message, "error surfaced");
        self.submission.clear_outcome();
        self.notice = Some(error);
    }

    fn install(&mut self, file: Option<CandidateFile>, source: ImageSource) -> Option<ImageId> {
        let id = self.acquisition.select_file(file, source)?;
        self.after_new_image();
        Some(id)
    }

    fn after_new_image(&mut self) {
        self.generation += 1;
        self.notice = None;
        self.submission.clear_outcome();
    }

    // ========== Camera ==========

    /// Begin opening the camera; `None` if a session is already active
    pub fn open_camera(&mut self) -> Option<SessionId> {
        match self.camera.open() {
            Ok(id) => {
                self.notice = None;
                self.submission.clear_error();
                Some(id)
            }
            Err(SessionError::Busy) | Err(SessionError::NotStreaming) => None,
        }
    }

    /// Apply the device's answer to an open attempt
    pub fn camera_opened(&mut self, id: SessionId, outcome: Result<StreamGuard, CameraError>) {
        if let Some(error) = self.camera.opened(id, outcome) {
            tracing::warn!(kind = ?error.kind, "camera not opened");
            self.submission.clear_error();
            self.notice = Some(error);
        }
    }

    /// Latest frame for the live preview, oriented like the capture will be
    pub fn camera_preview(&mut self) -> Option<image::RgbaImage> {
        let frame = self.camera.preview_frame()?;
        encode::orient(&frame, self.mirror_capture)
    }

    /// Take the current frame and close the camera
    ///
    /// The session is Closed when this returns, whatever the outcome.
    pub fn capture(&mut self) -> Option<PendingCapture> {
        let frame = self.camera.capture().ok()??;
        Some(PendingCapture {
            id: CaptureId(self.generation),
            frame,
            mirror: self.mirror_capture,
        })
    }

    /// Install an encoded capture as the current image
    ///
    /// `None` bytes means encoding produced no blob and nothing is emitted.
    /// A capture overtaken by another selection or a reset is dropped.
    pub fn capture_encoded(&mut self, id: CaptureId, bytes: Option<Vec<u8>>) -> Option<ImageId> {
        if id.0 != self.generation {
            tracing::debug!("capture overtaken, discarded");
            return None;
        }
        let Some(bytes) = bytes else {
            tracing::warn!("capture produced no image");
            return None;
        };
        self.install(
            Some(CandidateFile::new(CAPTURE_NAME, CAPTURE_MIME, bytes)),
            ImageSource::Camera,
        )
    }

    /// Capture and encode in one step
    pub fn capture_now(&mut self) -> Option<ImageId> {
        let pending = self.capture()?;
        let bytes = encode::encode_capture(&pending.frame, pending.mirror);
        self.capture_encoded(pending.id, bytes)
    }

    pub fn close_camera(&mut self) {
        self.camera.close();
    }

    // ========== Submission ==========

    /// Start submitting the current image
    pub fn begin_submit(&mut self) -> Result<PendingSubmission, SubmitRejected> {
        let result = self.submission.begin(self.acquisition.current());
        if !matches!(result, Err(SubmitRejected::Busy)) {
            self.notice = None;
        }
        result
    }

    /// Apply the outcome of a finished request
    pub fn finish_submit(&mut self, ticket: Ticket, outcome: Result<NutritionResult, ErrorInfo>) -> Completion {
        let current = self.acquisition.current_id();
        self.submission.complete(ticket, outcome, current)
    }

    /// Submit the current image and wait for the answer
    pub async fn submit(&mut self, transport: &dyn DetectionTransport) -> Result<Completion, SubmitRejected> {
        let pending = self.begin_submit()?;
        let outcome = detect::run(transport, pending.upload).await;
        Ok(self.finish_submit(pending.ticket, outcome))
    }

    // ========== Reset ==========

    /// Return everything to its initial condition; safe from any state
    pub fn reset(&mut self) {
        tracing::info!("reset");
        self.acquisition.clear();
        self.submission.reset();
        self.camera.close();
        self.notice = None;
        self.generation += 1;
    }
}
