/// Submission module
///
/// This module handles:
/// - The Idle → Loading → Succeeded/Failed lifecycle of a detection request
/// - At most one request in flight, guarded by a per-submission ticket
/// - The HTTP transport and response mapping (client.rs)

pub mod client;

use crate::state::data::{messages, ErrorInfo, ErrorKind, ImageId, NutritionResult, SelectedImage, SubmissionState};
use client::{DetectionTransport, Upload};

/// Identity of one submission and the image it was made for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub seq: u64,
    pub image: ImageId,
}

/// Why a submit call did not start a request
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmitRejected {
    #[error("a submission is already in flight")]
    Busy,
    #[error("{0}")]
    Validation(ErrorInfo),
}

/// A started submission: the ticket to complete and the payload to send
#[derive(Debug, Clone)]
pub struct PendingSubmission {
    pub ticket: Ticket,
    pub upload: Upload,
}

/// What happened to a completion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Outcome applied to the state
    Applied,
    /// Loading ended but the image changed meanwhile, so the outcome was dropped
    Superseded,
    /// Ticket no longer in flight; nothing changed
    Stale,
}

/// Owns the request lifecycle to the detection service
#[derive(Debug, Default)]
pub struct SubmissionController {
    state: SubmissionState,
    in_flight: Option<Ticket>,
    next_seq: u64,
}

impl SubmissionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SubmissionState {
        &self.state
    }

    pub fn in_flight(&self) -> Option<Ticket> {
        self.in_flight
    }

    /// Start a submission for `image`
    ///
    /// Rejected without side effects while Loading. A missing image fails
    /// synchronously with a Validation error and sends nothing.
    pub fn begin(&mut self, image: Option<&SelectedImage>) -> Result<PendingSubmission, SubmitRejected> {
        if self.state.is_loading() {
            tracing::debug!("submit rejected, request in flight");
            return Err(SubmitRejected::Busy);
        }

        let Some(image) = image else {
            let error = ErrorInfo::new(ErrorKind::Validation, messages::NO_IMAGE);
            self.state = SubmissionState::Failed(error.clone());
            return Err(SubmitRejected::Validation(error));
        };

        self.next_seq += 1;
        let ticket = Ticket {
            seq: self.next_seq,
            image: image.id,
        };
        self.state = SubmissionState::Loading;
        self.in_flight = Some(ticket);

        tracing::info!(submission = ticket.seq, image = image.id.0, "submission started");
        Ok(PendingSubmission {
            ticket,
            upload: Upload {
                file_name: image.file.name.clone(),
                mime_type: image.file.mime_type.clone(),
                bytes: image.file.bytes.clone(),
            },
        })
    }

    /// Apply the outcome of `ticket`
    ///
    /// Loading always ends for the in-flight ticket. The outcome itself is
    /// applied only if `current_image` is still the image that was submitted.
    pub fn complete(
        &mut self,
        ticket: Ticket,
        outcome: Result<NutritionResult, ErrorInfo>,
        current_image: Option<ImageId>,
    ) -> Completion {
        if self.in_flight != Some(ticket) {
            tracing::debug!(submission = ticket.seq, "stale completion ignored");
            return Completion::Stale;
        }
        self.in_flight = None;

        if current_image != Some(ticket.image) {
            tracing::info!(submission = ticket.seq, "image changed, result discarded");
            self.state = SubmissionState::Idle;
            return Completion::Superseded;
        }

        self.state = match outcome {
            Ok(nutrition) => {
                tracing::info!(submission = ticket.seq, "detection succeeded");
                SubmissionState::Succeeded(nutrition)
            }
            Err(error) => {
                tracing::warn!(submission = ticket.seq, kind = ?error.kind, message = %error.message, "detection failed");
                // Replaces any earlier result, so a rejection never leaves stale values
                SubmissionState::Failed(error)
            }
        };
        Completion::Applied
    }

    /// Drop the last result or error; no effect while Loading
    pub fn clear_outcome(&mut self) {
        if !self.state.is_loading() {
            self.state = SubmissionState::Idle;
        }
    }

    /// Drop a failed outcome, keeping a result or an in-flight request
    pub fn clear_error(&mut self) {
        if matches!(self.state, SubmissionState::Failed(_)) {
            self.state = SubmissionState::Idle;
        }
    }

    /// Force Idle and forget the in-flight ticket
    pub fn reset(&mut self) {
        if let Some(ticket) = self.in_flight.take() {
            tracing::debug!(submission = ticket.seq, "in-flight submission abandoned");
        }
        self.state = SubmissionState::Idle;
    }
}

/// Send one upload and map whatever comes back
pub async fn run(transport: &dyn DetectionTransport, upload: Upload) -> Result<NutritionResult, ErrorInfo> {
    match transport.send(upload).await {
        Ok(response) => client::map_response(&response),
        Err(e) => {
            tracing::warn!(error = %e, "detect request did not reach the server");
            Err(ErrorInfo::new(
                ErrorKind::Network,
                format!("Tidak dapat terhubung ke server: {}", e),
            ))
        }
    }
}
