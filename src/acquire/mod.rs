/// Image acquisition module
///
/// This module handles:
/// - Normalizing file-pick and drag-drop input into one candidate image
/// - Allocating the preview handle for the current image (preview.rs)
/// - Reading picked/dropped files from disk (loader.rs)

pub mod loader;
pub mod preview;

use std::sync::Arc;

use crate::state::data::{CandidateFile, ImageId, ImageSource, SelectedImage};
use preview::{PreviewHandle, PreviewRegistry};

/// Holds the single current image and its preview
pub struct ImageAcquisition {
    previews: Arc<dyn PreviewRegistry>,
    current: Option<SelectedImage>,
    next_id: u64,
}

impl ImageAcquisition {
    pub fn new(previews: Arc<dyn PreviewRegistry>) -> Self {
        Self {
            previews,
            current: None,
            next_id: 1,
        }
    }

    /// Replace the current image with `file`
    ///
    /// `None` is a user cancellation: nothing changes and `None` is returned.
    /// The previous preview is revoked right after the new one is installed.
    pub fn select_file(&mut self, file: Option<CandidateFile>, source: ImageSource) -> Option<ImageId> {
        let file = file?;
        let id = ImageId(self.next_id);
        self.next_id += 1;

        let preview = PreviewHandle::allocate(&self.previews, &file.bytes);
        tracing::info!(
            image = id.0,
            name = %file.name,
            mime = %file.mime_type,
            size = file.bytes.len(),
            ?source,
            "image selected"
        );

        // Dropping the old image revokes its preview
        let replaced = self.current.replace(SelectedImage {
            id,
            file,
            preview,
            source,
        });
        if let Some(old) = replaced {
            tracing::debug!(image = old.id.0, "replaced previous image");
        }

        Some(id)
    }

    /// Take the first dropped file; an empty drop changes nothing
    pub fn handle_drop(&mut self, files: Vec<CandidateFile>) -> Option<ImageId> {
        let first = files.into_iter().next();
        if first.is_none() {
            tracing::debug!("empty drop ignored");
        }
        self.select_file(first, ImageSource::Upload)
    }

    /// Release the current image and its preview; returns whether one existed
    pub fn clear(&mut self) -> bool {
        match self.current.take() {
            Some(image) => {
                tracing::debug!(image = image.id.0, "image cleared");
                true
            }
            None => false,
        }
    }

    pub fn current(&self) -> Option<&SelectedImage> {
        self.current.as_ref()
    }

    pub fn current_id(&self) -> Option<ImageId> {
        self.current.as_ref().map(|image| image.id)
    }
}
