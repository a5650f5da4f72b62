/// Revocable preview handles for the current image
///
/// A preview is created from the image bytes when an image is selected and
/// must be revoked when that image is replaced or cleared. `PreviewHandle`
/// owns exactly one preview id and revokes it when dropped, so ownership of
/// the SelectedImage decides the handle's lifetime.
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use iced::widget::image::Handle;

/// Identifier of one allocated preview
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PreviewId(pub u64);

/// Allocates and revokes display handles for image bytes
pub trait PreviewRegistry: Send + Sync {
    fn create(&self, bytes: &[u8]) -> PreviewId;
    fn revoke(&self, id: PreviewId);
}

/// Owning handle to a preview; revokes on drop
pub struct PreviewHandle {
    id: PreviewId,
    registry: Arc<dyn PreviewRegistry>,
}

impl PreviewHandle {
    pub fn allocate(registry: &Arc<dyn PreviewRegistry>, bytes: &[u8]) -> Self {
        let id = registry.create(bytes);
        Self {
            id,
            registry: Arc::clone(registry),
        }
    }

    pub fn id(&self) -> PreviewId {
        self.id
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        tracing::debug!(preview = self.id.0, "revoking preview");
        self.registry.revoke(self.id);
    }
}

impl std::fmt::Debug for PreviewHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreviewHandle").field("id", &self.id).finish()
    }
}

/// Preview registry backed by decoded iced image handles
#[derive(Default)]
pub struct IcedPreviews {
    next_id: AtomicU64,
    handles: Mutex<HashMap<PreviewId, Handle>>,
}

impl IcedPreviews {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the display handle for a live preview
    pub fn get(&self, id: PreviewId) -> Option<Handle> {
        self.handles
            .lock()
            .ok()
            .and_then(|handles| handles.get(&id).cloned())
    }

    /// Number of previews currently allocated
    pub fn live_count(&self) -> usize {
        self.handles.lock().map(|handles| handles.len()).unwrap_or(0)
    }
}

impl PreviewRegistry for IcedPreviews {
    fn create(&self, bytes: &[u8]) -> PreviewId {
        let id = PreviewId(self.next_id.fetch_add(1, Ordering::Relaxed));
        if let Ok(mut handles) = self.handles.lock() {
            handles.insert(id, Handle::from_bytes(bytes.to_vec()));
        }
        id
    }

    fn revoke(&self, id: PreviewId) {
        if let Ok(mut handles) = self.handles.lock() {
            handles.remove(&id);
        }
    }
}
