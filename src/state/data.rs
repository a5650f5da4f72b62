/// Shared data structures for the application state
///
/// These structs represent the data model that flows between
/// the acquisition, camera and detection layers and the UI layer.

use serde::{Deserialize, Serialize};

use crate::acquire::preview::PreviewHandle;

/// Identity of one SelectedImage, unique within a ViewState
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageId(pub u64);

/// Where the current image came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSource {
    Upload,
    Camera,
}

/// A candidate file handed to acquisition (picked, dropped or captured)
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateFile {
    /// File name sent along with the upload (e.g., "camera.jpg")
    pub name: String,
    /// MIME type, e.g. "image/jpeg"
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl CandidateFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }
}

/// The single image awaiting submission
///
/// Owns its preview handle: dropping the SelectedImage revokes the preview.
#[derive(Debug)]
pub struct SelectedImage {
    pub id: ImageId,
    pub file: CandidateFile,
    pub preview: PreviewHandle,
    pub source: ImageSource,
}

/// Nutrition facts as returned by the detection service
///
/// Field names follow the service's JSON contract. Every field is optional;
/// the service omits values it could not read.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq)]
pub struct NutritionResult {
    /// Energy in kcal
    #[serde(rename = "energi_kkal", default)]
    pub energy_kcal: Option<f64>,
    /// Total fat in grams
    #[serde(rename = "lemak_total_g", default)]
    pub total_fat_g: Option<f64>,
    /// Saturated fat in grams
    #[serde(rename = "lemak_jenuh_g", default)]
    pub saturated_fat_g: Option<f64>,
    #[serde(rename = "protein_g", default)]
    pub protein_g: Option<f64>,
    #[serde(rename = "karbohidrat_g", default)]
    pub carbohydrate_g: Option<f64>,
    /// Salt in milligrams
    #[serde(rename = "garam_mg", default)]
    pub salt_mg: Option<f64>,
}

/// Category of a surfaced failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No image at submit time
    Validation,
    /// Camera access denied
    Permission,
    /// No camera available
    Device,
    /// Request never reached the server
    Network,
    /// Non-2xx HTTP response
    ServerError,
    /// HTTP 2xx but the service refused the image
    DomainRejection,
    /// A picked or dropped file could not be read
    FileRead,
}

/// A user-facing failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// Status of the current/last detection request
#[derive(Debug, Clone, Default, PartialEq)]
pub enum SubmissionState {
    #[default]
    Idle,
    Loading,
    Succeeded(NutritionResult),
    Failed(ErrorInfo),
}

impl SubmissionState {
    pub fn is_loading(&self) -> bool {
        matches!(self, SubmissionState::Loading)
    }

    pub fn result(&self) -> Option<&NutritionResult> {
        match self {
            SubmissionState::Succeeded(result) => Some(result),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ErrorInfo> {
        match self {
            SubmissionState::Failed(error) => Some(error),
            _ => None,
        }
    }
}

/// Lifecycle of the camera session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CameraStatus {
    #[default]
    Closed,
    Opening,
    Streaming,
}

/// User-facing messages shown by the app
pub mod messages {
    pub const NO_IMAGE: &str = "Pilih gambar dulu.";
    pub const REQUEST_FAILED: &str = "Request gagal";
    pub const NOT_A_LABEL: &str = "Gambar bukan label gizi / tabel gizi tidak terdeteksi.";
    pub const CAMERA_UNAVAILABLE: &str =
        "Kamera tidak bisa diakses (izin ditolak / device tidak ada).";
    pub const GENERIC: &str = "Terjadi kesalahan.";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nutrition_parses_service_field_names() {
        let json = r#"{"energi_kkal":250,"lemak_total_g":10,"lemak_jenuh_g":3,
            "protein_g":5,"karbohidrat_g":30,"garam_mg":400}"#;
        let nutrition: NutritionResult = serde_json::from_str(json).unwrap();

        assert_eq!(nutrition.energy_kcal, Some(250.0));
        assert_eq!(nutrition.total_fat_g, Some(10.0));
        assert_eq!(nutrition.saturated_fat_g, Some(3.0));
        assert_eq!(nutrition.protein_g, Some(5.0));
        assert_eq!(nutrition.carbohydrate_g, Some(30.0));
        assert_eq!(nutrition.salt_mg, Some(400.0));
    }

    #[test]
    fn test_nutrition_missing_fields_are_none() {
        let nutrition: NutritionResult = serde_json::from_str(r#"{"energi_kkal":120.5}"#).unwrap();
        assert_eq!(nutrition.energy_kcal, Some(120.5));
        assert_eq!(nutrition.protein_g, None);
        assert_eq!(nutrition.salt_mg, None);
    }

    #[test]
    fn test_submission_state_accessors() {
        let ok = SubmissionState::Succeeded(NutritionResult::default());
        assert!(ok.result().is_some());
        assert!(ok.error().is_none());

        let failed = SubmissionState::Failed(ErrorInfo::new(ErrorKind::Network, "down"));
        assert_eq!(failed.error().map(|e| e.kind), Some(ErrorKind::Network));
        assert!(!failed.is_loading());
        assert!(SubmissionState::Loading.is_loading());
    }
}
