/// Loads picked or dropped files from disk into candidate images
///
/// Any file type is accepted here; the picker's image filter is only a hint.
use std::path::{Path, PathBuf};

use image::ImageFormat;

use crate::error::{AppError, Result};
use crate::state::data::CandidateFile;

/// MIME type used when the extension is not a known image format
const FALLBACK_MIME: &str = "application/octet-stream";

/// Read a file into a CandidateFile
pub async fn load_file(path: PathBuf) -> Result<CandidateFile> {
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|source| AppError::FileRead {
            path: path.clone(),
            source,
        })?;

    tracing::debug!(path = %path.display(), size = bytes.len(), "loaded file");

    Ok(CandidateFile::new(file_name(&path), mime_for(&path), bytes))
}

/// Read every path of a drop, in order; unreadable files become errors in place
pub async fn load_files(paths: Vec<PathBuf>) -> Vec<Result<CandidateFile>> {
    let mut loaded = Vec::with_capacity(paths.len());
    for path in paths {
        loaded.push(load_file(path).await);
    }
    loaded
}

/// Guess the MIME type from the file extension
pub fn mime_for(path: &Path) -> String {
    ImageFormat::from_path(path)
        .map(|format| format.to_mime_type().to_string())
        .unwrap_or_else(|_| FALLBACK_MIME.to_string())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "upload".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_from_extension() {
        assert_eq!(mime_for(Path::new("label.jpg")), "image/jpeg");
        assert_eq!(mime_for(Path::new("label.PNG")), "image/png");
        assert_eq!(mime_for(Path::new("notes.txt")), FALLBACK_MIME);
        assert_eq!(mime_for(Path::new("no_extension")), FALLBACK_MIME);
    }

    #[tokio::test]
    async fn test_load_missing_file_is_error() {
        let result = load_file(PathBuf::from("/nonexistent/label.jpg")).await;
        assert!(matches!(result, Err(AppError::FileRead { .. })));
    }

    #[tokio::test]
    async fn test_load_existing_file() {
        let path = std::env::temp_dir().join(format!("nutriva-loader-{}.png", std::process::id()));
        tokio::fs::write(&path, b"not really a png").await.unwrap();

        let file = load_file(path.clone()).await.unwrap();
        assert_eq!(file.mime_type, "image/png");
        assert_eq!(file.bytes, b"not really a png");
        assert!(file.name.starts_with("nutriva-loader-"));

        let _ = tokio::fs::remove_file(&path).await;
    }
}
