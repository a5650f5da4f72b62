/// Error handling for the desktop shell around the core
use std::path::PathBuf;

use crate::state::data::{messages, ErrorInfo, ErrorKind};

/// Result type alias
pub type Result<T> = std::result::Result<T, AppError>;

/// Errors raised outside the core state machine
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A picked or dropped file could not be read
    #[error("Failed to read {}: {source}", .path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file exists but could not be loaded
    #[error("Config error: {0}")]
    Config(String),

    /// HTTP client could not be constructed
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),
}

impl AppError {
    /// Convert to the single user-facing message surfaced by the UI
    pub fn to_error_info(&self) -> ErrorInfo {
        match self {
            AppError::FileRead { path, .. } => ErrorInfo::new(
                ErrorKind::FileRead,
                format!(
                    "Gagal membaca file {}",
                    path.file_name()
                        .map(|n| n.to_string_lossy().to_string())
                        .unwrap_or_default()
                ),
            ),
            AppError::Config(_) | AppError::HttpClient(_) => {
                ErrorInfo::new(ErrorKind::Network, messages::GENERIC)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_read_maps_to_file_read_kind() {
        let err = AppError::FileRead {
            path: PathBuf::from("/tmp/label.png"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        let info = err.to_error_info();
        assert_eq!(info.kind, ErrorKind::FileRead);
        assert!(info.message.contains("label.png"));
        assert!(err.to_string().contains("gone"));
    }
}
