/// Detection service client
///
/// ## Responsibilities
///
/// - Send the image to `POST <base>/detect` as multipart form data
/// - Map the raw HTTP response onto a submission outcome
/// - Check that the service is reachable (`GET <base>/ping`)
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use crate::error::Result;
use crate::state::data::{messages, ErrorInfo, ErrorKind, NutritionResult};

/// Multipart field carrying the image bytes
pub const FILE_FIELD: &str = "file";

/// Image payload of one submission
#[derive(Debug, Clone, PartialEq)]
pub struct Upload {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Status and body of a response that reached us
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

/// The request never produced a response
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Network error: {0}")]
    Network(String),
}

/// Carries one upload to the detection service
#[async_trait]
pub trait DetectionTransport: Send + Sync {
    async fn send(&self, upload: Upload) -> std::result::Result<RawResponse, TransportError>;
}

/// JSON body of a 2xx `/detect` response
#[derive(Debug, Clone, Deserialize)]
pub struct DetectResponse {
    pub ok: bool,

    #[serde(default)]
    pub message: Option<String>,

    #[serde(default)]
    pub nutrition: Option<NutritionResult>,

    /// Detector confidence for the label box
    #[serde(default)]
    pub yolo_conf: Option<f64>,

    /// OCR lines read from the label
    #[serde(default)]
    pub texts: Vec<String>,
}

/// JSON body of `/ping`
#[derive(Debug, Clone, Deserialize)]
pub struct PingResponse {
    pub ok: bool,
    #[serde(default)]
    pub message: Option<String>,
}

/// Map a raw response onto the submission outcome; first matching rule wins
pub fn map_response(response: &RawResponse) -> std::result::Result<NutritionResult, ErrorInfo> {
    if !(200..300).contains(&response.status) {
        let message = if response.body.trim().is_empty() {
            messages::REQUEST_FAILED.to_string()
        } else {
            response.body.clone()
        };
        return Err(ErrorInfo::new(ErrorKind::ServerError, message));
    }

    let parsed: DetectResponse = match serde_json::from_str(&response.body) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!(error = %e, "detect response is not valid JSON");
            return Err(ErrorInfo::new(ErrorKind::ServerError, messages::GENERIC));
        }
    };

    if !parsed.ok {
        let message = parsed
            .message
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| messages::NOT_A_LABEL.to_string());
        return Err(ErrorInfo::new(ErrorKind::DomainRejection, message));
    }

    tracing::debug!(
        confidence = ?parsed.yolo_conf,
        lines = parsed.texts.len(),
        "label read"
    );
    Ok(parsed.nutrition.unwrap_or_default())
}

/// HTTP transport for the detection service
pub struct HttpDetector {
    client: reqwest::Client,
    base_url: String,
}

impl HttpDetector {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        // No timeout here; the detection request runs until the server answers
        let client = reqwest::Client::builder().build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { client, base_url })
    }

    pub fn detect_url(&self) -> String {
        format!("{}/detect", self.base_url)
    }

    pub fn ping_url(&self) -> String {
        format!("{}/ping", self.base_url)
    }

    /// Check that the service answers
    pub async fn ping(&self) -> std::result::Result<PingResponse, TransportError> {
        let resp = self.client.get(self.ping_url()).send().await?;
        if !resp.status().is_success() {
            return Err(TransportError::Network(format!(
                "ping failed: {}",
                resp.status()
            )));
        }
        Ok(resp.json().await?)
    }

    /// Get base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl DetectionTransport for HttpDetector {
    async fn send(&self, upload: Upload) -> std::result::Result<RawResponse, TransportError> {
        let url = self.detect_url();
        let size = upload.bytes.len();

        let form = Form::new().part(
            FILE_FIELD,
            Part::bytes(upload.bytes)
                .file_name(upload.file_name)
                .mime_str(&upload.mime_type)?,
        );

        tracing::debug!(%url, size, "sending detect request");
        let resp = self.client.post(&url).multipart(form).send().await?;

        let status = resp.status().as_u16();
        // A body that cannot be read still counts as a response
        let body = resp.text().await.unwrap_or_default();
        Ok(RawResponse { status, body })
    }
}
