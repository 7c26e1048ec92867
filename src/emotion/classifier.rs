//! Facial emotion classifier collaborator.
//!
//! [`HttpEmotionClassifier`] talks to a DeepFace-compatible REST service
//! (`POST /analyze`). Tests and alternative backends implement
//! [`EmotionClassifier`] directly.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{ImageFormat, RgbImage};
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Cursor;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Marker the classifier service uses when face detection is enforced and fails
const NO_FACE_MARKER: &str = "face could not be detected";

/// Upper bound on how much of an error body ends up in a fault message
const MAX_ERROR_BODY: usize = 200;

/// Analysis the classifier is asked to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisAction {
    Emotion,
}

impl AnalysisAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisAction::Emotion => "emotion",
        }
    }
}

/// Options passed to the classifier on every call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifierConfig {
    /// Fail when no clear face is found. Off by default so partial or
    /// off-angle faces still get a best-effort result.
    pub strict_face_detection: bool,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            strict_face_detection: false,
        }
    }
}

/// One per-face result as the classifier reports it
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawAnalysis {
    #[serde(default)]
    pub dominant_emotion: Option<String>,
    #[serde(default)]
    pub emotion: HashMap<String, f32>,
}

/// Faults raised by a classifier backend
#[derive(Debug, Error)]
pub enum ClassifierFault {
    #[error("No face detected: {0}")]
    NoFace(String),

    #[error("Classifier request failed: {0}")]
    Request(String),

    #[error("Unexpected classifier response: {0}")]
    InvalidResponse(String),

    #[error("Failed to encode image: {0}")]
    Encode(String),
}

/// A pretrained facial-emotion classifier
pub trait EmotionClassifier: Send {
    /// Short backend name for logs
    fn name(&self) -> &str;

    /// Run the requested actions on a single decoded image
    fn analyze(
        &self,
        image: &RgbImage,
        actions: &[AnalysisAction],
        config: &ClassifierConfig,
    ) -> Result<Vec<RawAnalysis>, ClassifierFault>;
}

#[derive(Debug, Deserialize)]
struct AnalyzeResponse {
    results: Vec<RawAnalysis>,
}

/// DeepFace-compatible REST classifier
pub struct HttpEmotionClassifier {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl HttpEmotionClassifier {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClassifierFault> {
        if base_url.trim().is_empty() {
            return Err(ClassifierFault::Request(
                "Classifier URL is required".to_string(),
            ));
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClassifierFault::Request(format!("Failed to create HTTP client: {}", e)))?;

        info!("Emotion classifier configured at {}", base_url);

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}/analyze", self.base_url)
    }

    /// Encode the capture as a JPEG data URI
    pub fn encode_image(image: &RgbImage) -> Result<String, ClassifierFault> {
        let mut buf = Cursor::new(Vec::new());
        image
            .write_to(&mut buf, ImageFormat::Jpeg)
            .map_err(|e| ClassifierFault::Encode(e.to_string()))?;
        Ok(format!(
            "data:image/jpeg;base64,{}",
            STANDARD.encode(buf.into_inner())
        ))
    }

    pub fn build_request_body(
        image_uri: &str,
        actions: &[AnalysisAction],
        config: &ClassifierConfig,
    ) -> serde_json::Value {
        let actions: Vec<&str> = actions.iter().map(AnalysisAction::as_str).collect();
        serde_json::json!({
            "img": image_uri,
            "actions": actions,
            "enforce_detection": config.strict_face_detection,
        })
    }

    pub fn parse_response(body: &str) -> Result<Vec<RawAnalysis>, ClassifierFault> {
        let response: AnalyzeResponse = serde_json::from_str(body)
            .map_err(|e| ClassifierFault::InvalidResponse(e.to_string()))?;
        Ok(response.results)
    }

    /// Classify a non-success response body
    pub fn fault_from_error_body(status: u16, body: &str) -> ClassifierFault {
        let truncated: String = body.chars().take(MAX_ERROR_BODY).collect();
        if body.to_lowercase().contains(NO_FACE_MARKER) {
            ClassifierFault::NoFace(truncated)
        } else {
            ClassifierFault::Request(format!("HTTP {}: {}", status, truncated))
        }
    }
}

impl EmotionClassifier for HttpEmotionClassifier {
    fn name(&self) -> &str {
        "deepface-http"
    }

    fn analyze(
        &self,
        image: &RgbImage,
        actions: &[AnalysisAction],
        config: &ClassifierConfig,
    ) -> Result<Vec<RawAnalysis>, ClassifierFault> {
        let image_uri = Self::encode_image(image)?;
        let body = Self::build_request_body(&image_uri, actions, config);

        debug!(
            "Classifier request: {}x{} image, {} bytes encoded",
            image.width(),
            image.height(),
            image_uri.len()
        );

        let response = self
            .client
            .post(self.endpoint())
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .json(&body)
            .send()
            .map_err(|e| ClassifierFault::Request(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .map_err(|e| ClassifierFault::InvalidResponse(e.to_string()))?;

        if !status.is_success() {
            return Err(Self::fault_from_error_body(status.as_u16(), &text));
        }

        Self::parse_response(&text)
    }
}
