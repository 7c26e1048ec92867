use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::panic::{self, AssertUnwindSafe};
use thiserror::Error;
use tracing::{debug, warn};

use super::classifier::{AnalysisAction, ClassifierConfig, ClassifierFault, EmotionClassifier};
use super::feedback::{classify_feedback, FeedbackCategory};
use super::scores::EmotionScores;

/// Why a capture could not be classified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationFailure {
    NoFaceDetected,
    InferenceFailure,
}

/// Uniform error for any classifier failure. Both reasons ask the user to recapture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("Emotion classification failed: {reason:?}")]
pub struct ClassificationError {
    pub reason: ClassificationFailure,
}

impl ClassificationError {
    pub fn no_face() -> Self {
        Self {
            reason: ClassificationFailure::NoFaceDetected,
        }
    }

    pub fn inference() -> Self {
        Self {
            reason: ClassificationFailure::InferenceFailure,
        }
    }
}

impl From<&ClassifierFault> for ClassificationError {
    fn from(fault: &ClassifierFault) -> Self {
        match fault {
            ClassifierFault::NoFace(_) => Self::no_face(),
            _ => Self::inference(),
        }
    }
}

/// Successful classification of one capture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionAnalysis {
    pub dominant: String,
    pub scores: EmotionScores,
}

impl EmotionAnalysis {
    pub fn feedback(&self) -> FeedbackCategory {
        classify_feedback(&self.dominant)
    }
}

/// Adapter that turns classifier calls into [`EmotionAnalysis`] results.
///
/// Every call is a fresh attempt; nothing is retried or remembered.
pub struct EmotionAnalyzer {
    classifier: Box<dyn EmotionClassifier>,
    config: ClassifierConfig,
}

impl EmotionAnalyzer {
    pub fn new(classifier: Box<dyn EmotionClassifier>, config: ClassifierConfig) -> Self {
        Self { classifier, config }
    }

    /// Replace the options passed to the classifier on later calls
    pub fn set_config(&mut self, config: ClassifierConfig) {
        self.config = config;
    }

    pub fn classifier_name(&self) -> &str {
        self.classifier.name()
    }

    /// Decode captured image bytes (JPEG/PNG) and classify them
    pub fn analyze_bytes(&self, bytes: &[u8]) -> Result<EmotionAnalysis, ClassificationError> {
        let image = image::load_from_memory(bytes).map_err(|e| {
            warn!("Failed to decode capture ({} bytes): {}", bytes.len(), e);
            ClassificationError::inference()
        })?;
        self.analyze(&image.to_rgb8())
    }

    /// Classify a decoded RGB image
    pub fn analyze(&self, image: &RgbImage) -> Result<EmotionAnalysis, ClassificationError> {
        debug!(
            "Analyzing {}x{} capture with {}",
            image.width(),
            image.height(),
            self.classifier.name()
        );

        // Backends wrap native inference code and may panic on odd inputs
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.classifier
                .analyze(image, &[AnalysisAction::Emotion], &self.config)
        }))
        .map_err(|_| {
            warn!("Classifier {} panicked", self.classifier.name());
            ClassificationError::inference()
        })?;

        let results = outcome.map_err(|fault| {
            warn!("Classifier {} failed: {}", self.classifier.name(), fault);
            ClassificationError::from(&fault)
        })?;

        let first = results.into_iter().next().ok_or_else(|| {
            warn!("Classifier returned no results");
            ClassificationError::inference()
        })?;

        let scores = EmotionScores::from_map(first.emotion);
        if scores.is_empty() {
            warn!("Classifier returned an empty score map");
            return Err(ClassificationError::inference());
        }

        let dominant = match first.dominant_emotion.filter(|d| !d.trim().is_empty()) {
            Some(label) => label,
            None => scores
                .dominant()
                .map(str::to_string)
                .ok_or_else(ClassificationError::inference)?,
        };

        Ok(EmotionAnalysis { dominant, scores })
    }
}
