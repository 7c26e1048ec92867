//! Facial emotion analysis for still captures.
//!
//! The classifier itself is an external collaborator (see [`EmotionClassifier`]);
//! this module wraps it with a uniform result type and maps the dominant
//! emotion to a feedback category for the therapist.

mod analyzer;
mod classifier;
mod feedback;
mod scores;

pub use analyzer::{ClassificationError, ClassificationFailure, EmotionAnalysis, EmotionAnalyzer};
pub use classifier::{
    AnalysisAction, ClassifierConfig, ClassifierFault, EmotionClassifier, HttpEmotionClassifier,
    RawAnalysis,
};
pub use feedback::{classify_feedback, FeedbackCategory};
pub use scores::{Emotion, EmotionScore, EmotionScores};
