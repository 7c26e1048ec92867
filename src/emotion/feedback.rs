use serde::{Deserialize, Serialize};

use super::scores::Emotion;

/// Qualitative feedback shown next to the emotion chart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackCategory {
    Positive,
    SupportNeeded,
    Neutral,
}

impl FeedbackCategory {
    /// Headline for the analysis panel; neutral results show none
    pub fn headline(&self) -> Option<&'static str> {
        match self {
            FeedbackCategory::Positive => Some("Great Energy!"),
            FeedbackCategory::SupportNeeded => Some("Support Needed?"),
            FeedbackCategory::Neutral => None,
        }
    }
}

/// Map a dominant emotion label to its feedback category.
///
/// Total over any label: unrecognized labels fall back to `Neutral`.
pub fn classify_feedback(dominant: &str) -> FeedbackCategory {
    match Emotion::from_label(dominant) {
        Some(Emotion::Happy | Emotion::Surprise) => FeedbackCategory::Positive,
        Some(Emotion::Sad | Emotion::Fear) => FeedbackCategory::SupportNeeded,
        _ => FeedbackCategory::Neutral,
    }
}
