use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Emotion vocabulary of the facial classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Angry,
    Disgust,
    Fear,
    Happy,
    Sad,
    Surprise,
    Neutral,
}

impl Emotion {
    /// Vocabulary in the classifier's natural order
    pub const ALL: [Emotion; 7] = [
        Emotion::Angry,
        Emotion::Disgust,
        Emotion::Fear,
        Emotion::Happy,
        Emotion::Sad,
        Emotion::Surprise,
        Emotion::Neutral,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Angry => "angry",
            Emotion::Disgust => "disgust",
            Emotion::Fear => "fear",
            Emotion::Happy => "happy",
            Emotion::Sad => "sad",
            Emotion::Surprise => "surprise",
            Emotion::Neutral => "neutral",
        }
    }

    /// Parse a classifier label (case-insensitive). Unknown labels yield `None`.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|e| e.as_str().eq_ignore_ascii_case(label))
    }

    fn rank(label: &str) -> usize {
        Self::ALL
            .iter()
            .position(|e| e.as_str().eq_ignore_ascii_case(label.trim()))
            .unwrap_or(Self::ALL.len())
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single chart row: label and raw classifier confidence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionScore {
    pub label: String,
    pub score: f32,
}

/// Per-emotion confidence scores for one capture.
///
/// Scores are passed through as the classifier reports them; they are not
/// normalized and need not sum to 1.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmotionScores(Vec<EmotionScore>);

impl EmotionScores {
    /// Keep the given order as-is
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, f32)>,
        S: Into<String>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(label, score)| EmotionScore {
                    label: label.into(),
                    score,
                })
                .collect(),
        )
    }

    /// Build from an unordered map: known vocabulary first, then unknown labels alphabetically
    pub fn from_map(map: HashMap<String, f32>) -> Self {
        let mut rows: Vec<EmotionScore> = map
            .into_iter()
            .map(|(label, score)| EmotionScore { label, score })
            .collect();
        rows.sort_by(|a, b| {
            Emotion::rank(&a.label)
                .cmp(&Emotion::rank(&b.label))
                .then_with(|| a.label.cmp(&b.label))
        });
        Self(rows)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EmotionScore> {
        self.0.iter()
    }

    pub fn get(&self, label: &str) -> Option<f32> {
        self.0
            .iter()
            .find(|row| row.label.eq_ignore_ascii_case(label))
            .map(|row| row.score)
    }

    /// Label with the highest score. On ties the first row wins.
    pub fn dominant(&self) -> Option<&str> {
        let mut best: Option<&EmotionScore> = None;
        for row in &self.0 {
            match best {
                Some(b) if row.score <= b.score => {}
                _ if row.score.is_nan() => {}
                _ => best = Some(row),
            }
        }
        best.map(|row| row.label.as_str())
    }

    pub fn into_rows(self) -> Vec<EmotionScore> {
        self.0
    }
}
