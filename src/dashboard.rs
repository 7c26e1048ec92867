//! Session shell: composes the session profile, emotion analysis, rewards,
//! vocal training and materials into the view models the UI renders.
//!
//! Every user interaction is one synchronous render. Each render returns the
//! session header alongside the panel the interaction produced, so the
//! elapsed time is recomputed on every interaction.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::info;
use uuid::Uuid;

use crate::activity_log;
use crate::audio::{self, AudioError, AudioPanel};
use crate::config::Config;
use crate::emotion::{
    ClassificationFailure, ClassifierConfig, EmotionAnalyzer, EmotionScore, FeedbackCategory,
    HttpEmotionClassifier,
};
use crate::materials::{MaterialError, MaterialShelf, MaterialSummary, SessionMaterial};
use crate::rewards::{
    HttpAnimationFetcher, RewardAsset, RewardLibrary, RewardPlayback, RewardSummary,
};
use crate::session::{Session, TargetSkill};

/// Shown whenever a capture cannot be classified
pub const CAPTURE_RETRY_MESSAGE: &str = "Could not detect face clearly. Try again.";

/// Header and sidebar metrics, rendered on every interaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionHeader {
    pub session_id: String,
    pub title: String,
    pub student_name: String,
    pub target_skill: TargetSkill,
    pub focus_area: String,
    pub date: String,
    pub started_at: DateTime<Local>,
    pub elapsed: String,
    pub elapsed_seconds: u64,
}

/// Result of one render: the header plus the panel the interaction produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rendered<T> {
    pub header: SessionHeader,
    pub panel: T,
}

/// Sidebar inputs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub student_name: String,
    pub target_skill: TargetSkill,
}

/// Analysis panel of the vision tab
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VisionPanel {
    Detected {
        dominant: String,
        headline: String,
        scores: Vec<EmotionScore>,
        feedback: FeedbackCategory,
        feedback_headline: Option<String>,
    },
    Failed {
        reason: ClassificationFailure,
        message: String,
    },
}

pub struct SupportHub {
    session: Session,
    analyzer: EmotionAnalyzer,
    rewards: RewardLibrary,
    materials: MaterialShelf,
}

impl SupportHub {
    pub fn new(
        session: Session,
        analyzer: EmotionAnalyzer,
        rewards: RewardLibrary,
        materials: MaterialShelf,
    ) -> Self {
        Self {
            session,
            analyzer,
            rewards,
            materials,
        }
    }

    /// Build the hub from config, fetching reward animations once.
    ///
    /// Blocks on network I/O; call before entering the async runtime.
    pub fn from_config(config: &Config) -> Result<Self> {
        let classifier =
            HttpEmotionClassifier::new(&config.classifier_url, config.classifier_timeout())
                .context("Failed to configure emotion classifier")?;
        let analyzer = EmotionAnalyzer::new(Box::new(classifier), config.classifier_config());

        let fetcher = HttpAnimationFetcher::new(config.asset_fetch_timeout())
            .context("Failed to configure asset fetcher")?;
        let rewards = RewardLibrary::load(&fetcher, &config.reward_urls);

        let session = Session::new(
            config.default_student_name.clone(),
            config.default_target_skill,
        );

        info!(
            "Support hub ready: session {}, classifier {}, {} of {} reward animations",
            session.session_id(),
            analyzer.classifier_name(),
            rewards.summaries().iter().filter(|r| r.available).count(),
            RewardAsset::ALL.len()
        );

        Ok(Self::new(
            session,
            analyzer,
            rewards,
            MaterialShelf::new(config.max_material_bytes, config.max_shelf_bytes),
        ))
    }

    pub fn session_id(&self) -> &str {
        self.session.session_id()
    }

    /// Render the header; the first call starts the session clock
    pub fn header(&mut self, now: DateTime<Local>) -> SessionHeader {
        if !self.session.is_started() {
            activity_log::log_session_start(
                self.session.session_id(),
                self.session.target_skill().display_name(),
            );
        }

        let profile = self.session.profile(now);
        let elapsed = self.session.elapsed(now);

        SessionHeader {
            session_id: self.session.session_id().to_string(),
            title: format!("Tier 3 Support: {}", profile.student_name),
            student_name: profile.student_name,
            target_skill: profile.target_skill,
            focus_area: profile.target_skill.display_name().to_string(),
            date: now.format("%Y-%m-%d").to_string(),
            started_at: profile.start_time,
            elapsed: elapsed.to_string(),
            elapsed_seconds: elapsed.total_seconds(),
        }
    }

    /// Apply a changed face detection setting to later captures
    pub fn set_classifier_config(&mut self, config: ClassifierConfig) {
        info!(
            "Session {} strict face detection: {}",
            self.session.session_id(),
            config.strict_face_detection
        );
        self.analyzer.set_config(config);
    }

    fn render<T>(&mut self, now: DateTime<Local>, panel: T) -> Rendered<T> {
        Rendered {
            header: self.header(now),
            panel,
        }
    }

    pub fn update_profile(
        &mut self,
        update: ProfileUpdate,
        now: DateTime<Local>,
    ) -> Rendered<()> {
        self.session
            .update_profile(update.student_name, update.target_skill);
        activity_log::log_profile_update(
            self.session.session_id(),
            update.target_skill.display_name(),
        );
        self.render(now, ())
    }

    /// Classify a still capture and build the analysis panel
    pub fn capture_expression(
        &mut self,
        image_bytes: &[u8],
        now: DateTime<Local>,
    ) -> Rendered<VisionPanel> {
        let header = self.header(now);
        let started = Instant::now();
        let result = self.analyzer.analyze_bytes(image_bytes);
        let analysis_time_ms = started.elapsed().as_millis() as u64;

        let panel = match result {
            Ok(analysis) => {
                let feedback = analysis.feedback();
                activity_log::log_emotion_capture(
                    self.session.session_id(),
                    image_bytes.len(),
                    analysis_time_ms,
                    Some(feedback_id(feedback)),
                    None,
                );
                VisionPanel::Detected {
                    headline: format!("Detected: {}", analysis.dominant.to_uppercase()),
                    dominant: analysis.dominant,
                    scores: analysis.scores.into_rows(),
                    feedback,
                    feedback_headline: feedback.headline().map(str::to_string),
                }
            }
            Err(e) => {
                activity_log::log_emotion_capture(
                    self.session.session_id(),
                    image_bytes.len(),
                    analysis_time_ms,
                    None,
                    Some(failure_id(e.reason)),
                );
                VisionPanel::Failed {
                    reason: e.reason,
                    message: CAPTURE_RETRY_MESSAGE.to_string(),
                }
            }
        };

        Rendered { header, panel }
    }

    /// Accept a microphone recording and build the vocal training panel.
    ///
    /// The header is rendered first, so a rejected recording still starts the clock.
    pub fn record_audio(
        &mut self,
        audio_bytes: &[u8],
        now: DateTime<Local>,
    ) -> Result<Rendered<AudioPanel>, AudioError> {
        let header = self.header(now);
        let panel = audio::build_panel(audio_bytes, &mut rand::thread_rng())?;
        activity_log::log_audio_recorded(
            self.session.session_id(),
            panel.clip.size_bytes,
            panel.clip.duration_ms,
        );
        Ok(Rendered { header, panel })
    }

    pub fn rewards(&mut self, now: DateTime<Local>) -> Rendered<Vec<RewardSummary>> {
        let summaries = self.rewards.summaries();
        self.render(now, summaries)
    }

    /// Select the pre-fetched animation for a reward control
    pub fn play_reward(
        &mut self,
        asset: RewardAsset,
        now: DateTime<Local>,
    ) -> Rendered<RewardPlayback> {
        let playback = self.rewards.play(asset);
        activity_log::log_reward_played(
            self.session.session_id(),
            asset.id(),
            playback.animation.is_some(),
        );
        self.render(now, playback)
    }

    pub fn upload_material(
        &mut self,
        file_name: &str,
        bytes: Vec<u8>,
        now: DateTime<Local>,
    ) -> Result<Rendered<MaterialSummary>, MaterialError> {
        let header = self.header(now);
        let size = bytes.len();
        let summary = match self.materials.add(file_name, bytes, now) {
            Ok(summary) => summary,
            Err(e) => {
                activity_log::log_material_upload(
                    self.session.session_id(),
                    None,
                    None,
                    size,
                    Some(&e.to_string()),
                );
                return Err(e);
            }
        };

        activity_log::log_material_upload(
            self.session.session_id(),
            Some(&summary.id.to_string()),
            Some(summary.kind.content_type()),
            size,
            None,
        );
        Ok(Rendered {
            header,
            panel: summary,
        })
    }

    pub fn materials(&mut self, now: DateTime<Local>) -> Rendered<Vec<MaterialSummary>> {
        let list = self.materials.list();
        self.render(now, list)
    }

    pub fn material(&self, id: Uuid) -> Option<&SessionMaterial> {
        self.materials.get(id)
    }
}

fn feedback_id(feedback: FeedbackCategory) -> &'static str {
    match feedback {
        FeedbackCategory::Positive => "positive",
        FeedbackCategory::SupportNeeded => "support_needed",
        FeedbackCategory::Neutral => "neutral",
    }
}

fn failure_id(reason: ClassificationFailure) -> &'static str {
    match reason {
        ClassificationFailure::NoFaceDetected => "no_face_detected",
        ClassificationFailure::InferenceFailure => "inference_failure",
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::emotion::{
        AnalysisAction, ClassifierConfig, ClassifierFault, EmotionClassifier, RawAnalysis,
    };
    use image::RgbImage;

    /// Classifier stub: fixed result, or a fault when `dominant` is `None`
    pub struct FixedClassifier {
        pub dominant: Option<&'static str>,
        pub scores: Vec<(&'static str, f32)>,
    }

    impl EmotionClassifier for FixedClassifier {
        fn name(&self) -> &str {
            "fixed"
        }

        fn analyze(
            &self,
            _image: &RgbImage,
            _actions: &[AnalysisAction],
            _config: &ClassifierConfig,
        ) -> Result<Vec<RawAnalysis>, ClassifierFault> {
            match self.dominant {
                Some(dominant) => Ok(vec![RawAnalysis {
                    dominant_emotion: Some(dominant.to_string()),
                    emotion: self
                        .scores
                        .iter()
                        .map(|(l, s)| (l.to_string(), *s))
                        .collect(),
                }]),
                None => Err(ClassifierFault::Request("stub failure".to_string())),
            }
        }
    }

    pub fn hub_with(
        classifier: impl EmotionClassifier + 'static,
        rewards: RewardLibrary,
    ) -> SupportHub {
        SupportHub::new(
            Session::new("Student A", TargetSkill::EmotionRecognition),
            EmotionAnalyzer::new(Box::new(classifier), ClassifierConfig::default()),
            rewards,
            MaterialShelf::default(),
        )
    }

    pub fn jpeg_capture() -> Vec<u8> {
        let mut buf = std::io::Cursor::new(Vec::new());
        RgbImage::from_pixel(16, 16, image::Rgb([180, 140, 120]))
            .write_to(&mut buf, image::ImageFormat::Jpeg)
            .unwrap();
        buf.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(secs: i64) -> DateTime<Local> {
        Local.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn fear_classifier() -> FixedClassifier {
        FixedClassifier {
            dominant: Some("fear"),
            scores: vec![("fear", 61.0), ("sad", 20.0), ("neutral", 19.0)],
        }
    }

    #[test]
    fn test_capture_fear_end_to_end() {
        let mut hub = hub_with(fear_classifier(), RewardLibrary::empty());

        let rendered = hub.capture_expression(&jpeg_capture(), at(0));
        match rendered.panel {
            VisionPanel::Detected {
                dominant,
                headline,
                scores,
                feedback,
                feedback_headline,
            } => {
                assert_eq!(dominant, "fear");
                assert_eq!(headline, "Detected: FEAR");
                assert_eq!(feedback, FeedbackCategory::SupportNeeded);
                assert_eq!(feedback_headline.as_deref(), Some("Support Needed?"));
                assert!(scores.iter().any(|row| row.label == "fear"));
            }
            other => panic!("expected detection, got {other:?}"),
        }
    }

    #[test]
    fn test_capture_failure_shows_retry_prompt() {
        let mut hub = hub_with(
            FixedClassifier {
                dominant: None,
                scores: vec![],
            },
            RewardLibrary::empty(),
        );

        let rendered = hub.capture_expression(&jpeg_capture(), at(0));
        match rendered.panel {
            VisionPanel::Failed { reason, message } => {
                assert_eq!(reason, ClassificationFailure::InferenceFailure);
                assert_eq!(message, CAPTURE_RETRY_MESSAGE);
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn test_capture_undecodable_bytes_is_failure() {
        let mut hub = hub_with(fear_classifier(), RewardLibrary::empty());
        let rendered = hub.capture_expression(b"\x00\x01", at(0));
        assert!(matches!(rendered.panel, VisionPanel::Failed { .. }));
    }

    #[test]
    fn test_neutral_capture_has_no_feedback_headline() {
        let mut hub = hub_with(
            FixedClassifier {
                dominant: Some("angry"),
                scores: vec![("angry", 0.8), ("neutral", 0.2)],
            },
            RewardLibrary::empty(),
        );

        let json = serde_json::to_value(hub.capture_expression(&jpeg_capture(), at(0))).unwrap();
        assert_eq!(json["panel"]["status"], "detected");
        assert_eq!(json["panel"]["feedback"], "neutral");
        assert!(json["panel"]["feedback_headline"].is_null());
    }

    #[test]
    fn test_header_counts_up_from_first_render() {
        let mut hub = hub_with(fear_classifier(), RewardLibrary::empty());

        let first = hub.header(at(0));
        assert_eq!(first.elapsed, "0m 0s");
        assert_eq!(first.title, "Tier 3 Support: Student A");
        assert_eq!(first.focus_area, "Emotion Recognition");

        let later = hub.header(at(0) + Duration::seconds(754));
        assert_eq!(later.elapsed, "12m 34s");
        assert_eq!(later.started_at, first.started_at);
    }

    #[test]
    fn test_every_interaction_renders_header() {
        let mut hub = hub_with(fear_classifier(), RewardLibrary::empty());
        hub.header(at(0));

        let rendered = hub.play_reward(RewardAsset::Calm, at(90));
        assert_eq!(rendered.header.elapsed, "1m 30s");
    }

    #[test]
    fn test_update_profile() {
        let mut hub = hub_with(fear_classifier(), RewardLibrary::empty());
        let rendered = hub.update_profile(
            ProfileUpdate {
                student_name: "Student B".to_string(),
                target_skill: TargetSkill::AnxietyRegulation,
            },
            at(5),
        );

        assert_eq!(rendered.header.title, "Tier 3 Support: Student B");
        assert_eq!(rendered.header.focus_area, "Anxiety Regulation");
    }

    #[test]
    fn test_play_reward_absent_and_present() {
        let rewards = RewardLibrary::empty()
            .with_animation(RewardAsset::Success, serde_json::json!({"layers": []}));
        let mut hub = hub_with(fear_classifier(), rewards);

        assert!(hub.play_reward(RewardAsset::Success, at(0)).panel.animation.is_some());
        assert!(hub.play_reward(RewardAsset::Welcome, at(0)).panel.animation.is_none());
    }

    #[test]
    fn test_record_audio() {
        let mut hub = hub_with(fear_classifier(), RewardLibrary::empty());
        let rendered = hub.record_audio(b"RIFF-not-really", at(0)).unwrap();
        assert_eq!(rendered.panel.signal.len(), audio::SIGNAL_POINTS);

        assert!(matches!(
            hub.record_audio(&[], at(0)),
            Err(AudioError::Empty)
        ));
    }

    #[test]
    fn test_rejected_first_interaction_starts_clock() {
        let mut hub = hub_with(fear_classifier(), RewardLibrary::empty());
        assert!(hub.record_audio(&[], at(0)).is_err());
        assert_eq!(hub.header(at(30)).elapsed, "0m 30s");

        let mut hub = hub_with(fear_classifier(), RewardLibrary::empty());
        assert!(hub.upload_material("x.txt", b"text".to_vec(), at(10)).is_err());
        assert_eq!(hub.header(at(70)).elapsed, "1m 0s");
    }

    #[test]
    fn test_upload_and_fetch_material() {
        let mut hub = hub_with(fear_classifier(), RewardLibrary::empty());
        let rendered = hub
            .upload_material("face.jpg", jpeg_capture(), at(0))
            .unwrap();
        let id = rendered.panel.id;

        assert_eq!(hub.materials(at(1)).panel.len(), 1);
        assert_eq!(hub.material(id).unwrap().file_name, "face.jpg");
        assert!(hub.upload_material("x.txt", b"text".to_vec(), at(2)).is_err());
    }
}
