use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

/// Exercise focus chosen for the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetSkill {
    #[default]
    EmotionRecognition,
    VocalProsody,
    TurnTaking,
    AnxietyRegulation,
}

impl TargetSkill {
    /// Human-readable name
    pub fn display_name(&self) -> &'static str {
        match self {
            TargetSkill::EmotionRecognition => "Emotion Recognition",
            TargetSkill::VocalProsody => "Vocal Tone / Prosody",
            TargetSkill::TurnTaking => "Turn Taking",
            TargetSkill::AnxietyRegulation => "Anxiety Regulation",
        }
    }
}

impl fmt::Display for TargetSkill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Whole minutes and remaining seconds since the session started
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElapsedTime {
    pub minutes: u64,
    pub seconds: u64,
}

impl ElapsedTime {
    pub fn total_seconds(&self) -> u64 {
        self.minutes * 60 + self.seconds
    }
}

impl fmt::Display for ElapsedTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}m {}s", self.minutes, self.seconds)
    }
}

/// Elapsed time between `start_time` and `now`.
///
/// Saturates to zero when `now` precedes `start_time` (wall clock moved back).
pub fn elapsed(start_time: DateTime<Local>, now: DateTime<Local>) -> ElapsedTime {
    let total = (now - start_time).num_seconds().max(0) as u64;
    ElapsedTime {
        minutes: total / 60,
        seconds: total % 60,
    }
}

/// Session start time, captured lazily on the first render
#[derive(Debug, Clone, Default)]
pub struct SessionClock {
    start_time: Option<DateTime<Local>>,
}

impl SessionClock {
    pub fn new() -> Self {
        Self { start_time: None }
    }

    /// Start time, initializing it to `now` if this is the first call
    pub fn start_time(&mut self, now: DateTime<Local>) -> DateTime<Local> {
        *self.start_time.get_or_insert_with(|| {
            debug!("Session clock started");
            now
        })
    }

    /// Elapsed time, recomputed on every call
    pub fn elapsed(&mut self, now: DateTime<Local>) -> ElapsedTime {
        let start = self.start_time(now);
        elapsed(start, now)
    }

    pub fn is_started(&self) -> bool {
        self.start_time.is_some()
    }
}

/// Snapshot of the sidebar profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionProfile {
    pub student_name: String,
    pub target_skill: TargetSkill,
    pub start_time: DateTime<Local>,
}

/// One continuous run of the support tool for one student
#[derive(Debug, Clone)]
pub struct Session {
    /// Unique session ID for log correlation
    session_id: String,
    student_name: String,
    target_skill: TargetSkill,
    clock: SessionClock,
}

impl Session {
    pub fn new(student_name: impl Into<String>, target_skill: TargetSkill) -> Self {
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            student_name: student_name.into(),
            target_skill,
            clock: SessionClock::new(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn target_skill(&self) -> TargetSkill {
        self.target_skill
    }

    /// Whether the first render has happened
    pub fn is_started(&self) -> bool {
        self.clock.is_started()
    }

    /// Replace the sidebar inputs. The start time is left untouched.
    pub fn update_profile(&mut self, student_name: impl Into<String>, target_skill: TargetSkill) {
        self.student_name = student_name.into().trim().to_string();
        if self.target_skill != target_skill {
            info!(
                "Session {} target skill changed: {} -> {}",
                self.session_id, self.target_skill, target_skill
            );
        }
        self.target_skill = target_skill;
    }

    /// Profile as seen by the render at `now`
    pub fn profile(&mut self, now: DateTime<Local>) -> SessionProfile {
        SessionProfile {
            student_name: self.student_name.clone(),
            target_skill: self.target_skill,
            start_time: self.clock.start_time(now),
        }
    }

    pub fn elapsed(&mut self, now: DateTime<Local>) -> ElapsedTime {
        self.clock.elapsed(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    fn at(secs: i64) -> DateTime<Local> {
        Local.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_elapsed_splits_minutes_and_seconds() {
        let e = elapsed(at(0), at(125));
        assert_eq!(e, ElapsedTime { minutes: 2, seconds: 5 });
        assert_eq!(e.to_string(), "2m 5s");
    }

    #[test]
    fn test_elapsed_zero_at_start() {
        let e = elapsed(at(0), at(0));
        assert_eq!(e.to_string(), "0m 0s");
    }

    #[test]
    fn test_elapsed_saturates_when_clock_goes_back() {
        let e = elapsed(at(100), at(40));
        assert_eq!(e.total_seconds(), 0);
    }

    #[test]
    fn test_elapsed_past_one_day_keeps_counting() {
        let e = elapsed(at(0), at(86_400 + 61));
        assert_eq!(e.minutes, 1441);
        assert_eq!(e.seconds, 1);
    }

    #[test]
    fn test_clock_lazy_initialization() {
        let mut clock = SessionClock::new();
        assert!(!clock.is_started());

        assert_eq!(clock.start_time(at(10)), at(10));
        assert!(clock.is_started());

        // Later calls never re-initialize
        assert_eq!(clock.start_time(at(500)), at(10));
        assert_eq!(clock.elapsed(at(70)).to_string(), "1m 0s");
    }

    #[test]
    fn test_first_elapsed_call_is_zero() {
        let mut clock = SessionClock::new();
        assert_eq!(clock.elapsed(at(42)).total_seconds(), 0);
    }

    #[test]
    fn test_elapsed_after_start() {
        let mut clock = SessionClock::new();
        clock.start_time(at(0));
        assert_eq!(clock.elapsed(at(59)).seconds, 59);
    }

    #[test]
    fn test_target_skill_display_names() {
        let names: Vec<_> = [
            TargetSkill::EmotionRecognition,
            TargetSkill::VocalProsody,
            TargetSkill::TurnTaking,
            TargetSkill::AnxietyRegulation,
        ]
        .iter()
        .map(|s| s.display_name())
        .collect();
        assert_eq!(
            names,
            vec![
                "Emotion Recognition",
                "Vocal Tone / Prosody",
                "Turn Taking",
                "Anxiety Regulation"
            ]
        );
    }

    #[test]
    fn test_target_skill_serialization() {
        let json = serde_json::to_value(TargetSkill::VocalProsody).unwrap();
        assert_eq!(json, "vocal_prosody");

        let skill: TargetSkill = serde_json::from_str("\"anxiety_regulation\"").unwrap();
        assert_eq!(skill, TargetSkill::AnxietyRegulation);
    }

    #[test]
    fn test_session_profile_keeps_start_time() {
        let mut session = Session::new("Student A", TargetSkill::TurnTaking);
        assert!(!session.is_started());

        let first = session.profile(at(0));
        session.update_profile("  Student B ", TargetSkill::VocalProsody);
        let second = session.profile(at(300));

        assert_eq!(first.start_time, second.start_time);
        assert_eq!(second.student_name, "Student B");
        assert_eq!(second.target_skill, TargetSkill::VocalProsody);
        assert_eq!(session.elapsed(at(300)).minutes, 5);
    }

    #[test]
    fn test_session_ids_are_unique() {
        let a = Session::new("A", TargetSkill::default());
        let b = Session::new("A", TargetSkill::default());
        assert_ne!(a.session_id(), b.session_id());
    }

    proptest! {
        #[test]
        fn prop_elapsed_bounds(offset in 0i64..10_000_000) {
            let start = at(0);
            let e = elapsed(start, start + Duration::seconds(offset));
            prop_assert!(e.seconds < 60);
            prop_assert_eq!(e.total_seconds(), offset as u64);
        }

        #[test]
        fn prop_elapsed_monotonic(a in 0i64..1_000_000, b in 0i64..1_000_000) {
            let (earlier, later) = if a <= b { (a, b) } else { (b, a) };
            let mut clock = SessionClock::new();
            clock.start_time(at(0));
            let first = clock.elapsed(at(earlier));
            let second = clock.elapsed(at(later));
            prop_assert!(first <= second);
        }
    }
}
